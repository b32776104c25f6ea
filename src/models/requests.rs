//! Request DTOs for the image cache API
//!
//! Defines the structure of incoming path parameters and request bodies.

use serde::Deserialize;

use crate::cache::Image;

/// Path parameters addressing one image slot
/// (`/images/:entity/:id/:attribute`, `/arrays/:entity/:id/:attribute`)
#[derive(Debug, Clone, Deserialize)]
pub struct SlotPath {
    pub entity: String,
    pub id: String,
    pub attribute: String,
}

impl SlotPath {
    /// Validates the path parameters
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        for (name, value) in [
            ("entity", &self.entity),
            ("id", &self.id),
            ("attribute", &self.attribute),
        ] {
            if value.is_empty() {
                return Some(format!("{} cannot be empty", name));
            }
        }
        None
    }

    /// Printable form used in response messages
    pub fn display_key(&self) -> String {
        format!("{}:{}:{}", self.entity, self.id, self.attribute)
    }
}

/// Request body for storing an image array (PUT /arrays/:entity/:id/:attribute)
///
/// `null` positions are kept as absent images.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageArrayRequest {
    pub images: Vec<Option<Vec<u8>>>,
}

impl ImageArrayRequest {
    pub fn into_images(self) -> Vec<Option<Image>> {
        self.images
            .into_iter()
            .map(|image| image.map(Image::from))
            .collect()
    }
}
