//! Cache Entry Module
//!
//! Defines image payloads and the slot shapes a cache entry can take.

use std::sync::Arc;

// == Image ==
/// An encoded image payload. Cloning shares the underlying bytes.
pub type Image = Arc<[u8]>;

// == Image Slot ==
/// The value stored under one cache key.
///
/// A slot holds either exactly one image or a fixed-size array of images
/// where individual positions may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    /// One image for an `image` attribute
    Single(Image),
    /// Positional images for an `image_array` attribute
    Array(Vec<Option<Image>>),
}

impl ImageSlot {
    // == Size ==
    /// Returns the number of payload bytes held by the slot.
    ///
    /// Absent array positions contribute nothing.
    pub fn size_bytes(&self) -> usize {
        match self {
            ImageSlot::Single(image) => image.len(),
            ImageSlot::Array(images) => images.iter().flatten().map(|image| image.len()).sum(),
        }
    }

    /// Human readable name of the slot shape, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSlot::Single(_) => SINGLE_KIND,
            ImageSlot::Array(_) => ARRAY_KIND,
        }
    }
}

pub(crate) const SINGLE_KIND: &str = "image";
pub(crate) const ARRAY_KIND: &str = "image array";
