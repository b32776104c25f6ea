//! Invalidation Index Module
//!
//! Maps each entity to the attributes whose values are cached as images.

use std::collections::HashMap;

use crate::cache::CacheKey;
use crate::metadata::EntityMetadata;

// == Image Attribute Index ==
/// Entity name → image and image-array attribute names, in declaration order.
///
/// Entities without image attributes are left out, so a lookup miss means
/// the entity never has anything to invalidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttributeIndex {
    attributes: HashMap<String, Vec<String>>,
}

impl ImageAttributeIndex {
    // == Build ==
    /// Scans entity metadata once and collects image attributes.
    pub fn build(metadata: &EntityMetadata) -> Self {
        let attributes = metadata
            .entities
            .iter()
            .filter_map(|entity| {
                let names: Vec<String> = entity
                    .attributes
                    .iter()
                    .filter(|attribute| attribute.kind.is_image())
                    .map(|attribute| attribute.name.clone())
                    .collect();
                (!names.is_empty()).then(|| (entity.name.clone(), names))
            })
            .collect();
        Self { attributes }
    }

    /// Image attributes of `entity`, or None if it has none.
    pub fn attributes(&self, entity: &str) -> Option<&[String]> {
        self.attributes.get(entity).map(Vec::as_slice)
    }

    // == Record Keys ==
    /// Cache keys covering every image attribute of one record.
    pub fn record_keys(&self, entity: &str, record_id: &str) -> Vec<CacheKey> {
        self.attributes(entity)
            .unwrap_or_default()
            .iter()
            .map(|attribute| CacheKey::new(entity, record_id, attribute))
            .collect()
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
