//! Cache Key Module
//!
//! Composite `(entity, record id, attribute)` keys.

use std::fmt;

// == Cache Key ==
/// Identifies one image slot: an image attribute of a single record.
///
/// The three components are stored back to back in one string together with
/// the offsets where the record id and attribute begin. Two keys are equal
/// only when all three components are, whatever characters the names contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    joined: String,
    record_at: usize,
    attribute_at: usize,
}

impl CacheKey {
    // == Constructor ==
    /// Builds the key for `entity`/`record_id`/`attribute`.
    pub fn new(entity: &str, record_id: &str, attribute: &str) -> Self {
        let mut joined =
            String::with_capacity(entity.len() + record_id.len() + attribute.len());
        joined.push_str(entity);
        let record_at = joined.len();
        joined.push_str(record_id);
        let attribute_at = joined.len();
        joined.push_str(attribute);
        Self {
            joined,
            record_at,
            attribute_at,
        }
    }

    /// Splits the key back into `(entity, record_id, attribute)`.
    pub fn parts(&self) -> (&str, &str, &str) {
        (
            &self.joined[..self.record_at],
            &self.joined[self.record_at..self.attribute_at],
            &self.joined[self.attribute_at..],
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (entity, record_id, attribute) = self.parts();
        write!(f, "{}:{}:{}", entity, record_id, attribute)
    }
}
