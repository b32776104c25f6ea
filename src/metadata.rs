//! Entity Metadata Module
//!
//! Describes entities and their typed attributes, loaded from a JSON document.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Metadata bundled with the sample application.
pub const SAMPLE_METADATA: &str = include_str!("../metadata/entities.json");

// == Attribute Type ==
/// Declared type of an entity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Image,
    ImageArray,
    Reference,
    #[serde(other)]
    Other,
}

impl AttributeType {
    /// Returns true for attributes whose values are cached as images.
    pub fn is_image(self) -> bool {
        matches!(self, AttributeType::Image | AttributeType::ImageArray)
    }
}

/// A named, typed field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A named data type and its attributes, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeDescriptor>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }
}

// == Entity Metadata ==
/// The full set of entity descriptors exposed by a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(default)]
    pub entities: Vec<EntityDescriptor>,
}

impl EntityMetadata {
    /// Builds metadata from descriptors, validating names.
    pub fn new(entities: Vec<EntityDescriptor>) -> Result<Self> {
        let metadata = Self { entities };
        metadata.validate()?;
        Ok(metadata)
    }

    // == Parsing ==
    /// Parses and validates a JSON metadata document.
    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: Self = serde_json::from_str(json).map_err(|e| {
            CacheError::Configuration(format!("Malformed entity metadata: {}", e))
        })?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Reads and parses a JSON metadata file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!(
                "Cannot read entity metadata {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// The metadata bundled with the sample application.
    pub fn sample() -> Result<Self> {
        Self::from_json(SAMPLE_METADATA)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entity in &self.entities {
            if entity.name.trim().is_empty() {
                return Err(CacheError::Configuration(
                    "Entity name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(CacheError::Configuration(format!(
                    "Duplicate entity '{}'",
                    entity.name
                )));
            }
            if entity.attributes.iter().any(|a| a.name.trim().is_empty()) {
                return Err(CacheError::Configuration(format!(
                    "Entity '{}' has an attribute without a name",
                    entity.name
                )));
            }
        }
        Ok(())
    }
}
