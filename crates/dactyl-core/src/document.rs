//! Durable registry file format
//!
//! One structured document per user listing enrolled-template metadata.
//! Absence of the file is valid (an empty registry); a document that exists
//! but cannot be parsed is fatal to registry construction.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::Template;

/// Registry document format version
pub const DOCUMENT_VERSION: u32 = 1;

/// The serialized form of one user's template registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Format version (must equal [`DOCUMENT_VERSION`])
    pub version: u32,

    /// Enrolled templates, in enrollment order
    pub templates: Vec<Template>,
}

impl RegistryDocument {
    /// Create a document around the given template sequence
    pub fn new(templates: Vec<Template>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            templates,
        }
    }

    /// A document with no enrollments
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Serialize to the on-disk JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the on-disk JSON form, rejecting unknown versions
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        if document.version != DOCUMENT_VERSION {
            return Err(CoreError::UnsupportedVersion(document.version));
        }
        Ok(document)
    }
}
