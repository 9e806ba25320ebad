//! Limits for document and schema processing
//!
//! ADT documents are small, but the engine still refuses runaway input:
//! oversized or absurdly deep documents, and schema descriptions whose
//! composition or inheritance nesting points at a generator bug.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth of a document
    pub max_xml_depth: usize,

    /// Maximum document size in bytes
    pub max_xml_size: usize,

    /// Maximum nesting of included/imported schemas
    pub max_schema_depth: usize,

    /// Maximum length of an `extends` chain
    pub max_inheritance_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_schema_depth: 100,
            max_inheritance_depth: 100,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_schema_depth: 20,
            max_inheritance_depth: 20,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_schema_depth: 1000,
            max_inheritance_depth: 1000,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if schema composition depth is within limits
    pub fn check_schema_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_schema_depth {
            Err(Error::LimitExceeded(format!(
                "Schema depth {} exceeds maximum {}",
                depth, self.max_schema_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if an inheritance chain is within limits
    pub fn check_inheritance_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_inheritance_depth {
            Err(Error::LimitExceeded(format!(
                "Inheritance depth {} exceeds maximum {}",
                depth, self.max_inheritance_depth
            )))
        } else {
            Ok(())
        }
    }
}
