//! Resource loading utilities
//!
//! Schema Descriptions are stored as JSON. A schema file may split its
//! composition over several files: any string entry in `includedSchemas` or
//! `importedSchemas` is a path, relative to the file that names it, and is
//! replaced by that file's contents before deserialization.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::schema::SchemaDescription;

const COMPOSITION_KEYS: [&str; 2] = ["includedSchemas", "importedSchemas"];

/// Resource loader for schemas and documents
#[derive(Debug, Default)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Read a text resource, enforcing the size limit
    pub fn load_text(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
        })?;

        self.limits.check_xml_size(content.len())?;
        Ok(content)
    }

    /// Load a Schema Description from a JSON file
    pub fn load_schema(&self, path: impl AsRef<Path>) -> Result<SchemaDescription> {
        let mut chain = Vec::new();
        let value = self.load_schema_value(path.as_ref(), &mut chain)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load a Schema Description from JSON text.
    ///
    /// Path entries are resolved against `base_dir`, or the working
    /// directory when it is `None`.
    pub fn load_schema_str(&self, json: &str, base_dir: Option<&Path>) -> Result<SchemaDescription> {
        let mut value: Value = serde_json::from_str(json)?;
        let base = base_dir.map(Path::to_path_buf).unwrap_or_default();
        self.resolve_paths(&mut value, &base, &mut Vec::new())?;
        Ok(serde_json::from_value(value)?)
    }

    fn load_schema_value(&self, path: &Path, chain: &mut Vec<PathBuf>) -> Result<Value> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            Error::Resource(format!("Failed to resolve '{}': {}", path.display(), e))
        })?;

        if chain.contains(&canonical) {
            return Err(Error::Resource(format!(
                "schema '{}' includes itself",
                canonical.display()
            )));
        }
        self.limits.check_schema_depth(chain.len())?;

        let text = self.load_text(&canonical)?;
        let mut value: Value = serde_json::from_str(&text).map_err(|e| {
            Error::Resource(format!("'{}' is not a schema description: {}", path.display(), e))
        })?;
        log::debug!("loaded schema file {}", canonical.display());

        let base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
        chain.push(canonical);
        self.resolve_paths(&mut value, &base, chain)?;
        chain.pop();

        Ok(value)
    }

    /// Replace path entries in the composition lists with the loaded files
    fn resolve_paths(&self, value: &mut Value, base: &Path, chain: &mut Vec<PathBuf>) -> Result<()> {
        let Some(object) = value.as_object_mut() else {
            return Ok(());
        };

        for key in COMPOSITION_KEYS {
            let Some(Value::Array(entries)) = object.get_mut(key) else {
                continue;
            };
            for entry in entries.iter_mut() {
                match entry.as_str().map(|relative| base.join(relative)) {
                    Some(path) => *entry = self.load_schema_value(&path, chain)?,
                    None => self.resolve_paths(entry, base, chain)?,
                }
            }
        }
        Ok(())
    }
}
