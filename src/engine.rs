//! The shareable engine handle
//!
//! A [`Schema`] owns a Schema Description together with the resolver built
//! over it. It is immutable after construction and `Send + Sync`, so one
//! instance can serve parse and build calls from many threads.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::builder::{BuildOptions, Builder};
use crate::error::Result;
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::parser::{ParseOptions, Parser};
use crate::resolver::{Resolver, SchemaId, TypeContract, TypeRef};
use crate::schema::SchemaDescription;

/// A loaded schema, ready to parse and build documents
#[derive(Debug)]
pub struct Schema {
    description: SchemaDescription,
    resolver: Resolver,
}

impl Schema {
    /// Create an engine with default limits
    pub fn new(description: SchemaDescription) -> Result<Self> {
        Self::with_limits(description, Limits::default())
    }

    /// Create an engine
    pub fn with_limits(description: SchemaDescription, limits: Limits) -> Result<Self> {
        let resolver = Resolver::with_limits(&description, limits)?;
        Ok(Self {
            description,
            resolver,
        })
    }

    /// Create an engine from Schema Description JSON.
    ///
    /// Path entries in the composition lists are resolved against the
    /// working directory.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(Loader::new().load_schema_str(json, None)?)
    }

    /// Load a Schema Description file and its composed files
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Loader::new().load_schema(path)?)
    }

    /// The Schema Description as given
    pub fn description(&self) -> &SchemaDescription {
        &self.description
    }

    /// The resolver over this schema
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Limits in effect
    pub fn limits(&self) -> &Limits {
        self.resolver.limits()
    }

    /// Resolve every declaration once; reports the first schema error
    pub fn check(&self) -> Result<()> {
        self.resolver.check()
    }

    /// Flattened contract of a named complex type in the root schema scope.
    ///
    /// `None` when the name resolves to a simple type.
    pub fn contract(&self, type_name: &str) -> Result<Option<Arc<TypeContract>>> {
        match self.resolver.resolve_type(type_name, SchemaId::ROOT, type_name)? {
            TypeRef::Complex { key, .. } => self.resolver.contract(&key).map(Some),
            TypeRef::Simple(_) => Ok(None),
        }
    }

    /// Parse XML text with default options
    pub fn parse(&self, xml: &str) -> Result<Value> {
        Parser::new(self, ParseOptions::default()).parse(xml)
    }

    /// Parse XML text
    pub fn parse_with(&self, xml: &str, options: &ParseOptions) -> Result<Value> {
        Parser::new(self, options.clone()).parse(xml)
    }

    /// Build XML text from a root-keyed object
    pub fn build(&self, value: &Value, options: &BuildOptions) -> Result<String> {
        Builder::new(self, options.clone()).build(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_schema_is_shareable() {
        assert_send_sync::<Schema>();
    }

    #[test]
    fn test_from_json() {
        let schema = Schema::from_json(
            r#"{
                "rootElements": [{ "name": "ping", "typeName": "PingType" }],
                "complexTypes": {
                    "PingType": { "attributes": [{ "name": "seq", "typeName": "int" }] }
                }
            }"#,
        )
        .unwrap();
        schema.check().unwrap();

        let contract = schema.contract("PingType").unwrap().unwrap();
        assert_eq!(contract.attributes.len(), 1);
        assert!(schema.contract("string").unwrap().is_none());

        let value = schema.parse(r#"<ping seq="4"/>"#).unwrap();
        assert_eq!(value, serde_json::json!({ "ping": { "seq": 4 } }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(Schema::from_json("{"), Err(Error::Json(_))));
    }
}
