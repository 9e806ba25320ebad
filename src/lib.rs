//! # adt-schema
//!
//! Schema-driven XML data binding for the SAP ADT REST/XML vocabularies.
//!
//! A declarative Schema Description (JSON, or built in code) drives both
//! directions: parsing XML text into a plain JSON object tree and building
//! XML text back from one.
//!
//! ## Features
//!
//! - Namespaced elements and attributes, with per-schema prefixes
//! - Type inheritance (`extends`), flattened and cached per type
//! - Element groups, substitution groups and abstract elements
//! - Optional and array cardinality, simple content (text + attributes)
//! - Cross-schema composition via `include` and `import`
//! - Lenient or strict parsing
//! - Rust bindings generated from a schema (`codegen`)
//! - Protection against oversized and deeply nested documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use adt_schema::{BuildOptions, Schema};
//!
//! let schema = Schema::from_file("schemas/order.json")?;
//! let order = schema.parse(&xml)?;
//! let xml = schema.build(&order, &BuildOptions::default())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod names;
pub mod namespaces;

// Resource loading
pub mod documents;
pub mod loaders;

// Schema model and resolution
pub mod resolver;
pub mod schema;

// Data binding
pub mod builder;
pub mod engine;
pub mod parser;
pub mod values;

// Code generation
pub mod codegen;

// Re-exports for convenience
pub use builder::{build, BuildOptions};
pub use codegen::{generate, CodegenOptions};
pub use engine::Schema;
pub use error::{Error, ReferenceKind, Result, SchemaError};
pub use limits::Limits;
pub use parser::{parse, parse_with, ParseMode, ParseOptions, TEXT_KEY};
pub use resolver::{TypeContract, TypeKey};
pub use schema::{
    AttributeDecl, ComplexType, ElementDecl, ElementGroup, ElementRef, Form, GroupRef, MaxOccurs,
    Particle, SchemaDescription, SimpleType,
};

/// Version of the adt-schema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
