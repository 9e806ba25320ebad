//! Error types for adt-schema
//!
//! Two families matter to callers. [`SchemaError`] means the schema
//! description itself is broken and every call against it will keep failing.
//! Everything else is tied to one document or one object and can be fixed
//! by the caller.

use std::fmt;
use thiserror::Error;

/// Result type alias using the adt-schema [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for parse/build operations
#[derive(Error, Debug)]
pub enum Error {
    /// The input text is not well-formed XML
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The schema description is structurally invalid
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A field the schema marks as required is absent
    #[error("missing required field '{field}' in element '{element}'")]
    MissingRequiredField {
        /// Element that should carry the field
        element: String,
        /// Attribute or child element name
        field: String,
    },

    /// A leaf value does not fit its declared type (strict parsing only)
    #[error("invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        /// Attribute or element name
        field: String,
        /// Offending lexical value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The document root is not declared by the schema
    #[error("root element '{0}' is not declared in the schema")]
    UnknownRootElement(String),

    /// An abstract element was used directly
    #[error("element '{0}' is abstract and cannot be instantiated")]
    AbstractElement(String),

    /// The object handed to the builder has the wrong shape
    #[error("encoding error: {0}")]
    Encode(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Rust bindings could not be generated
    #[error("codegen error: {0}")]
    Codegen(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the schema-authoring family, which no retry can fix
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::Schema(_))
    }

    /// True when the caller can fix the input and try again
    pub fn is_recoverable(&self) -> bool {
        !self.is_schema_error()
    }
}

/// What kind of component a dangling reference was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A complex or simple type
    Type,
    /// A top-level element declaration
    Element,
    /// A named element group
    Group,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Type => write!(f, "type"),
            ReferenceKind::Element => write!(f, "element"),
            ReferenceKind::Group => write!(f, "group"),
        }
    }
}

/// Structural problems in a schema description
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A name could not be found in the schema or any included/imported schema
    #[error("unresolved {kind} '{name}' referenced by '{referenced_by}'")]
    UnresolvedReference {
        /// What was being looked up
        kind: ReferenceKind,
        /// The name as written in the schema
        name: String,
        /// The type or element holding the reference
        referenced_by: String,
    },

    /// An `extends` chain loops back on itself
    #[error("cyclic inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance {
        /// Type names along the cycle, first repeated at the end
        chain: Vec<String>,
    },

    /// Element groups reference each other in a loop
    #[error("cyclic group reference: {}", .chain.join(" -> "))]
    CyclicGroup {
        /// Group names along the cycle
        chain: Vec<String>,
    },

    /// A complex type declares both simple content and a sequence
    #[error("complex type '{type_name}' cannot have both simpleContent and a sequence")]
    ContentConflict {
        /// Offending type
        type_name: String,
    },

    /// A declaration is malformed on its own
    #[error("invalid declaration '{name}': {reason}")]
    InvalidDeclaration {
        /// Declared name (or a description when unnamed)
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

impl SchemaError {
    /// Shortcut for an unresolved type reference
    pub fn unresolved_type(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        SchemaError::UnresolvedReference {
            kind: ReferenceKind::Type,
            name: name.into(),
            referenced_by: referenced_by.into(),
        }
    }

    /// True for the unresolved-reference subtype
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, SchemaError::UnresolvedReference { .. })
    }
}
