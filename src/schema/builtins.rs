//! XSD built-in types
//!
//! The engine does not validate lexical spaces. It only needs to know which
//! JSON representation a built-in maps to, so every built-in name is sorted
//! into one [`Primitive`] family.

use std::fmt;

/// Prefixes that always denote the XML Schema namespace in type references
pub const XSD_PREFIXES: &[&str] = &["xs", "xsd"];

/// Built-ins bound to JSON strings
const STRING_TYPES: &[&str] = &[
    "string",
    "normalizedString",
    "token",
    "language",
    "Name",
    "NCName",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "NMTOKEN",
    "NMTOKENS",
    "anyURI",
    "QName",
    "NOTATION",
    "hexBinary",
    "base64Binary",
    "duration",
    "anyType",
    "anySimpleType",
];

/// Built-ins bound to JSON integers
const INTEGER_TYPES: &[&str] = &[
    "integer",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "positiveInteger",
    "nonPositiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

/// Built-ins bound to JSON floating point numbers
const DECIMAL_TYPES: &[&str] = &["decimal", "float", "double"];

/// Built-ins kept as their lexical string
const DATE_TYPES: &[&str] = &[
    "date",
    "dateTime",
    "time",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
];

/// Value family of a built-in type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Text, bound to a JSON string
    String,
    /// Whole numbers, bound to a JSON integer
    Integer,
    /// decimal/float/double, bound to a JSON float
    Decimal,
    /// true/false, with "1" accepted as true
    Boolean,
    /// Calendar values, left as the original string
    Date,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Decimal => "decimal",
            Primitive::Boolean => "boolean",
            Primitive::Date => "date",
        };
        f.write_str(name)
    }
}

/// Family of a built-in type given its local name
pub fn primitive_for(local_name: &str) -> Option<Primitive> {
    if STRING_TYPES.contains(&local_name) {
        Some(Primitive::String)
    } else if INTEGER_TYPES.contains(&local_name) {
        Some(Primitive::Integer)
    } else if DECIMAL_TYPES.contains(&local_name) {
        Some(Primitive::Decimal)
    } else if local_name == "boolean" {
        Some(Primitive::Boolean)
    } else if DATE_TYPES.contains(&local_name) {
        Some(Primitive::Date)
    } else {
        None
    }
}

/// True when `prefix` names the XML Schema namespace
pub fn is_xsd_prefix(prefix: &str) -> bool {
    XSD_PREFIXES.contains(&prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_families() {
        assert_eq!(primitive_for("string"), Some(Primitive::String));
        assert_eq!(primitive_for("unsignedInt"), Some(Primitive::Integer));
        assert_eq!(primitive_for("double"), Some(Primitive::Decimal));
        assert_eq!(primitive_for("boolean"), Some(Primitive::Boolean));
        assert_eq!(primitive_for("dateTime"), Some(Primitive::Date));
        assert_eq!(primitive_for("OrderType"), None);
    }

    #[test]
    fn test_xsd_prefix() {
        assert!(is_xsd_prefix("xs"));
        assert!(is_xsd_prefix("xsd"));
        assert!(!is_xsd_prefix("adtcore"));
    }
}
