//! XML name utilities
//!
//! Schema descriptions spell type and element names the way the XSD did,
//! often with a namespace prefix (`adtcore:objectReference`). Lookups work on
//! the local part; the prefix only selects which schema to search first.

use crate::error::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}_.\-\x{B7}]*$").expect("NCName pattern is valid")
});

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Validate a declared QName
pub fn validate_qname(name: &str) -> Result<(), SchemaError> {
    if is_valid_qname(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidDeclaration {
            name: name.to_string(),
            reason: "not a valid XML name".to_string(),
        })
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// The local part of a possibly prefixed name
pub fn local_name(qname: &str) -> &str {
    split_qname(qname).1
}

/// Join a prefix and a local name
pub fn prefixed(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}:{}", p, local),
        _ => local.to_string(),
    }
}
