//! Identifier conversion for generated code

use check_keyword::CheckKeyword;
use heck::{ToPascalCase, ToSnakeCase};

fn sanitize(mut ident: String, fallback: &str) -> String {
    if ident.is_empty() {
        ident = fallback.to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert_str(0, fallback);
    }
    // `self`, `Self`, `super` and `crate` cannot be raw identifiers
    if ident.is_keyword() {
        ident.push('_');
    }
    ident
}

/// `OrderType/items` -> `OrderTypeItems`
pub fn type_ident(name: &str) -> String {
    sanitize(name.to_pascal_case(), "Type")
}

/// `maxOccurs` -> `max_occurs`
pub fn field_ident(name: &str) -> String {
    sanitize(name.to_snake_case(), "field")
}

/// `in-progress` -> `InProgress`
pub fn variant_ident(literal: &str) -> String {
    sanitize(literal.to_pascal_case(), "Value")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_identifiers() {
        assert_eq!(type_ident("element:Order"), "ElementOrder");
        assert_eq!(type_ident("OrderType/items"), "OrderTypeItems");
        assert_eq!(type_ident("group:Common/link"), "GroupCommonLink");
        assert_eq!(type_ident("self"), "Self_");
    }

    #[test]
    fn field_identifiers() {
        assert_eq!(field_ident("masterLanguage"), "master_language");
        assert_eq!(field_ident("type"), "type_");
        assert_eq!(field_ident("self"), "self_");
        assert_eq!(field_ident("$value"), "value");
        assert_eq!(field_ident("2nd"), "field2nd");
    }

    #[test]
    fn variant_identifiers() {
        assert_eq!(variant_ident("in-progress"), "InProgress");
        assert_eq!(variant_ident("active"), "Active");
        assert_eq!(variant_ident(""), "Value");
    }
}
