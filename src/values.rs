//! Leaf value conversion
//!
//! Text from attributes and simple elements is coerced to JSON according to
//! the resolved [`ValueType`]; the builder goes the other way.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::resolver::ValueType;
use crate::schema::builtins::Primitive;

/// Lexical space of `xs:decimal`: no exponent, no special values
static DECIMAL_LEXICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("decimal pattern is valid"));

/// Convert XML text to a JSON value.
///
/// In lenient mode values that do not fit their type are kept as the raw
/// string and a warning is logged. In strict mode they are errors.
pub fn coerce(text: &str, value_type: &ValueType, field: &str, strict: bool) -> Result<Value> {
    if let Some(allowed) = &value_type.enumeration {
        let literal = match value_type.primitive {
            Primitive::String | Primitive::Date => text,
            _ => text.trim(),
        };
        if !allowed.iter().any(|v| v == literal) {
            let reason = format!("not one of the values allowed by {}", value_type.name);
            return reject(text, field, reason, strict);
        }
    }

    let converted = match value_type.primitive {
        Primitive::String | Primitive::Date => Some(Value::String(text.to_string())),
        Primitive::Integer => parse_integer(text.trim()),
        Primitive::Decimal => parse_decimal(text.trim(), &value_type.builtin),
        Primitive::Boolean => parse_boolean(text.trim(), strict),
    };

    match converted {
        Some(value) => Ok(value),
        None => reject(text, field, format!("not a valid {}", value_type.builtin), strict),
    }
}

fn reject(text: &str, field: &str, reason: String, strict: bool) -> Result<Value> {
    if strict {
        return Err(Error::InvalidValue {
            field: field.to_string(),
            value: text.to_string(),
            reason,
        });
    }
    log::warn!("keeping '{}' for '{}' unconverted: {}", text, field, reason);
    Ok(Value::String(text.to_string()))
}

fn parse_integer(text: &str) -> Option<Value> {
    let text = text.strip_prefix('+').unwrap_or(text);
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    text.parse::<u64>().ok().map(|n| Value::Number(n.into()))
}

fn parse_decimal(text: &str, builtin: &str) -> Option<Value> {
    if builtin == "decimal" && !DECIMAL_LEXICAL.is_match(text) {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_boolean(text: &str, strict: bool) -> Option<Value> {
    match text {
        "true" | "1" => Some(Value::Bool(true)),
        "false" | "0" => Some(Value::Bool(false)),
        _ if strict => None,
        _ => Some(Value::Bool(false)),
    }
}

/// Convert a JSON leaf back to XML text.
///
/// Returns `None` for `null`, which the builder treats as absent. Numbers
/// bound to `xs:decimal` are written in positional form.
pub fn to_text(value: &Value, value_type: &ValueType, field: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) if value_type.builtin == "decimal" => decimal_text(n, field).map(Some),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(Error::Encode(format!(
            "'{}' needs a string, number or boolean value",
            field
        ))),
    }
}

fn decimal_text(number: &Number, field: &str) -> Result<String> {
    let text = number.to_string();
    if !text.contains(['e', 'E']) {
        return Ok(text);
    }
    Decimal::from_scientific(&text)
        .map(|d| d.normalize().to_string())
        .map_err(|e| Error::Encode(format!("'{}' cannot be written as xs:decimal: {}", field, e)))
}
