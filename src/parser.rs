//! XML to object binding
//!
//! The parser walks a [`Document`] against the flattened contracts from the
//! [`Resolver`](crate::resolver::Resolver) and produces a JSON object keyed
//! by element and attribute names.
//!
//! Reading is lenient by default: missing required data is omitted and
//! values that do not fit their type are kept as strings. [`ParseMode::Strict`]
//! turns both into errors.

use serde_json::{Map, Value};

use crate::documents::{Document, Element};
use crate::engine::Schema;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::resolver::{ElementContent, ElementUse, TypeContract};
use crate::values::coerce;

/// Key holding the text of simple-content elements
pub const TEXT_KEY: &str = "$value";

/// How the parser treats data that does not match the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Omit missing required data, keep unconvertible values as strings
    #[default]
    Lenient,
    /// Fail on missing required data and unconvertible values
    Strict,
}

/// Parser configuration
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Leniency policy
    pub mode: ParseMode,
    /// Document limits; the schema's limits when unset
    pub limits: Option<Limits>,
}

impl ParseOptions {
    /// Lenient parsing with the schema's limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict parsing with the schema's limits
    pub fn strict() -> Self {
        Self {
            mode: ParseMode::Strict,
            ..Self::default()
        }
    }

    /// Override document limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Binds XML documents to JSON objects for one schema
#[derive(Debug)]
pub struct Parser<'s> {
    schema: &'s Schema,
    options: ParseOptions,
}

impl<'s> Parser<'s> {
    /// Create a parser
    pub fn new(schema: &'s Schema, options: ParseOptions) -> Self {
        Self { schema, options }
    }

    fn strict(&self) -> bool {
        self.options.mode == ParseMode::Strict
    }

    /// Parse XML text into `{ rootName: object }`
    pub fn parse(&self, xml: &str) -> Result<Value> {
        let limits = self.options.limits.as_ref().unwrap_or(self.schema.limits());
        let document = Document::parse_with_limits(xml, limits)?;
        self.parse_document(&document)
    }

    /// Bind an already parsed document
    pub fn parse_document(&self, document: &Document) -> Result<Value> {
        let resolver = self.schema.resolver();
        let root = &document.root;

        let (decl, schema_id) = resolver
            .find_root_element(root.local_name(), root.namespace())
            .ok_or_else(|| Error::UnknownRootElement(root.local_name().to_string()))?;

        if decl.is_abstract {
            return Err(Error::AbstractElement(decl.name.clone()));
        }

        if let (Some(found), Some(expected)) = (root.namespace(), resolver.namespace_of(schema_id)) {
            if found != expected {
                log::warn!(
                    "root element <{}> is in namespace '{}', schema expects '{}'",
                    root.local_name(),
                    found,
                    expected
                );
            }
        }

        let content = resolver.decl_content(decl, schema_id)?;
        let value = self.parse_content(root, &content)?;

        let mut wrapped = Map::new();
        wrapped.insert(decl.name.clone(), value);
        Ok(Value::Object(wrapped))
    }

    fn parse_content(&self, element: &Element, content: &ElementContent) -> Result<Value> {
        log::trace!("parsing <{}>", element.local_name());
        match content {
            ElementContent::Simple(value_type) => {
                coerce(element.text(), value_type, element.local_name(), self.strict())
            }
            ElementContent::Complex(key) => {
                let contract = self.schema.resolver().contract(key)?;
                self.parse_complex(element, &contract)
            }
        }
    }

    fn parse_complex(&self, element: &Element, contract: &TypeContract) -> Result<Value> {
        let mut object = Map::new();

        if let Some(value_type) = &contract.text {
            let text = coerce(element.text(), value_type, element.local_name(), self.strict())?;
            object.insert(TEXT_KEY.to_string(), text);
        }

        for attribute in &contract.attributes {
            let raw = element
                .get_attribute(&attribute.name)
                .or(attribute.decl.default.as_deref());
            match raw {
                Some(text) => {
                    let value = coerce(text, &attribute.value_type, &attribute.name, self.strict())?;
                    object.insert(attribute.name.clone(), value);
                }
                None if attribute.decl.required => self.missing(element, &attribute.name)?,
                None => {}
            }
        }

        for position in &contract.elements {
            if position.is_abstract {
                self.parse_substitutes(element, position, &mut object)?;
                continue;
            }

            let matches = element.find_children(&position.name);
            if matches.is_empty() {
                if !position.is_optional() {
                    self.missing(element, &position.name)?;
                }
                continue;
            }

            let values = matches
                .into_iter()
                .map(|child| self.parse_content(child, &position.content))
                .collect::<Result<Vec<_>>>()?;
            bind(&mut object, &position.name, values, position.is_array());
        }

        Ok(Value::Object(object))
    }

    /// Children standing in for an abstract position bind under their own names.
    fn parse_substitutes(
        &self,
        element: &Element,
        position: &ElementUse,
        object: &mut Map<String, Value>,
    ) -> Result<()> {
        let substitutes = self.schema.resolver().find_substitutes(&position.name)?;
        let mut found = false;

        for substitute in substitutes.iter() {
            let matches = element.find_children(&substitute.name);
            if matches.is_empty() {
                continue;
            }
            found = true;
            let values = matches
                .into_iter()
                .map(|child| self.parse_content(child, &substitute.content))
                .collect::<Result<Vec<_>>>()?;
            bind(object, &substitute.name, values, position.is_array());
        }

        if !found && !position.is_optional() {
            self.missing(element, &position.name)?;
        }
        Ok(())
    }

    fn missing(&self, element: &Element, field: &str) -> Result<()> {
        if self.strict() {
            return Err(Error::MissingRequiredField {
                element: element.local_name().to_string(),
                field: field.to_string(),
            });
        }
        log::debug!("<{}> has no '{}'", element.local_name(), field);
        Ok(())
    }
}

fn bind(object: &mut Map<String, Value>, name: &str, mut values: Vec<Value>, is_array: bool) {
    let value = if is_array || values.len() > 1 {
        Value::Array(values)
    } else {
        match values.pop() {
            Some(value) => value,
            None => return,
        }
    };
    object.insert(name.to_string(), value);
}

/// Parse XML text against a schema with default options
pub fn parse(schema: &Schema, xml: &str) -> Result<Value> {
    Parser::new(schema, ParseOptions::default()).parse(xml)
}

/// Parse XML text against a schema
pub fn parse_with(schema: &Schema, xml: &str, options: &ParseOptions) -> Result<Value> {
    Parser::new(schema, options.clone()).parse(xml)
}
