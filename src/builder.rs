//! Object to XML serialization
//!
//! The builder mirrors the parser: it walks the same flattened contracts and
//! emits attributes and child elements in schema order, whatever order the
//! input object's keys are in.
//!
//! Output is produced in two passes. The first turns the object into a small
//! node tree while a [`PrefixAllocator`] records every namespace in use; the
//! second writes the tree with quick-xml, declaring all namespaces on the
//! root element.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};

use crate::engine::Schema;
use crate::error::{Error, Result};
use crate::names::prefixed;
use crate::namespaces::PrefixAllocator;
use crate::parser::TEXT_KEY;
use crate::resolver::{ElementContent, ElementUse, SchemaId, TypeContract};
use crate::schema::Form;
use crate::values::to_text;

/// Builder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Prepend `<?xml version="1.0" encoding="..."?>`
    pub include_xml_declaration: bool,
    /// Encoding named in the declaration. Output text is always UTF-8.
    pub encoding: String,
    /// Indent nested elements
    pub pretty: bool,
    /// Spaces per level when pretty printing
    pub indent: usize,
    /// Root element to build; otherwise the input's single top-level key
    pub root_name: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_xml_declaration: true,
            encoding: "UTF-8".to_string(),
            pretty: false,
            indent: 2,
            root_name: None,
        }
    }
}

impl BuildOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent nested elements
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Leave out the XML declaration
    pub fn without_declaration(mut self) -> Self {
        self.include_xml_declaration = false;
        self
    }

    /// Name the root element explicitly
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Encoding named in the declaration
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

/// Element ready to be written
#[derive(Debug, Default)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Node>,
}

/// Serializes JSON objects to XML for one schema
#[derive(Debug)]
pub struct Builder<'s> {
    schema: &'s Schema,
    options: BuildOptions,
}

impl<'s> Builder<'s> {
    /// Create a builder
    pub fn new(schema: &'s Schema, options: BuildOptions) -> Self {
        Self { schema, options }
    }

    /// Build XML text from `{ rootName: object }`
    pub fn build(&self, value: &Value) -> Result<String> {
        let (root_name, body) = self.root_of(value)?;
        let resolver = self.schema.resolver();

        let (decl, schema_id) = resolver
            .find_root_element(&root_name, None)
            .ok_or_else(|| Error::UnknownRootElement(root_name.clone()))?;
        if decl.is_abstract {
            return Err(Error::AbstractElement(decl.name.clone()));
        }

        let mut prefixes = PrefixAllocator::new();
        if resolver.namespace_of(schema_id).is_none() {
            prefixes.reserve_default();
        }

        let content = resolver.decl_content(decl, schema_id)?;
        let mut root = self.build_element(
            &decl.name,
            schema_id,
            decl.attribute_form,
            body,
            &content,
            &mut prefixes,
        )?;

        let mut attributes = prefixes.declarations();
        attributes.append(&mut root.attributes);
        root.attributes = attributes;

        self.write(&root)
    }

    fn root_of<'v>(&self, value: &'v Value) -> Result<(String, &'v Value)> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::Encode("input must be an object keyed by the root element".to_string()))?;

        if let Some(name) = &self.options.root_name {
            return Ok((name.clone(), object.get(name).unwrap_or(value)));
        }

        let mut keys = object.iter();
        match (keys.next(), keys.next()) {
            (Some((name, body)), None) => Ok((name.clone(), body)),
            (None, _) => Err(Error::Encode("input object is empty".to_string())),
            _ => Err(Error::Encode(format!(
                "input has {} top-level keys; pass a root name to pick one",
                object.len()
            ))),
        }
    }

    fn element_name(&self, local: &str, schema: SchemaId, prefixes: &mut PrefixAllocator) -> String {
        let resolver = self.schema.resolver();
        match resolver.namespace_of(schema) {
            Some(uri) => {
                let prefix = prefixes.prefix_for(uri, resolver.prefix_of(schema));
                prefixed(prefix.as_deref(), local)
            }
            None => local.to_string(),
        }
    }

    fn build_element(
        &self,
        name: &str,
        schema: SchemaId,
        attribute_form: Option<Form>,
        value: &Value,
        content: &ElementContent,
        prefixes: &mut PrefixAllocator,
    ) -> Result<Node> {
        log::trace!("building <{}>", name);
        let mut node = Node {
            name: self.element_name(name, schema, prefixes),
            ..Node::default()
        };

        match content {
            ElementContent::Simple(value_type) => node.text = to_text(value, value_type, name)?,
            ElementContent::Complex(key) => {
                let contract = self.schema.resolver().contract(key)?;
                let empty = Map::new();
                let object = match value {
                    Value::Object(object) => object,
                    Value::Null => &empty,
                    _ => {
                        return Err(Error::Encode(format!(
                            "<{}> needs an object, got {}",
                            name, value
                        )))
                    }
                };
                self.fill_complex(&mut node, name, attribute_form, object, &contract, prefixes)?;
            }
        }
        Ok(node)
    }

    fn fill_complex(
        &self,
        node: &mut Node,
        name: &str,
        attribute_form: Option<Form>,
        object: &Map<String, Value>,
        contract: &TypeContract,
        prefixes: &mut PrefixAllocator,
    ) -> Result<()> {
        let resolver = self.schema.resolver();
        let missing = |field: &str| Error::MissingRequiredField {
            element: name.to_string(),
            field: field.to_string(),
        };

        for attribute in &contract.attributes {
            let text = match object.get(&attribute.name) {
                Some(value) => to_text(value, &attribute.value_type, &attribute.name)?,
                None => None,
            };
            let Some(text) = text else {
                if attribute.decl.required {
                    return Err(missing(&attribute.name));
                }
                continue;
            };

            let form = attribute_form.unwrap_or(resolver.schema(attribute.schema).attribute_form_default);
            let attribute_name = match (form, resolver.namespace_of(attribute.schema)) {
                (Form::Qualified, Some(uri)) => {
                    let prefix = prefixes.prefix_for(uri, resolver.prefix_of(attribute.schema));
                    prefixed(prefix.as_deref(), &attribute.name)
                }
                _ => attribute.name.clone(),
            };
            node.attributes.push((attribute_name, text));
        }

        if let Some(text_type) = &contract.text {
            if let Some(value) = object.get(TEXT_KEY) {
                node.text = to_text(value, text_type, name)?;
            }
        }

        let mut known: Vec<String> = contract.attributes.iter().map(|a| a.name.clone()).collect();
        known.push(TEXT_KEY.to_string());

        for position in &contract.elements {
            if position.is_abstract {
                let substitutes = resolver.find_substitutes(&position.name)?;
                let mut found = false;
                for substitute in substitutes.iter() {
                    known.push(substitute.name.clone());
                    if let Some(value) = object.get(&substitute.name) {
                        found |= self.build_children(
                            node,
                            &substitute.name,
                            substitute.schema,
                            substitute.attribute_form.or(position.attribute_form),
                            value,
                            &substitute.content,
                            prefixes,
                        )?;
                    }
                }
                if !found && !position.is_optional() {
                    return Err(missing(&position.name));
                }
                continue;
            }

            known.push(position.name.clone());
            let found = match object.get(&position.name) {
                Some(value) => self.build_position(node, position, value, prefixes)?,
                None => false,
            };
            if !found && !position.is_optional() {
                return Err(missing(&position.name));
            }
        }

        for key in object.keys() {
            if !known.contains(key) {
                log::debug!("ignoring '{}' on <{}>: not in the schema", key, name);
            }
        }
        Ok(())
    }

    fn build_position(
        &self,
        node: &mut Node,
        position: &ElementUse,
        value: &Value,
        prefixes: &mut PrefixAllocator,
    ) -> Result<bool> {
        self.build_children(
            node,
            &position.name,
            position.schema,
            position.attribute_form,
            value,
            &position.content,
            prefixes,
        )
    }

    /// Append one child per item; returns whether anything was written
    #[allow(clippy::too_many_arguments)]
    fn build_children(
        &self,
        node: &mut Node,
        name: &str,
        schema: SchemaId,
        attribute_form: Option<Form>,
        value: &Value,
        content: &ElementContent,
        prefixes: &mut PrefixAllocator,
    ) -> Result<bool> {
        let items: Vec<&Value> = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().filter(|item| !item.is_null()).collect(),
            single => vec![single],
        };
        for item in &items {
            let child = self.build_element(name, schema, attribute_form, item, content, prefixes)?;
            node.children.push(child);
        }
        Ok(!items.is_empty())
    }

    fn write(&self, root: &Node) -> Result<String> {
        let mut writer = if self.options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', self.options.indent)
        } else {
            Writer::new(Vec::new())
        };

        if self.options.include_xml_declaration {
            let declaration = BytesDecl::new("1.0", Some(self.options.encoding.as_str()), None);
            writer
                .write_event(Event::Decl(declaration))
                .map_err(|e| Error::Encode(e.to_string()))?;
        }
        write_node(&mut writer, root)?;

        String::from_utf8(writer.into_inner()).map_err(|e| Error::Encode(e.to_string()))
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (name, value) in &node.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    let text = node.text.as_deref().filter(|t| !t.is_empty());
    if text.is_none() && node.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::Encode(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Encode(e.to_string()))?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Encode(e.to_string()))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(())
}

/// Build XML text from a root-keyed object
pub fn build(schema: &Schema, value: &Value, options: &BuildOptions) -> Result<String> {
    Builder::new(schema, options.clone()).build(value)
}
