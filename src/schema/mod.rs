//! Schema descriptions
//!
//! A [`SchemaDescription`] is the declarative, JSON-serializable form of one
//! XML vocabulary: its root elements, complex and simple types, reusable
//! element groups, and the schemas it includes (same namespace) or imports
//! (foreign namespace). It carries no behavior; the
//! [`Resolver`](crate::resolver::Resolver) interprets it.
//!
//! Descriptions can be written by hand with the builder methods below or
//! loaded from JSON produced by an offline XSD converter:
//!
//! ```json
//! {
//!   "namespaceUri": "urn:orders",
//!   "rootElements": [{ "name": "Order", "typeName": "OrderType" }],
//!   "complexTypes": {
//!     "OrderType": {
//!       "attributes": [{ "name": "id", "typeName": "string", "required": true }],
//!       "sequence": [{ "name": "item", "typeName": "ItemType", "maxOccurs": "unbounded" }]
//!     }
//!   }
//! }
//! ```

pub mod builtins;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Whether attributes are written with their namespace prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    /// Attributes carry the owning schema's prefix
    #[default]
    Qualified,
    /// Attributes are written bare (the atom:link convention)
    Unqualified,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Qualified => f.write_str("qualified"),
            Form::Unqualified => f.write_str("unqualified"),
        }
    }
}

/// Root value describing one XML vocabulary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaDescription {
    /// Target namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,
    /// Preferred prefix for serialization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_prefix: Option<String>,
    /// Default form for attributes declared in this schema
    pub attribute_form_default: Form,
    /// Top-level element declarations, in declaration order
    pub root_elements: Vec<ElementDecl>,
    /// Named complex types
    pub complex_types: IndexMap<String, ComplexType>,
    /// Named simple types
    pub simple_types: IndexMap<String, SimpleType>,
    /// Named element groups
    pub groups: IndexMap<String, ElementGroup>,
    /// Same-namespace schemas whose declarations are visible unprefixed
    pub included_schemas: Vec<SchemaDescription>,
    /// Foreign-namespace schemas referenced by prefix
    pub imported_schemas: Vec<SchemaDescription>,
}

impl SchemaDescription {
    /// Create an empty, namespace-less schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a schema description from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the target namespace and its preferred prefix
    pub fn with_namespace(mut self, uri: impl Into<String>, prefix: Option<&str>) -> Self {
        self.namespace_uri = Some(uri.into());
        self.namespace_prefix = prefix.map(str::to_string);
        self
    }

    /// Set the default attribute form
    pub fn with_attribute_form_default(mut self, form: Form) -> Self {
        self.attribute_form_default = form;
        self
    }

    /// Add a top-level element declaration
    pub fn with_root_element(mut self, element: ElementDecl) -> Self {
        self.root_elements.push(element);
        self
    }

    /// Add a named complex type
    pub fn with_complex_type(mut self, name: impl Into<String>, ty: ComplexType) -> Self {
        self.complex_types.insert(name.into(), ty);
        self
    }

    /// Add a named simple type
    pub fn with_simple_type(mut self, name: impl Into<String>, ty: SimpleType) -> Self {
        self.simple_types.insert(name.into(), ty);
        self
    }

    /// Add a named element group
    pub fn with_group(mut self, name: impl Into<String>, group: ElementGroup) -> Self {
        self.groups.insert(name.into(), group);
        self
    }

    /// Include a same-namespace schema
    pub fn including(mut self, schema: SchemaDescription) -> Self {
        self.included_schemas.push(schema);
        self
    }

    /// Import a foreign-namespace schema
    pub fn importing(mut self, schema: SchemaDescription) -> Self {
        self.imported_schemas.push(schema);
        self
    }

    /// Find a top-level element declared directly in this schema
    pub fn root_element(&self, local_name: &str) -> Option<&ElementDecl> {
        self.root_elements.iter().find(|e| e.name == local_name)
    }
}

/// A top-level element declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDecl {
    /// Element name
    pub name: String,
    /// Named type of the element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Anonymous type, checked before `type_name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complex_type: Option<Box<ComplexType>>,
    /// Abstract elements only appear through their substitutes
    #[serde(rename = "abstract", skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    /// Head element this one may stand in for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitution_group: Option<String>,
    /// Attribute form override for this element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_form: Option<Form>,
}

impl ElementDecl {
    /// Declare an element of a named type
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            ..Default::default()
        }
    }

    /// Declare an element with an anonymous complex type
    pub fn inline(name: impl Into<String>, ty: ComplexType) -> Self {
        Self {
            name: name.into(),
            complex_type: Some(Box::new(ty)),
            ..Default::default()
        }
    }

    /// Mark the element abstract
    pub fn into_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Put the element into the substitution group of `head`
    pub fn substituting(mut self, head: impl Into<String>) -> Self {
        self.substitution_group = Some(head.into());
        self
    }

    /// Override the attribute form
    pub fn with_attribute_form(mut self, form: Form) -> Self {
        self.attribute_form = Some(form);
        self
    }
}

/// Structural contract of an element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplexType {
    /// Base type; its members come first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Text-only content typed by the base
    #[serde(skip_serializing_if = "is_false")]
    pub simple_content: bool,
    /// Ordered child content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<Particle>>,
    /// Attribute declarations in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeDecl>,
    /// Group spliced in after the sequence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ref: Option<String>,
}

impl ComplexType {
    /// A type with no content model yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A type whose content is the given sequence
    pub fn with_sequence(particles: Vec<Particle>) -> Self {
        Self {
            sequence: Some(particles),
            ..Default::default()
        }
    }

    /// A text-only type with the given base
    pub fn simple_content(base: impl Into<String>) -> Self {
        Self {
            extends: Some(base.into()),
            simple_content: true,
            ..Default::default()
        }
    }

    /// Set the base type
    pub fn extending(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: AttributeDecl) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Splice a group in after the sequence
    pub fn with_group_ref(mut self, group: impl Into<String>) -> Self {
        self.group_ref = Some(group.into());
        self
    }
}

/// One position in a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Particle {
    /// Reference to a named element group
    Group(GroupRef),
    /// A local element or element reference
    Element(ElementRef),
}

impl From<ElementRef> for Particle {
    fn from(element: ElementRef) -> Self {
        Particle::Element(element)
    }
}

impl From<GroupRef> for Particle {
    fn from(group: GroupRef) -> Self {
        Particle::Group(group)
    }
}

/// Group particle inside a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    /// Group name
    pub group: String,
}

impl GroupRef {
    /// Reference a group by name
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }
}

/// A local element in a sequence
///
/// Either `name` (with `typeName` or an inline `complexType`) or `ref` is
/// set. A `ref` points at a top-level element *declaration*, whose name and
/// type are inherited; it is never looked up as a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    /// Local element name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Named type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Reference to a top-level element declaration
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    /// Anonymous type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_type: Option<Box<ComplexType>>,
    /// 0 makes the element optional
    #[serde(default = "default_min_occurs")]
    pub min_occurs: u32,
    /// Upper bound; anything above 1 binds to an array
    #[serde(default)]
    pub max_occurs: MaxOccurs,
    /// Attribute form override for this element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_form: Option<Form>,
}

impl ElementRef {
    /// A required, single element of a named type
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            type_name: Some(type_name.into()),
            ref_name: None,
            complex_type: None,
            min_occurs: 1,
            max_occurs: MaxOccurs::default(),
            attribute_form: None,
        }
    }

    /// A required, single element with an anonymous type
    pub fn inline(name: impl Into<String>, ty: ComplexType) -> Self {
        Self {
            type_name: None,
            complex_type: Some(Box::new(ty)),
            ..Self::new(name, "")
        }
    }

    /// A reference to a top-level element declaration
    pub fn reference(ref_name: impl Into<String>) -> Self {
        Self {
            name: None,
            type_name: None,
            ref_name: Some(ref_name.into()),
            ..Self::new("", "")
        }
    }

    /// Set minOccurs to 0
    pub fn optional(mut self) -> Self {
        self.min_occurs = 0;
        self
    }

    /// Set maxOccurs to unbounded
    pub fn unbounded(mut self) -> Self {
        self.max_occurs = MaxOccurs::Unbounded;
        self
    }

    /// Set explicit occurrence bounds
    pub fn occurs(mut self, min: u32, max: MaxOccurs) -> Self {
        self.min_occurs = min;
        self.max_occurs = max;
        self
    }

    /// Override the attribute form
    pub fn with_attribute_form(mut self, form: Form) -> Self {
        self.attribute_form = Some(form);
        self
    }
}

fn default_min_occurs() -> u32 {
    1
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Upper occurrence bound of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MaxOccursRepr", into = "MaxOccursRepr")]
pub enum MaxOccurs {
    /// At most this many
    Bounded(u32),
    /// Any number
    Unbounded,
}

impl MaxOccurs {
    /// True when the position binds to an array
    pub fn is_array(self) -> bool {
        match self {
            MaxOccurs::Bounded(n) => n > 1,
            MaxOccurs::Unbounded => true,
        }
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        MaxOccurs::Bounded(1)
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(n) => write!(f, "{}", n),
            MaxOccurs::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaxOccursRepr {
    Count(u32),
    Word(String),
}

impl TryFrom<MaxOccursRepr> for MaxOccurs {
    type Error = String;

    fn try_from(repr: MaxOccursRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            MaxOccursRepr::Count(n) => Ok(MaxOccurs::Bounded(n)),
            MaxOccursRepr::Word(word) if word == "unbounded" => Ok(MaxOccurs::Unbounded),
            MaxOccursRepr::Word(word) => word
                .parse()
                .map(MaxOccurs::Bounded)
                .map_err(|_| format!("invalid maxOccurs '{}'", word)),
        }
    }
}

impl From<MaxOccurs> for MaxOccursRepr {
    fn from(max: MaxOccurs) -> Self {
        match max {
            MaxOccurs::Bounded(n) => MaxOccursRepr::Count(n),
            MaxOccurs::Unbounded => MaxOccursRepr::Word("unbounded".to_string()),
        }
    }
}

/// Attribute declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDecl {
    /// Attribute name
    pub name: String,
    /// Simple or built-in type; `string` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Whether the attribute must be present
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Lexical value used when the attribute is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl AttributeDecl {
    /// An optional attribute of the given type
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            required: false,
            default: None,
        }
    }

    /// Mark the attribute required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Give the attribute a default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Restriction of a built-in or another simple type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimpleType {
    /// Restricted type; `string` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Allowed literals in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
}

impl SimpleType {
    /// Pass-through restriction of `base`
    pub fn restriction(base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
            enumeration: None,
        }
    }

    /// String enumeration
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base: None,
            enumeration: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Set the base of an enumeration
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// Reusable list of particles
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementGroup {
    /// Particles spliced wherever the group is referenced
    pub sequence: Vec<Particle>,
}

impl ElementGroup {
    /// Group of the given particles
    pub fn new(sequence: Vec<Particle>) -> Self {
        Self { sequence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_shape() {
        let json = json!({
            "namespaceUri": "urn:orders",
            "namespacePrefix": "o",
            "rootElements": [{ "name": "Order", "typeName": "OrderType" }],
            "complexTypes": {
                "OrderType": {
                    "attributes": [{ "name": "id", "typeName": "string", "required": true }],
                    "sequence": [
                        { "name": "item", "typeName": "ItemType", "minOccurs": 0, "maxOccurs": "unbounded" },
                        { "group": "Common" },
                        { "ref": "o:note" }
                    ]
                }
            },
            "simpleTypes": {
                "Status": { "enumeration": ["pending", "confirmed"] }
            }
        });

        let schema: SchemaDescription = serde_json::from_value(json).unwrap();
        assert_eq!(schema.namespace_prefix.as_deref(), Some("o"));
        assert_eq!(schema.attribute_form_default, Form::Qualified);

        let order = &schema.complex_types["OrderType"];
        assert!(order.attributes[0].required);
        let sequence = order.sequence.as_ref().unwrap();
        match &sequence[0] {
            Particle::Element(e) => {
                assert_eq!(e.min_occurs, 0);
                assert_eq!(e.max_occurs, MaxOccurs::Unbounded);
            }
            other => panic!("expected element, got {:?}", other),
        }
        assert_eq!(sequence[1], Particle::Group(GroupRef::new("Common")));
        match &sequence[2] {
            Particle::Element(e) => {
                assert_eq!(e.ref_name.as_deref(), Some("o:note"));
                assert_eq!(e.min_occurs, 1);
                assert_eq!(e.max_occurs, MaxOccurs::Bounded(1));
            }
            other => panic!("expected element ref, got {:?}", other),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let schema = SchemaDescription::new()
            .with_namespace("urn:orders", Some("o"))
            .with_root_element(ElementDecl::new("Order", "OrderType"))
            .with_complex_type(
                "OrderType",
                ComplexType::with_sequence(vec![
                    ElementRef::new("item", "string").unbounded().into(),
                    ElementRef::new("note", "string").occurs(0, MaxOccurs::Bounded(3)).into(),
                ])
                .with_attribute(AttributeDecl::new("id", "string").required()),
            )
            .with_simple_type("Status", SimpleType::enumeration(["a", "b"]));

        let text = schema.to_json_pretty().unwrap();
        assert!(text.contains("\"unbounded\""));
        let back = SchemaDescription::from_json(&text).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_invalid_max_occurs() {
        let result: std::result::Result<ElementRef, _> =
            serde_json::from_value(json!({ "name": "a", "maxOccurs": "many" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_max_occurs_is_array() {
        assert!(!MaxOccurs::Bounded(1).is_array());
        assert!(MaxOccurs::Bounded(2).is_array());
        assert!(MaxOccurs::Unbounded.is_array());
    }
}
