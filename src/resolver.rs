//! Schema resolution
//!
//! The resolver turns a type name into the flat contract the parser and the
//! builder work from: every attribute and child element the type accepts,
//! with inherited members merged in, group references expanded and element
//! references followed to their top-level declarations.
//!
//! A [`SchemaDescription`] and everything it includes or imports is laid out
//! in an arena of schema nodes at construction time. Each node is addressed
//! by a [`SchemaId`], which is how resolved members remember the schema
//! (and therefore the namespace) they were declared in.
//!
//! Flattened contracts are cached per [`TypeKey`]. The cache sits behind an
//! `RwLock`, so one resolver can serve concurrent parse and build calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ReferenceKind, Result, SchemaError};
use crate::limits::Limits;
use crate::names::{local_name, split_qname, validate_qname};
use crate::schema::builtins::{is_xsd_prefix, primitive_for, Primitive};
use crate::schema::{
    AttributeDecl, ComplexType, ElementDecl, ElementGroup, ElementRef, Form, MaxOccurs, Particle,
    SchemaDescription, SimpleType,
};

/// Position of a schema in the resolver's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    /// The schema the resolver was created from
    pub const ROOT: SchemaId = SchemaId(0);

    /// Arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of a complex type: the schema declaring it and its name
///
/// Anonymous types get a path-like name derived from where they are
/// declared (`OrderType/items`, `element:Order`, `group:Common/entry`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    /// Declaring schema
    pub schema: SchemaId,
    /// Type name, unprefixed
    pub name: String,
}

impl TypeKey {
    /// Build a key
    pub fn new(schema: SchemaId, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A resolved simple type: its built-in family plus any enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueType {
    /// Name of the simple or built-in type
    pub name: String,
    /// Built-in at the bottom of the restriction chain
    pub builtin: String,
    /// JSON representation family
    pub primitive: Primitive,
    /// Allowed literals, when restricted by enumeration
    pub enumeration: Option<Vec<String>>,
}

impl ValueType {
    /// A built-in type
    pub fn builtin(name: &str, primitive: Primitive) -> Self {
        Self {
            name: name.to_string(),
            builtin: name.to_string(),
            primitive,
            enumeration: None,
        }
    }

    /// Plain `string`
    pub fn string() -> Self {
        Self::builtin("string", Primitive::String)
    }
}

/// What a type name resolved to
#[derive(Debug, Clone)]
pub enum TypeRef<'a> {
    /// A named or anonymous complex type
    Complex {
        /// Cache key
        key: TypeKey,
        /// The declaration
        ty: &'a ComplexType,
    },
    /// A simple or built-in type
    Simple(ValueType),
}

/// Content of an element position
#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    /// Text only, no attributes
    Simple(ValueType),
    /// Structured content; resolve with [`Resolver::contract`]
    Complex(TypeKey),
}

/// An attribute in a flattened contract
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUse {
    /// Local attribute name, the key used in bound objects
    pub name: String,
    /// The declaration as written
    pub decl: AttributeDecl,
    /// Schema whose namespace qualifies the attribute
    pub schema: SchemaId,
    /// Resolved value type
    pub value_type: ValueType,
}

/// A child element position in a flattened contract
#[derive(Debug, Clone, PartialEq)]
pub struct ElementUse {
    /// Element name, the key used in bound objects
    pub name: String,
    /// Schema whose namespace qualifies the element
    pub schema: SchemaId,
    /// Lower occurrence bound
    pub min_occurs: u32,
    /// Upper occurrence bound
    pub max_occurs: MaxOccurs,
    /// Only substitutes appear at this position
    pub is_abstract: bool,
    /// Attribute form override
    pub attribute_form: Option<Form>,
    /// What the element contains
    pub content: ElementContent,
}

impl ElementUse {
    /// True when the position binds to an array
    pub fn is_array(&self) -> bool {
        self.max_occurs.is_array()
    }

    /// True when the position may be absent
    pub fn is_optional(&self) -> bool {
        self.min_occurs == 0
    }
}

/// A concrete element that may replace an abstract one
#[derive(Debug, Clone, PartialEq)]
pub struct Substitute {
    /// The substitute's own element name
    pub name: String,
    /// Declaring schema
    pub schema: SchemaId,
    /// Attribute form override
    pub attribute_form: Option<Form>,
    /// The substitute's own content
    pub content: ElementContent,
}

/// Flattened attribute/element contract of one complex type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeContract {
    /// Type name (path-like for anonymous types)
    pub name: String,
    /// Declaring schema
    pub schema: SchemaId,
    /// Text value type for simple content
    pub text: Option<ValueType>,
    /// Attributes, inherited first
    pub attributes: Vec<AttributeUse>,
    /// Child elements, inherited first
    pub elements: Vec<ElementUse>,
}

impl TypeContract {
    /// True for simple content (text plus attributes)
    pub fn has_simple_content(&self) -> bool {
        self.text.is_some()
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeUse> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up a child element by name
    pub fn element(&self, name: &str) -> Option<&ElementUse> {
        self.elements.iter().find(|e| e.name == name)
    }
}

#[derive(Debug)]
struct SchemaNode {
    description: SchemaDescription,
    includes: Vec<SchemaId>,
    imports: Vec<SchemaId>,
}

/// Resolves names and flattens types over a schema and its dependencies
#[derive(Debug)]
pub struct Resolver {
    nodes: Vec<SchemaNode>,
    anonymous: HashMap<TypeKey, ComplexType>,
    limits: Limits,
    contracts: RwLock<HashMap<TypeKey, Arc<TypeContract>>>,
    substitutes: RwLock<HashMap<String, Arc<Vec<Substitute>>>>,
}

impl Resolver {
    /// Create a resolver with default limits
    pub fn new(description: &SchemaDescription) -> Result<Self> {
        Self::with_limits(description, Limits::default())
    }

    /// Create a resolver
    pub fn with_limits(description: &SchemaDescription, limits: Limits) -> Result<Self> {
        let mut nodes = Vec::new();
        add_node(description, None, 0, &limits, &mut nodes)?;

        let mut anonymous = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            register_anonymous(&node.description, SchemaId(idx), &mut anonymous);
        }

        Ok(Self {
            nodes,
            anonymous,
            limits,
            contracts: RwLock::new(HashMap::new()),
            substitutes: RwLock::new(HashMap::new()),
        })
    }

    /// Limits the resolver was created with
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The schema behind an id, without its included/imported schemas
    pub fn schema(&self, id: SchemaId) -> &SchemaDescription {
        &self.nodes[id.0].description
    }

    /// Ids of every schema, root first
    pub fn schema_ids(&self) -> impl Iterator<Item = SchemaId> {
        (0..self.nodes.len()).map(SchemaId)
    }

    /// Target namespace of a schema
    pub fn namespace_of(&self, id: SchemaId) -> Option<&str> {
        self.schema(id).namespace_uri.as_deref()
    }

    /// Preferred prefix of a schema
    pub fn prefix_of(&self, id: SchemaId) -> Option<&str> {
        self.schema(id).namespace_prefix.as_deref()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Schemas to search from `from`: itself, its includes, then its imports,
    /// each recursively. A prefix naming another schema moves that schema
    /// to the front.
    fn search_order(&self, from: SchemaId, prefix: Option<&str>) -> Vec<SchemaId> {
        let mut order = Vec::new();
        self.collect_visible(from, &mut order);

        match prefix {
            Some(prefix) if self.prefix_of(from) != Some(prefix) => {
                let (mut preferred, rest): (Vec<_>, Vec<_>) = order
                    .into_iter()
                    .partition(|id| self.prefix_of(*id) == Some(prefix));
                preferred.extend(rest);
                preferred
            }
            _ => order,
        }
    }

    fn collect_visible(&self, id: SchemaId, order: &mut Vec<SchemaId>) {
        if order.contains(&id) {
            return;
        }
        order.push(id);
        let node = &self.nodes[id.0];
        for &inc in &node.includes {
            self.collect_visible(inc, order);
        }
        for &imp in &node.imports {
            self.collect_visible(imp, order);
        }
    }

    fn lookup<'a, T: 'a>(
        &'a self,
        name: &str,
        from: SchemaId,
        table: impl Fn(&'a SchemaDescription, &str) -> Option<&'a T>,
    ) -> Option<(&'a T, SchemaId)> {
        let (prefix, local) = split_qname(name);
        self.search_order(from, prefix)
            .into_iter()
            .find_map(|id| table(&self.nodes[id.0].description, local).map(|found| (found, id)))
    }

    /// Find a named complex type visible from `from`
    pub fn resolve_complex_type(
        &self,
        name: &str,
        from: SchemaId,
    ) -> Option<(&ComplexType, SchemaId)> {
        self.lookup(name, from, |schema, local| schema.complex_types.get(local))
    }

    /// Find a named simple type visible from `from`
    pub fn resolve_simple_type(&self, name: &str, from: SchemaId) -> Option<(&SimpleType, SchemaId)> {
        self.lookup(name, from, |schema, local| schema.simple_types.get(local))
    }

    /// Find a top-level element declaration visible from `from`
    pub fn resolve_element_decl(
        &self,
        name: &str,
        from: SchemaId,
    ) -> Option<(&ElementDecl, SchemaId)> {
        self.lookup(name, from, |schema, local| schema.root_element(local))
    }

    /// Find a named element group visible from `from`
    pub fn resolve_group(&self, name: &str, from: SchemaId) -> Option<(&ElementGroup, SchemaId)> {
        self.lookup(name, from, |schema, local| schema.groups.get(local))
    }

    /// Find the declaration for a document root element.
    ///
    /// Schemas whose namespace matches the document's are preferred; a
    /// match on local name alone is accepted as a fallback.
    pub fn find_root_element(
        &self,
        local: &str,
        namespace: Option<&str>,
    ) -> Option<(&ElementDecl, SchemaId)> {
        let order = self.search_order(SchemaId::ROOT, None);
        let in_namespace = order.iter().find_map(|&id| {
            let schema = self.schema(id);
            if namespace.is_some() && schema.namespace_uri.as_deref() == namespace {
                schema.root_element(local).map(|decl| (decl, id))
            } else {
                None
            }
        });
        in_namespace.or_else(|| {
            order
                .iter()
                .find_map(|&id| self.schema(id).root_element(local).map(|decl| (decl, id)))
        })
    }

    /// Whether a top-level element is abstract
    pub fn is_abstract(&self, element_name: &str, from: SchemaId) -> Result<bool> {
        self.resolve_element_decl(element_name, from)
            .map(|(decl, _)| decl.is_abstract)
            .ok_or_else(|| {
                SchemaError::UnresolvedReference {
                    kind: ReferenceKind::Element,
                    name: element_name.to_string(),
                    referenced_by: self.describe(from),
                }
                .into()
            })
    }

    fn describe(&self, id: SchemaId) -> String {
        self.namespace_of(id)
            .map(|ns| format!("schema {}", ns))
            .unwrap_or_else(|| "schema".to_string())
    }

    /// Resolve a type reference. Complex types win over simple types,
    /// which win over built-ins; `xs:`/`xsd:` always mean built-ins.
    pub fn resolve_type(&self, name: &str, from: SchemaId, referenced_by: &str) -> Result<TypeRef<'_>> {
        let (prefix, local) = split_qname(name);
        if !prefix.map_or(false, is_xsd_prefix) {
            if let Some((ty, id)) = self.resolve_complex_type(name, from) {
                return Ok(TypeRef::Complex {
                    key: TypeKey::new(id, local),
                    ty,
                });
            }
        }
        self.value_type(name, from, referenced_by).map(TypeRef::Simple)
    }

    /// Resolve a simple or built-in type to its value type
    pub fn value_type(&self, name: &str, from: SchemaId, referenced_by: &str) -> Result<ValueType> {
        self.value_type_in_chain(name, from, referenced_by, &mut Vec::new())
    }

    fn value_type_in_chain(
        &self,
        name: &str,
        from: SchemaId,
        referenced_by: &str,
        chain: &mut Vec<String>,
    ) -> Result<ValueType> {
        let (prefix, local) = split_qname(name);

        if prefix.map_or(false, is_xsd_prefix) {
            return primitive_for(local)
                .map(|p| ValueType::builtin(local, p))
                .ok_or_else(|| SchemaError::unresolved_type(name, referenced_by).into());
        }

        if let Some((simple, id)) = self.resolve_simple_type(name, from) {
            if chain.iter().any(|seen| seen == local) {
                let mut cycle = chain.clone();
                cycle.push(local.to_string());
                return Err(SchemaError::CyclicInheritance { chain: cycle }.into());
            }
            chain.push(local.to_string());
            let base = simple.base.as_deref().unwrap_or("string");
            let mut value_type = self.value_type_in_chain(base, id, local, chain)?;
            chain.pop();

            value_type.name = local.to_string();
            if let Some(values) = &simple.enumeration {
                value_type.enumeration = Some(values.clone());
            }
            return Ok(value_type);
        }

        if let Some(primitive) = primitive_for(local) {
            return Ok(ValueType::builtin(local, primitive));
        }

        if self.resolve_complex_type(name, from).is_some() {
            return Err(SchemaError::InvalidDeclaration {
                name: referenced_by.to_string(),
                reason: format!("'{}' is a complex type where a simple type is required", name),
            }
            .into());
        }

        Err(SchemaError::unresolved_type(name, referenced_by).into())
    }

    // ------------------------------------------------------------------
    // Flattening
    // ------------------------------------------------------------------

    fn complex_type_for(&self, key: &TypeKey) -> Option<&ComplexType> {
        self.anonymous
            .get(key)
            .or_else(|| self.schema(key.schema).complex_types.get(&key.name))
    }

    /// Every complex type, named and anonymous, in declaration order per schema
    pub fn type_keys(&self) -> Vec<TypeKey> {
        let mut keys = Vec::new();
        for id in self.schema_ids() {
            keys.extend(
                self.schema(id)
                    .complex_types
                    .keys()
                    .map(|name| TypeKey::new(id, name.as_str())),
            );
            let mut anonymous: Vec<TypeKey> =
                self.anonymous.keys().filter(|k| k.schema == id).cloned().collect();
            anonymous.sort_by(|a, b| a.name.cmp(&b.name));
            keys.extend(anonymous);
        }
        keys
    }

    /// Flattened contract of a complex type, computed once and cached
    pub fn contract(&self, key: &TypeKey) -> Result<Arc<TypeContract>> {
        self.contract_in_chain(key, &mut Vec::new())
    }

    /// Flattened contract of the complex content of an element, if any
    pub fn content_contract(&self, content: &ElementContent) -> Result<Option<Arc<TypeContract>>> {
        match content {
            ElementContent::Simple(_) => Ok(None),
            ElementContent::Complex(key) => self.contract(key).map(Some),
        }
    }

    fn contract_in_chain(&self, key: &TypeKey, chain: &mut Vec<TypeKey>) -> Result<Arc<TypeContract>> {
        if let Some(found) = self
            .contracts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Arc::clone(found));
        }

        if let Some(start) = chain.iter().position(|k| k == key) {
            let mut cycle: Vec<String> = chain[start..].iter().map(|k| k.name.clone()).collect();
            cycle.push(key.name.clone());
            return Err(SchemaError::CyclicInheritance { chain: cycle }.into());
        }
        self.limits.check_inheritance_depth(chain.len())?;

        let ty = self
            .complex_type_for(key)
            .ok_or_else(|| SchemaError::unresolved_type(key.name.clone(), self.describe(key.schema)))?;

        chain.push(key.clone());
        let flattened = self.flatten(ty, key, chain);
        chain.pop();
        let contract = Arc::new(flattened?);

        let mut cache = self.contracts.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(key.clone()).or_insert_with(|| {
            log::debug!(
                "resolved type '{}': {} attributes, {} elements",
                key.name,
                contract.attributes.len(),
                contract.elements.len()
            );
            contract
        });
        Ok(Arc::clone(entry))
    }

    fn flatten(&self, ty: &ComplexType, key: &TypeKey, chain: &mut Vec<TypeKey>) -> Result<TypeContract> {
        let owner = key.name.as_str();
        let schema = key.schema;
        let conflict = || SchemaError::ContentConflict {
            type_name: owner.to_string(),
        };

        if ty.simple_content && ty.sequence.is_some() {
            return Err(conflict().into());
        }

        let mut contract = TypeContract {
            name: owner.to_string(),
            schema,
            text: None,
            attributes: Vec::new(),
            elements: Vec::new(),
        };

        if let Some(base) = &ty.extends {
            match self.resolve_type(base, schema, owner)? {
                TypeRef::Complex { key: base_key, .. } => {
                    let inherited = self.contract_in_chain(&base_key, chain)?;
                    contract.text = inherited.text.clone();
                    contract.attributes = inherited.attributes.clone();
                    contract.elements = inherited.elements.clone();
                }
                TypeRef::Simple(value_type) => contract.text = Some(value_type),
            }
        }

        if ty.simple_content {
            if contract.text.is_none() {
                return Err(SchemaError::InvalidDeclaration {
                    name: owner.to_string(),
                    reason: "simpleContent requires a simple base type".to_string(),
                }
                .into());
            }
            if !contract.elements.is_empty() {
                return Err(conflict().into());
            }
        }

        for decl in &ty.attributes {
            let attribute = self.attribute_use(decl, schema, owner)?;
            // The most derived declaration replaces an inherited one.
            contract.attributes.retain(|a| a.name != attribute.name);
            contract.attributes.push(attribute);
        }

        let mut own_elements = Vec::new();
        if let Some(sequence) = &ty.sequence {
            self.expand_particles(sequence, schema, owner, &mut own_elements, &mut Vec::new())?;
        }
        if let Some(group) = &ty.group_ref {
            self.expand_group(group, schema, owner, &mut own_elements, &mut Vec::new())?;
        }
        if contract.text.is_some() && !own_elements.is_empty() {
            return Err(conflict().into());
        }
        contract.elements.extend(own_elements);

        Ok(contract)
    }

    fn attribute_use(&self, decl: &AttributeDecl, schema: SchemaId, owner: &str) -> Result<AttributeUse> {
        let referenced_by = format!("{}@{}", owner, decl.name);
        let type_name = decl.type_name.as_deref().filter(|t| !t.is_empty()).unwrap_or("string");
        let value_type = self.value_type(type_name, schema, &referenced_by)?;

        // A prefixed attribute name is qualified by the schema bound to that prefix.
        let (prefix, local) = split_qname(&decl.name);
        let owning_schema = prefix
            .and_then(|p| {
                self.search_order(schema, Some(p))
                    .into_iter()
                    .find(|id| self.prefix_of(*id) == Some(p))
            })
            .unwrap_or(schema);

        Ok(AttributeUse {
            name: local.to_string(),
            decl: decl.clone(),
            schema: owning_schema,
            value_type,
        })
    }

    fn expand_particles(
        &self,
        particles: &[Particle],
        schema: SchemaId,
        owner: &str,
        out: &mut Vec<ElementUse>,
        groups: &mut Vec<String>,
    ) -> Result<()> {
        for particle in particles {
            match particle {
                Particle::Element(element) => out.push(self.element_use(element, schema, owner)?),
                Particle::Group(group) => self.expand_group(&group.group, schema, owner, out, groups)?,
            }
        }
        Ok(())
    }

    fn expand_group(
        &self,
        name: &str,
        from: SchemaId,
        owner: &str,
        out: &mut Vec<ElementUse>,
        groups: &mut Vec<String>,
    ) -> Result<()> {
        let (group, group_schema) =
            self.resolve_group(name, from)
                .ok_or_else(|| SchemaError::UnresolvedReference {
                    kind: ReferenceKind::Group,
                    name: name.to_string(),
                    referenced_by: owner.to_string(),
                })?;

        let local = local_name(name).to_string();
        if groups.contains(&local) {
            let mut cycle = groups.clone();
            cycle.push(local);
            return Err(SchemaError::CyclicGroup { chain: cycle }.into());
        }

        groups.push(local.clone());
        let group_owner = format!("group:{}", local);
        let result = self.expand_particles(&group.sequence, group_schema, &group_owner, out, groups);
        groups.pop();
        result
    }

    /// Resolve one sequence entry.
    ///
    /// A `ref` is looked up among top-level *element declarations* and takes
    /// the declaration's name, type and namespace. A `name` keeps its own
    /// name and resolves `typeName` among *types*. The two paths never mix.
    fn element_use(&self, element: &ElementRef, schema: SchemaId, owner: &str) -> Result<ElementUse> {
        if let MaxOccurs::Bounded(max) = element.max_occurs {
            if element.min_occurs > max {
                return Err(SchemaError::InvalidDeclaration {
                    name: element_label(element, owner),
                    reason: format!("minOccurs {} exceeds maxOccurs {}", element.min_occurs, max),
                }
                .into());
            }
        }

        if let Some(ref_name) = &element.ref_name {
            let has_own_type = element.type_name.as_deref().map_or(false, |t| !t.is_empty())
                || element.complex_type.is_some();
            if element.name.as_deref().map_or(false, |n| !n.is_empty()) || has_own_type {
                return Err(SchemaError::InvalidDeclaration {
                    name: ref_name.clone(),
                    reason: "an element reference cannot also declare a name or type".to_string(),
                }
                .into());
            }

            let (decl, decl_schema) = self.resolve_element_decl(ref_name, schema).ok_or_else(|| {
                SchemaError::UnresolvedReference {
                    kind: ReferenceKind::Element,
                    name: ref_name.clone(),
                    referenced_by: owner.to_string(),
                }
            })?;

            return Ok(ElementUse {
                name: decl.name.clone(),
                schema: decl_schema,
                min_occurs: element.min_occurs,
                max_occurs: element.max_occurs,
                is_abstract: decl.is_abstract,
                attribute_form: element.attribute_form.or(decl.attribute_form),
                content: self.decl_content(decl, decl_schema)?,
            });
        }

        let name = element
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SchemaError::InvalidDeclaration {
                name: owner.to_string(),
                reason: "sequence entry needs either 'name' or 'ref'".to_string(),
            })?;

        let content = if element.complex_type.is_some() {
            ElementContent::Complex(TypeKey::new(schema, format!("{}/{}", owner, name)))
        } else {
            match element.type_name.as_deref().filter(|t| !t.is_empty()) {
                Some(type_name) => self.content_for_type(type_name, schema, &format!("{}/{}", owner, name))?,
                None => ElementContent::Simple(ValueType::string()),
            }
        };

        Ok(ElementUse {
            name: name.to_string(),
            schema,
            min_occurs: element.min_occurs,
            max_occurs: element.max_occurs,
            is_abstract: false,
            attribute_form: element.attribute_form,
            content,
        })
    }

    /// Content of a top-level element: inline type first, then the named type
    pub fn decl_content(&self, decl: &ElementDecl, schema: SchemaId) -> Result<ElementContent> {
        if decl.complex_type.is_some() {
            return Ok(ElementContent::Complex(TypeKey::new(
                schema,
                format!("element:{}", decl.name),
            )));
        }
        match decl.type_name.as_deref().filter(|t| !t.is_empty()) {
            Some(type_name) => self.content_for_type(type_name, schema, &decl.name),
            None => Ok(ElementContent::Simple(ValueType::string())),
        }
    }

    fn content_for_type(&self, type_name: &str, schema: SchemaId, referenced_by: &str) -> Result<ElementContent> {
        Ok(match self.resolve_type(type_name, schema, referenced_by)? {
            TypeRef::Complex { key, .. } => ElementContent::Complex(key),
            TypeRef::Simple(value_type) => ElementContent::Simple(value_type),
        })
    }

    // ------------------------------------------------------------------
    // Walks
    // ------------------------------------------------------------------

    /// Effective attributes of a type, inherited first
    pub fn walk_attributes(&self, type_name: &str, from: SchemaId) -> Result<Vec<AttributeUse>> {
        match self.resolve_type(type_name, from, type_name)? {
            TypeRef::Complex { key, .. } => Ok(self.contract(&key)?.attributes.clone()),
            TypeRef::Simple(_) => Ok(Vec::new()),
        }
    }

    /// Effective child elements of a type, inherited first
    pub fn walk_elements(&self, type_name: &str, from: SchemaId) -> Result<Vec<ElementUse>> {
        match self.resolve_type(type_name, from, type_name)? {
            TypeRef::Complex { key, .. } => Ok(self.contract(&key)?.elements.clone()),
            TypeRef::Simple(_) => Ok(Vec::new()),
        }
    }

    /// Concrete elements that may stand in for `head`, across every schema.
    ///
    /// Substitutes of substitutes are included; abstract ones are skipped.
    pub fn find_substitutes(&self, head: &str) -> Result<Arc<Vec<Substitute>>> {
        let head = local_name(head).to_string();
        if let Some(found) = self
            .substitutes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&head)
        {
            return Ok(Arc::clone(found));
        }

        let mut result = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut heads = VecDeque::new();
        seen.insert(head.clone());
        heads.push_back(head.clone());

        while let Some(current) = heads.pop_front() {
            for id in self.schema_ids() {
                for decl in &self.schema(id).root_elements {
                    let member = decl
                        .substitution_group
                        .as_deref()
                        .map_or(false, |group| local_name(group) == current);
                    if !member || !seen.insert(decl.name.clone()) {
                        continue;
                    }
                    if !decl.is_abstract {
                        result.push(Substitute {
                            name: decl.name.clone(),
                            schema: id,
                            attribute_form: decl.attribute_form,
                            content: self.decl_content(decl, id)?,
                        });
                    }
                    heads.push_back(decl.name.clone());
                }
            }
        }

        let result = Arc::new(result);
        let mut cache = self.substitutes.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(head).or_insert(result)))
    }

    // ------------------------------------------------------------------
    // Authoring-time validation
    // ------------------------------------------------------------------

    /// Resolve every declaration once and report the first structural error
    pub fn check(&self) -> Result<()> {
        for id in self.schema_ids() {
            let schema = self.schema(id);

            for (name, ty) in &schema.complex_types {
                validate_qname(name)?;
                for attribute in &ty.attributes {
                    validate_qname(&attribute.name)?;
                }
            }

            for name in schema.simple_types.keys() {
                validate_qname(name)?;
                self.value_type(name, id, name)?;
            }

            for decl in &schema.root_elements {
                validate_qname(&decl.name)?;
                if let ElementContent::Complex(key) = self.decl_content(decl, id)? {
                    self.check_contract(&key)?;
                }
                if let Some(head) = &decl.substitution_group {
                    if self.resolve_element_decl(head, id).is_none() {
                        return Err(SchemaError::UnresolvedReference {
                            kind: ReferenceKind::Element,
                            name: head.clone(),
                            referenced_by: decl.name.clone(),
                        }
                        .into());
                    }
                }
            }

            for name in schema.groups.keys() {
                let mut elements = Vec::new();
                self.expand_group(name, id, name, &mut elements, &mut Vec::new())?;
            }
        }

        for key in self.type_keys() {
            self.check_contract(&key)?;
        }
        Ok(())
    }

    fn check_contract(&self, key: &TypeKey) -> Result<()> {
        let contract = self.contract(key)?;
        for element in &contract.elements {
            validate_qname(&element.name)?;
            if element.is_abstract {
                self.find_substitutes(&element.name)?;
            }
        }
        Ok(())
    }
}

fn element_label(element: &ElementRef, owner: &str) -> String {
    element
        .name
        .clone()
        .or_else(|| element.ref_name.clone())
        .unwrap_or_else(|| owner.to_string())
}

fn add_node(
    description: &SchemaDescription,
    parent: Option<&SchemaDescription>,
    depth: usize,
    limits: &Limits,
    nodes: &mut Vec<SchemaNode>,
) -> Result<SchemaId> {
    limits.check_schema_depth(depth)?;

    let mut own = SchemaDescription {
        included_schemas: Vec::new(),
        imported_schemas: Vec::new(),
        ..description.clone()
    };
    // An include without its own namespace adopts the includer's.
    if let Some(parent) = parent {
        if own.namespace_uri.is_none() {
            own.namespace_uri = parent.namespace_uri.clone();
            own.namespace_prefix = own
                .namespace_prefix
                .take()
                .or_else(|| parent.namespace_prefix.clone());
        }
    }

    let id = SchemaId(nodes.len());
    nodes.push(SchemaNode {
        description: own,
        includes: Vec::new(),
        imports: Vec::new(),
    });

    let mut includes = Vec::new();
    for included in &description.included_schemas {
        let own = nodes[id.0].description.clone();
        includes.push(add_node(included, Some(&own), depth + 1, limits, nodes)?);
    }
    let mut imports = Vec::new();
    for imported in &description.imported_schemas {
        imports.push(add_node(imported, None, depth + 1, limits, nodes)?);
    }

    nodes[id.0].includes = includes;
    nodes[id.0].imports = imports;
    Ok(id)
}

fn register_anonymous(
    schema: &SchemaDescription,
    id: SchemaId,
    out: &mut HashMap<TypeKey, ComplexType>,
) {
    for (name, ty) in &schema.complex_types {
        register_inline(ty, id, name, out);
    }
    for decl in &schema.root_elements {
        if let Some(ty) = &decl.complex_type {
            let key = format!("element:{}", decl.name);
            register_inline(ty, id, &key, out);
            out.insert(TypeKey::new(id, key), (**ty).clone());
        }
    }
    for (name, group) in &schema.groups {
        register_particles(&group.sequence, id, &format!("group:{}", name), out);
    }
}

fn register_inline(ty: &ComplexType, id: SchemaId, owner: &str, out: &mut HashMap<TypeKey, ComplexType>) {
    if let Some(sequence) = &ty.sequence {
        register_particles(sequence, id, owner, out);
    }
}

fn register_particles(
    particles: &[Particle],
    id: SchemaId,
    owner: &str,
    out: &mut HashMap<TypeKey, ComplexType>,
) {
    for particle in particles {
        if let Particle::Element(element) = particle {
            if let (Some(name), Some(inner)) = (&element.name, &element.complex_type) {
                let key = format!("{}/{}", owner, name);
                register_inline(inner, id, &key, out);
                out.insert(TypeKey::new(id, key), (**inner).clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{AttributeDecl, ElementGroup, GroupRef};

    fn chain_schema() -> SchemaDescription {
        SchemaDescription::new()
            .with_complex_type(
                "Base",
                ComplexType::with_sequence(vec![ElementRef::new("a", "string").into()])
                    .with_attribute(AttributeDecl::new("base", "string"))
                    .with_attribute(AttributeDecl::new("shared", "string")),
            )
            .with_complex_type(
                "Middle",
                ComplexType::with_sequence(vec![ElementRef::new("b", "int").into()])
                    .extending("Base")
                    .with_attribute(AttributeDecl::new("middle", "string")),
            )
            .with_complex_type(
                "Derived",
                ComplexType::with_sequence(vec![ElementRef::new("c", "boolean").into()])
                    .extending("Middle")
                    .with_attribute(AttributeDecl::new("shared", "int"))
                    .with_attribute(AttributeDecl::new("derived", "string")),
            )
    }

    #[test]
    fn test_inheritance_order() {
        let resolver = Resolver::new(&chain_schema()).unwrap();
        let attributes = resolver.walk_attributes("Derived", SchemaId::ROOT).unwrap();
        let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["base", "middle", "shared", "derived"]);
        assert_eq!(attributes[2].value_type.primitive, Primitive::Integer);

        let elements = resolver.walk_elements("Derived", SchemaId::ROOT).unwrap();
        let names: Vec<_> = elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_contract_is_cached() {
        let resolver = Resolver::new(&chain_schema()).unwrap();
        let key = TypeKey::new(SchemaId::ROOT, "Derived");
        let first = resolver.contract(&key).unwrap();
        let second = resolver.contract(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cyclic_inheritance() {
        let schema = SchemaDescription::new()
            .with_complex_type("A", ComplexType::new().extending("B"))
            .with_complex_type("B", ComplexType::new().extending("C"))
            .with_complex_type("C", ComplexType::new().extending("A"));
        let resolver = Resolver::new(&schema).unwrap();

        let err = resolver.contract(&TypeKey::new(SchemaId::ROOT, "A")).unwrap_err();
        match err {
            Error::Schema(SchemaError::CyclicInheritance { chain }) => {
                assert_eq!(chain, ["A", "B", "C", "A"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_type() {
        let schema = SchemaDescription::new().with_complex_type(
            "Order",
            ComplexType::with_sequence(vec![ElementRef::new("line", "LineType").into()]),
        );
        let resolver = Resolver::new(&schema).unwrap();
        let err = resolver.check().unwrap_err();
        match err {
            Error::Schema(SchemaError::UnresolvedReference {
                kind,
                name,
                referenced_by,
            }) => {
                assert_eq!(kind, ReferenceKind::Type);
                assert_eq!(name, "LineType");
                assert_eq!(referenced_by, "Order/line");
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_content_conflict() {
        let mut ty = ComplexType::simple_content("string");
        ty.sequence = Some(vec![ElementRef::new("x", "string").into()]);
        let schema = SchemaDescription::new().with_complex_type("Bad", ty);
        let resolver = Resolver::new(&schema).unwrap();
        assert!(matches!(
            resolver.check(),
            Err(Error::Schema(SchemaError::ContentConflict { .. }))
        ));
    }

    #[test]
    fn test_simple_content_chain() {
        let schema = SchemaDescription::new()
            .with_complex_type(
                "Amount",
                ComplexType::simple_content("decimal").with_attribute(AttributeDecl::new("currency", "string")),
            )
            .with_complex_type(
                "TaxedAmount",
                ComplexType::simple_content("Amount").with_attribute(AttributeDecl::new("rate", "decimal")),
            );
        let resolver = Resolver::new(&schema).unwrap();
        let contract = resolver.contract(&TypeKey::new(SchemaId::ROOT, "TaxedAmount")).unwrap();
        assert_eq!(contract.text.as_ref().unwrap().primitive, Primitive::Decimal);
        assert_eq!(contract.attributes.len(), 2);
    }

    #[test]
    fn test_groups_are_spliced() {
        let schema = SchemaDescription::new()
            .with_group(
                "Audit",
                ElementGroup::new(vec![
                    ElementRef::new("createdBy", "string").into(),
                    ElementRef::new("changedBy", "string").optional().into(),
                ]),
            )
            .with_complex_type(
                "Object",
                ComplexType::with_sequence(vec![
                    ElementRef::new("name", "string").into(),
                    GroupRef::new("Audit").into(),
                    ElementRef::new("description", "string").into(),
                ]),
            )
            .with_complex_type("Tail", ComplexType::new().with_group_ref("Audit"));
        let resolver = Resolver::new(&schema).unwrap();

        let names: Vec<_> = resolver
            .walk_elements("Object", SchemaId::ROOT)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["name", "createdBy", "changedBy", "description"]);
        assert_eq!(resolver.walk_elements("Tail", SchemaId::ROOT).unwrap().len(), 2);
    }

    #[test]
    fn test_cyclic_group() {
        let schema = SchemaDescription::new()
            .with_group("A", ElementGroup::new(vec![GroupRef::new("B").into()]))
            .with_group("B", ElementGroup::new(vec![GroupRef::new("A").into()]));
        let resolver = Resolver::new(&schema).unwrap();
        assert!(matches!(
            resolver.check(),
            Err(Error::Schema(SchemaError::CyclicGroup { .. }))
        ));
    }

    #[test]
    fn test_ref_uses_declaration_not_type() {
        // The declaration 'entry' has type 'EntryType'; a type named 'entry'
        // also exists and must not be picked up by the reference.
        let schema = SchemaDescription::new()
            .with_root_element(ElementDecl::new("entry", "EntryType"))
            .with_complex_type("EntryType", ComplexType::new().with_attribute(AttributeDecl::new("id", "string")))
            .with_complex_type("entry", ComplexType::new().with_attribute(AttributeDecl::new("wrong", "string")))
            .with_complex_type(
                "Feed",
                ComplexType::with_sequence(vec![ElementRef::reference("entry").unbounded().into()]),
            );
        let resolver = Resolver::new(&schema).unwrap();
        let elements = resolver.walk_elements("Feed", SchemaId::ROOT).unwrap();
        assert_eq!(elements[0].name, "entry");
        assert_eq!(
            elements[0].content,
            ElementContent::Complex(TypeKey::new(SchemaId::ROOT, "EntryType"))
        );
    }

    #[test]
    fn test_ref_with_type_is_rejected() {
        let mut reference = ElementRef::reference("entry");
        reference.type_name = Some("string".into());
        let schema = SchemaDescription::new()
            .with_root_element(ElementDecl::new("entry", "string"))
            .with_complex_type("Feed", ComplexType::with_sequence(vec![reference.into()]));
        let resolver = Resolver::new(&schema).unwrap();
        assert!(matches!(
            resolver.check(),
            Err(Error::Schema(SchemaError::InvalidDeclaration { .. }))
        ));
    }

    #[test]
    fn test_imported_types_keep_their_schema() {
        let atom = SchemaDescription::new()
            .with_namespace("http://www.w3.org/2005/Atom", Some("atom"))
            .with_root_element(ElementDecl::new("link", "linkType"))
            .with_complex_type(
                "linkType",
                ComplexType::new().with_attribute(AttributeDecl::new("href", "string").required()),
            );
        let schema = SchemaDescription::new()
            .with_namespace("http://www.sap.com/adt/core", Some("adtcore"))
            .importing(atom)
            .with_complex_type(
                "AdtObject",
                ComplexType::with_sequence(vec![ElementRef::reference("atom:link").unbounded().into()]),
            );
        let resolver = Resolver::new(&schema).unwrap();
        resolver.check().unwrap();

        let elements = resolver.walk_elements("AdtObject", SchemaId::ROOT).unwrap();
        assert_eq!(resolver.prefix_of(elements[0].schema), Some("atom"));
        let contract = resolver.content_contract(&elements[0].content).unwrap().unwrap();
        assert_eq!(resolver.prefix_of(contract.attributes[0].schema), Some("atom"));
    }

    #[test]
    fn test_included_schema_adopts_namespace() {
        let common = SchemaDescription::new().with_complex_type("Named", ComplexType::new());
        let schema = SchemaDescription::new()
            .with_namespace("urn:main", Some("m"))
            .including(common)
            .with_complex_type("Thing", ComplexType::new().extending("Named"));
        let resolver = Resolver::new(&schema).unwrap();
        let (_, id) = resolver.resolve_complex_type("Named", SchemaId::ROOT).unwrap();
        assert_ne!(id, SchemaId::ROOT);
        assert_eq!(resolver.namespace_of(id), Some("urn:main"));
        resolver.check().unwrap();
    }

    #[test]
    fn test_substitutes_are_transitive() {
        let schema = SchemaDescription::new()
            .with_root_element(ElementDecl::new("Item", "string").into_abstract())
            .with_root_element(ElementDecl::new("Media", "string").into_abstract().substituting("Item"))
            .with_root_element(ElementDecl::new("book", "string").substituting("Item"))
            .with_root_element(ElementDecl::new("dvd", "string").substituting("Media"));
        let resolver = Resolver::new(&schema).unwrap();

        assert!(resolver.is_abstract("Item", SchemaId::ROOT).unwrap());
        assert!(!resolver.is_abstract("book", SchemaId::ROOT).unwrap());
        assert!(resolver.is_abstract("missing", SchemaId::ROOT).is_err());

        let names: Vec<_> = resolver
            .find_substitutes("Item")
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, ["book", "dvd"]);
    }

    #[test]
    fn test_simple_type_chain_and_prefixes() {
        let schema = SchemaDescription::new()
            .with_simple_type("Code", SimpleType::restriction("xs:token"))
            .with_simple_type("Status", SimpleType::enumeration(["open", "closed"]).with_base("Code"))
            .with_simple_type("Count", SimpleType::restriction("xsd:unsignedInt"));
        let resolver = Resolver::new(&schema).unwrap();

        let status = resolver.value_type("Status", SchemaId::ROOT, "test").unwrap();
        assert_eq!(status.builtin, "token");
        assert_eq!(status.primitive, Primitive::String);
        assert_eq!(status.enumeration.as_deref().unwrap().len(), 2);

        let count = resolver.value_type("Count", SchemaId::ROOT, "test").unwrap();
        assert_eq!(count.primitive, Primitive::Integer);

        assert!(resolver.value_type("xs:nope", SchemaId::ROOT, "test").is_err());
    }

    #[test]
    fn test_schema_depth_limit() {
        let mut schema = SchemaDescription::new();
        for _ in 0..5 {
            schema = SchemaDescription::new().including(schema);
        }
        let limits = Limits {
            max_schema_depth: 3,
            ..Limits::default()
        };
        assert!(matches!(
            Resolver::with_limits(&schema, limits),
            Err(Error::LimitExceeded(_))
        ));
    }
}
