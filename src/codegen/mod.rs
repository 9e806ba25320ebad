//! Rust bindings for a schema
//!
//! Generates one struct per complex type (inherited members flattened), one
//! enum per string enumeration and a `Document` enum over the root elements.
//! The generated types serialize to exactly the JSON shape the parser
//! produces and the builder accepts, so `from_xml`/`to_xml` are a serde
//! conversion away from the runtime engine.

mod naming;

use std::collections::{HashMap, HashSet};

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse_quote, Ident, Item, Type};

use crate::engine::Schema;
use crate::error::{Error, Result};
use crate::parser::TEXT_KEY;
use crate::resolver::{ElementContent, ElementUse, Resolver, TypeContract, TypeKey, ValueType};
use crate::schema::builtins::Primitive;

/// Code generation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Path of the runtime crate in the generated code
    pub runtime_crate: String,
    /// Emit the `Document` enum with `from_xml`/`to_xml`
    pub document_enum: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_crate: "adt_schema".to_string(),
            document_enum: true,
        }
    }
}

/// Generate Rust source for every type in the schema
pub fn generate(schema: &Schema, options: &CodegenOptions) -> Result<String> {
    let runtime: syn::Path = syn::parse_str(&options.runtime_crate)
        .map_err(|e| Error::Codegen(format!("invalid runtime crate path: {}", e)))?;

    let mut generator = Generator::new(schema.resolver());
    if options.document_enum {
        generator.reserve("Document");
    }

    generator.name_types()?;
    generator.emit_enumerations()?;
    for key in schema.resolver().type_keys() {
        generator.emit_struct(&key)?;
    }
    if options.document_enum {
        generator.emit_document(&runtime)?;
    }

    let mut items: Vec<Item> = vec![parse_quote! {
        use serde::{Deserialize, Serialize};
    }];
    items.append(&mut generator.items);

    let file = syn::File {
        shebang: None,
        attrs: vec![parse_quote!(#![allow(clippy::all, dead_code)])],
        items,
    };
    Ok(format!(
        "// Generated by adt-schema. Do not edit.\n\n{}",
        prettyplease::unparse(&file)
    ))
}

struct Generator<'r> {
    resolver: &'r Resolver,
    used: HashSet<String>,
    type_names: HashMap<TypeKey, String>,
    enum_names: HashMap<String, String>,
    items: Vec<Item>,
}

impl<'r> Generator<'r> {
    fn new(resolver: &'r Resolver) -> Self {
        Self {
            resolver,
            used: HashSet::new(),
            type_names: HashMap::new(),
            enum_names: HashMap::new(),
            items: Vec::new(),
        }
    }

    fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    fn unique(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        candidate
    }

    fn name_types(&mut self) -> Result<()> {
        for key in self.resolver.type_keys() {
            let readable = key.name.strip_prefix("element:").unwrap_or(&key.name);
            let name = self.unique(naming::type_ident(readable));
            self.type_names.insert(key, name);
        }
        Ok(())
    }

    fn emit_enumerations(&mut self) -> Result<()> {
        let resolver = self.resolver;
        for id in resolver.schema_ids() {
            for name in resolver.schema(id).simple_types.keys() {
                let value_type = resolver.value_type(name, id, name)?;
                let Some(literals) = value_type.enumeration.as_ref() else {
                    continue;
                };
                if !matches!(value_type.primitive, Primitive::String | Primitive::Date)
                    || self.enum_names.contains_key(name)
                {
                    continue;
                }

                let enum_name = self.unique(naming::type_ident(name));
                self.enum_names.insert(name.clone(), enum_name.clone());

                let mut variants_used = HashSet::new();
                let variants: Vec<TokenStream> = literals
                    .iter()
                    .map(|literal| {
                        let base = naming::variant_ident(literal);
                        let mut variant = base.clone();
                        let mut n = 2;
                        while !variants_used.insert(variant.clone()) {
                            variant = format!("{}{}", base, n);
                            n += 1;
                        }
                        let variant = ident(&variant);
                        quote! {
                            #[serde(rename = #literal)]
                            #variant
                        }
                    })
                    .collect();

                let enum_ident = ident(&enum_name);
                let doc = format!(" Values of `{}`", name);
                self.items.push(parse_quote! {
                    #[doc = #doc]
                    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
                    pub enum #enum_ident {
                        #(#variants),*
                    }
                });
            }
        }
        Ok(())
    }

    fn type_ident(&self, key: &TypeKey) -> Result<Ident> {
        self.type_names
            .get(key)
            .map(|name| ident(name))
            .ok_or_else(|| Error::Codegen(format!("no generated type for '{}'", key)))
    }

    fn value_type(&self, value_type: &ValueType) -> Type {
        if let Some(name) = self.enum_names.get(&value_type.name) {
            if value_type.enumeration.is_some() {
                let enum_ident = ident(name);
                return parse_quote!(#enum_ident);
            }
        }
        match value_type.primitive {
            Primitive::String | Primitive::Date => parse_quote!(String),
            Primitive::Integer => parse_quote!(i64),
            Primitive::Decimal => parse_quote!(f64),
            Primitive::Boolean => parse_quote!(bool),
        }
    }

    fn content_type(&self, content: &ElementContent, owner: &TypeKey) -> Result<(Type, bool)> {
        match content {
            ElementContent::Simple(value_type) => Ok((self.value_type(value_type), false)),
            ElementContent::Complex(key) => {
                let type_ident = self.type_ident(key)?;
                let recursive = self.reaches(key, owner, &mut HashSet::new())?;
                Ok((parse_quote!(#type_ident), recursive))
            }
        }
    }

    /// Whether `from` contains `target` through non-array fields
    fn reaches(&self, from: &TypeKey, target: &TypeKey, seen: &mut HashSet<TypeKey>) -> Result<bool> {
        if from == target {
            return Ok(true);
        }
        if !seen.insert(from.clone()) {
            return Ok(false);
        }
        let contract = self.resolver.contract(from)?;
        for position in contract.elements.iter().filter(|p| !p.is_array()) {
            for content in self.contents_at(position)? {
                if let ElementContent::Complex(key) = content {
                    if self.reaches(&key, target, seen)? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn contents_at(&self, position: &ElementUse) -> Result<Vec<ElementContent>> {
        if position.is_abstract {
            let substitutes = self.resolver.find_substitutes(&position.name)?;
            Ok(substitutes.iter().map(|s| s.content.clone()).collect())
        } else {
            Ok(vec![position.content.clone()])
        }
    }

    fn emit_struct(&mut self, key: &TypeKey) -> Result<()> {
        let contract = self.resolver.contract(key)?;
        let struct_ident = self.type_ident(key)?;
        let fields = self.fields(key, &contract)?;

        let doc = format!(" XML type `{}`", contract.name);
        self.items.push(parse_quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub struct #struct_ident {
                #(#fields),*
            }
        });
        Ok(())
    }

    fn fields(&self, key: &TypeKey, contract: &TypeContract) -> Result<Vec<TokenStream>> {
        let mut fields = FieldSet::default();

        if let Some(text) = &contract.text {
            fields.push(TEXT_KEY, self.value_type(text), Cardinality::Required);
        }

        for attribute in &contract.attributes {
            let cardinality = if attribute.decl.required || attribute.decl.default.is_some() {
                Cardinality::Required
            } else {
                Cardinality::Optional
            };
            fields.push(&attribute.name, self.value_type(&attribute.value_type), cardinality);
        }

        for position in &contract.elements {
            let cardinality = if position.is_array() {
                Cardinality::Many
            } else if position.is_optional() || position.is_abstract {
                Cardinality::Optional
            } else {
                Cardinality::Required
            };

            if position.is_abstract {
                let substitutes = self.resolver.find_substitutes(&position.name)?;
                for substitute in substitutes.iter() {
                    let (ty, recursive) = self.content_type(&substitute.content, key)?;
                    fields.push(&substitute.name, boxed(ty, recursive && cardinality != Cardinality::Many), cardinality);
                }
                continue;
            }

            let (ty, recursive) = self.content_type(&position.content, key)?;
            fields.push(&position.name, boxed(ty, recursive && cardinality != Cardinality::Many), cardinality);
        }

        Ok(fields.fields)
    }

    fn emit_document(&mut self, runtime: &syn::Path) -> Result<()> {
        let resolver = self.resolver;
        let mut used = HashSet::new();
        let mut variants = Vec::new();

        for id in resolver.schema_ids() {
            for decl in &resolver.schema(id).root_elements {
                if decl.is_abstract || !used.insert(decl.name.clone()) {
                    continue;
                }
                let ty = match resolver.decl_content(decl, id)? {
                    ElementContent::Simple(value_type) => self.value_type(&value_type),
                    ElementContent::Complex(key) => {
                        let type_ident = self.type_ident(&key)?;
                        parse_quote!(#type_ident)
                    }
                };
                let variant = ident(&naming::type_ident(&decl.name));
                let name = decl.name.as_str();
                variants.push(quote! {
                    #[serde(rename = #name)]
                    #variant(#ty)
                });
            }
        }

        self.items.push(parse_quote! {
            /// A document of this schema, keyed by its root element
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub enum Document {
                #(#variants),*
            }
        });
        self.items.push(parse_quote! {
            impl Document {
                /// Parse XML text; every non-optional field must be present
                pub fn from_xml(schema: &#runtime::Schema, xml: &str) -> #runtime::Result<Self> {
                    let value = schema.parse_with(xml, &#runtime::ParseOptions::strict())?;
                    Ok(serde_json::from_value(value)?)
                }

                /// Serialize to XML text
                pub fn to_xml(
                    &self,
                    schema: &#runtime::Schema,
                    options: &#runtime::BuildOptions,
                ) -> #runtime::Result<String> {
                    let value = serde_json::to_value(self)?;
                    schema.build(&value, options)
                }
            }
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cardinality {
    Required,
    Optional,
    Many,
}

/// Struct fields with unique identifiers
#[derive(Default)]
struct FieldSet {
    used: HashSet<String>,
    fields: Vec<TokenStream>,
}

impl FieldSet {
    fn push(&mut self, key: &str, ty: Type, cardinality: Cardinality) {
        let base = naming::field_ident(key);
        let mut name = base.clone();
        let mut n = 2;
        while !self.used.insert(name.clone()) {
            name = format!("{}_{}", base, n);
            n += 1;
        }

        let mut serde_args: Vec<TokenStream> = Vec::new();
        if name != key {
            serde_args.push(quote!(rename = #key));
        }
        let ty: Type = match cardinality {
            Cardinality::Required => ty,
            Cardinality::Optional => {
                serde_args.push(quote!(default, skip_serializing_if = "Option::is_none"));
                parse_quote!(Option<#ty>)
            }
            Cardinality::Many => {
                serde_args.push(quote!(default, skip_serializing_if = "Vec::is_empty"));
                parse_quote!(Vec<#ty>)
            }
        };

        let field_ident = ident(&name);
        let attrs = if serde_args.is_empty() {
            quote!()
        } else {
            quote!(#[serde(#(#serde_args),*)])
        };
        self.fields.push(quote! {
            #attrs
            pub #field_ident: #ty
        });
    }
}

fn boxed(ty: Type, recursive: bool) -> Type {
    if recursive {
        parse_quote!(Box<#ty>)
    } else {
        ty
    }
}

fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        AttributeDecl, ComplexType, ElementDecl, ElementRef, SchemaDescription, SimpleType,
    };

    fn generate_for(description: SchemaDescription) -> String {
        let schema = Schema::new(description).unwrap();
        generate(&schema, &CodegenOptions::default()).unwrap()
    }

    #[test]
    fn test_struct_fields() {
        let code = generate_for(
            SchemaDescription::new()
                .with_root_element(ElementDecl::new("Order", "OrderType"))
                .with_simple_type("Status", SimpleType::enumeration(["pending", "in-transit"]))
                .with_complex_type(
                    "OrderType",
                    ComplexType::with_sequence(vec![
                        ElementRef::new("status", "Status").into(),
                        ElementRef::new("note", "string").optional().into(),
                        ElementRef::new("lineItem", "int").unbounded().into(),
                    ])
                    .with_attribute(AttributeDecl::new("id", "string").required())
                    .with_attribute(AttributeDecl::new("type", "boolean")),
                ),
        );

        assert!(code.starts_with("// Generated by adt-schema"));
        assert!(code.contains("pub struct OrderType"));
        assert!(code.contains("pub id: String"));
        assert!(code.contains("#[serde(rename = \"type\", default, skip_serializing_if = \"Option::is_none\")]"));
        assert!(code.contains("pub type_: Option<bool>"));
        assert!(code.contains("pub status: Status"));
        assert!(code.contains("pub note: Option<String>"));
        assert!(code.contains("pub line_item: Vec<i64>"));
        assert!(code.contains("#[serde(rename = \"in-transit\")]"));
        assert!(code.contains("InTransit"));
        assert!(code.contains("pub enum Document"));
        assert!(code.contains("Order(OrderType)"));
    }

    #[test]
    fn test_simple_content_and_recursion() {
        let code = generate_for(
            SchemaDescription::new()
                .with_complex_type(
                    "Amount",
                    ComplexType::simple_content("decimal")
                        .with_attribute(AttributeDecl::new("currency", "string")),
                )
                .with_complex_type(
                    "Node",
                    ComplexType::with_sequence(vec![
                        ElementRef::new("parent", "Node").optional().into(),
                        ElementRef::new("children", "Node").unbounded().into(),
                    ]),
                ),
        );

        assert!(code.contains("#[serde(rename = \"$value\")]"));
        assert!(code.contains("pub value: f64"));
        assert!(code.contains("pub parent: Option<Box<Node>>"));
        assert!(code.contains("pub children: Vec<Node>"));
    }

    #[test]
    fn test_name_collisions() {
        let code = generate_for(
            SchemaDescription::new()
                .with_root_element(ElementDecl::inline("Order", ComplexType::new()))
                .with_complex_type("Order", ComplexType::new()),
        );
        assert!(code.contains("pub struct Order "));
        assert!(code.contains("pub struct Order2"));
    }

    #[test]
    fn test_invalid_runtime_path() {
        let schema = Schema::new(SchemaDescription::new()).unwrap();
        let options = CodegenOptions {
            runtime_crate: "not a path".into(),
            ..CodegenOptions::default()
        };
        assert!(matches!(generate(&schema, &options), Err(Error::Codegen(_))));
    }
}
