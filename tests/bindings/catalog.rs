// Generated by adt-schema. Do not edit.

#![allow(clippy::all, dead_code)]
use serde::{Deserialize, Serialize};
/// XML type `ShelfType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub book: Vec<BookType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dvd: Vec<DvdType>,
}
/// XML type `ItemType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemType {
    pub title: String,
}
/// XML type `BookType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookType {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i64>,
}
/// XML type `DvdType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DvdType {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
}
/// A document of this schema, keyed by its root element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Document {
    #[serde(rename = "shelf")]
    Shelf(ShelfType),
    #[serde(rename = "book")]
    Book(BookType),
    #[serde(rename = "dvd")]
    Dvd(DvdType),
}
impl Document {
    /// Parse XML text; every non-optional field must be present
    pub fn from_xml(schema: &adt_schema::Schema, xml: &str) -> adt_schema::Result<Self> {
        let value = schema.parse_with(xml, &adt_schema::ParseOptions::strict())?;
        Ok(serde_json::from_value(value)?)
    }
    /// Serialize to XML text
    pub fn to_xml(
        &self,
        schema: &adt_schema::Schema,
        options: &adt_schema::BuildOptions,
    ) -> adt_schema::Result<String> {
        let value = serde_json::to_value(self)?;
        schema.build(&value, options)
    }
}
