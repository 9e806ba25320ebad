// Generated by adt-schema. Do not edit.

#![allow(clippy::all, dead_code)]
use serde::{Deserialize, Serialize};
/// Values of `OrderStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "shipped")]
    Shipped,
}
/// XML type `OrderType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderType {
    pub id: String,
    pub items: ItemList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}
/// XML type `ItemList`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<LineItem>,
}
/// XML type `LineItem`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
}
/// A document of this schema, keyed by its root element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Document {
    #[serde(rename = "Order")]
    Order(OrderType),
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
