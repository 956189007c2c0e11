//! `/wc/v3/reports/products`: per-product sales totals.

use serde_json::json;

use super::{ParentLink, ReportConfig, ReportDefinition, base_collection_params};
use crate::schema::{CollectionParams, FieldSchema, FieldType, ItemSchema, ParamSchema};

pub const REST_BASE: &str = "reports/products";

pub const ORDERBY: &[&str] = &["date", "gross_revenue", "orders_count", "items_sold"];

pub fn definition() -> ReportDefinition {
    ReportDefinition {
        config: ReportConfig::new(REST_BASE),
        item_schema: item_schema(),
        collection_params: collection_params(),
        parent_link: Some(ParentLink::new("product", "products", "product_id")),
    }
}

pub fn item_schema() -> ItemSchema {
    ItemSchema::new("report_products")
        .field(FieldSchema::new("product_id", FieldType::Integer, "Product ID."))
        .field(FieldSchema::new(
            "items_sold",
            FieldType::Integer,
            "Number of items sold.",
        ))
        .field(FieldSchema::new(
            "gross_revenue",
            FieldType::Number,
            "Total gross revenue of all items sold.",
        ))
        .field(FieldSchema::new(
            "orders_count",
            FieldType::Integer,
            "Number of orders product appeared in.",
        ))
        .field(FieldSchema::new(
            "extended_info",
            FieldType::Object,
            "Extended product information, present when extended_product_info is set.",
        ))
}

pub fn collection_params() -> CollectionParams {
    base_collection_params()
        .with(
            ParamSchema::enumeration("orderby", "Sort collection by object attribute.", ORDERBY)
                .with_default(json!("date")),
        )
        .with(ParamSchema::id_list(
            "categories",
            "Limit result to items from the specified categories.",
        ))
        .with(ParamSchema::id_list(
            "products",
            "Limit result to items with specified product ids.",
        ))
        .with(
            ParamSchema::boolean(
                "extended_product_info",
                "Add additional piece of info about each product to the report.",
            )
            .with_default(json!(false)),
        )
}
