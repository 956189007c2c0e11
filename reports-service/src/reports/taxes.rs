//! `/wc/v3/reports/taxes`: keeps the base report parameters and schema,
//! declares the per-rate aggregate fields and links each row to its tax
//! rate.

use super::{ParentLink, ReportDefinition, base_item_schema};
use crate::schema::{FieldSchema, FieldType, ItemSchema};

pub const REST_BASE: &str = "reports/taxes";

pub fn definition() -> ReportDefinition {
    ReportDefinition {
        item_schema: item_schema(),
        parent_link: Some(ParentLink::new("tax", "taxes", "tax_rate_id")),
        ..ReportDefinition::base(REST_BASE)
    }
}

/// The base `report` schema plus the fields every tax row carries.
pub fn item_schema() -> ItemSchema {
    base_item_schema()
        .field(FieldSchema::new("tax_rate_id", FieldType::Integer, "Tax rate ID."))
        .field(FieldSchema::new("rate", FieldType::Number, "Tax rate percentage."))
        .field(FieldSchema::new(
            "total_tax",
            FieldType::Number,
            "Total tax collected at this rate.",
        ))
        .field(FieldSchema::new(
            "orders_count",
            FieldType::Integer,
            "Number of orders taxed at this rate.",
        ))
}
