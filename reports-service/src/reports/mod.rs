//! Report definitions.
//!
//! Every report shares the same namespace and pagination parameters
//! ([`ReportConfig`], [`base_collection_params`]); individual reports only
//! override the item schema, widen the parameter set and name the parent
//! resource their rows link to.

pub mod products;
pub mod taxes;

use serde_json::json;

use crate::schema::{CollectionParams, Context, FieldSchema, FieldType, ItemSchema, ParamSchema};

pub const NAMESPACE: &str = "wc/v3";

/// Routing shared by all reports: `/{namespace}/{rest_base}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub namespace: String,
    pub rest_base: String,
}

impl ReportConfig {
    pub fn new(rest_base: impl Into<String>) -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            rest_base: rest_base.into(),
        }
    }

    pub fn route(&self) -> String {
        format!("/{}/{}", self.namespace, self.rest_base)
    }

    /// Short name used in logs and metric labels, e.g. `products`.
    pub fn name(&self) -> &str {
        self.rest_base
            .rsplit('/')
            .next()
            .unwrap_or(self.rest_base.as_str())
    }
}

/// Which resource an item links back to, and the item field holding its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub rel: String,
    pub resource: String,
    pub id_field: String,
}

impl ParentLink {
    pub fn new(rel: &str, resource: &str, id_field: &str) -> Self {
        Self {
            rel: rel.to_string(),
            resource: resource.to_string(),
            id_field: id_field.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDefinition {
    pub config: ReportConfig,
    pub item_schema: ItemSchema,
    pub collection_params: CollectionParams,
    pub parent_link: Option<ParentLink>,
}

impl ReportDefinition {
    /// A report with the base schema and parameters and no parent link.
    pub fn base(rest_base: &str) -> Self {
        Self {
            config: ReportConfig::new(rest_base),
            item_schema: base_item_schema(),
            collection_params: base_collection_params(),
            parent_link: None,
        }
    }
}

/// `slug` and `description`, both visible in the `view` context only.
pub fn base_item_schema() -> ItemSchema {
    ItemSchema::new("report")
        .field(
            FieldSchema::new(
                "slug",
                FieldType::String,
                "An alphanumeric identifier for the resource.",
            )
            .with_context(&[Context::View]),
        )
        .field(
            FieldSchema::new(
                "description",
                FieldType::String,
                "A human-readable description of the resource.",
            )
            .with_context(&[Context::View]),
        )
}

pub fn base_collection_params() -> CollectionParams {
    CollectionParams::new()
        .with(
            ParamSchema::enumeration(
                "context",
                "Scope under which the request is made; determines fields present in response.",
                &["view", "edit"],
            )
            .with_default(json!("view")),
        )
        .with(
            ParamSchema::integer("page", "Current page of the collection.", Some(1), None)
                .with_default(json!(1)),
        )
        .with(
            ParamSchema::integer(
                "per_page",
                "Maximum number of items to be returned in result set.",
                Some(1),
                Some(100),
            )
            .with_default(json!(10)),
        )
        .with(ParamSchema::date_time(
            "after",
            "Limit response to resources published after a given ISO8601 compliant date.",
        ))
        .with(ParamSchema::date_time(
            "before",
            "Limit response to resources published before a given ISO8601 compliant date.",
        ))
        .with(
            ParamSchema::enumeration(
                "order",
                "Order sort attribute ascending or descending.",
                &["asc", "desc"],
            )
            .with_default(json!("desc")),
        )
        .with(
            ParamSchema::enumeration("orderby", "Sort collection by object attribute.", &["date"])
                .with_default(json!("date")),
        )
}
