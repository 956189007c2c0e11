//! Declarative descriptions of report items and accepted query parameters.
//!
//! An [`ItemSchema`] says which fields a report row carries and in which
//! [`Context`] each is visible. A [`CollectionParams`] list is the complete
//! set of query parameters an endpoint accepts; nothing outside it is ever
//! read from the request.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-04/schema#";

/// Output visibility mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    #[default]
    View,
    Edit,
}

impl std::str::FromStr for Context {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Context::View),
            "edit" => Ok(Context::Edit),
            _ => Err(format!("Invalid context: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Number,
    String,
    Boolean,
    Object,
    Array,
}

/// One property of a report item.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldType,
    pub readonly: bool,
    pub context: Vec<Context>,
    pub description: String,
}

impl FieldSchema {
    /// Read-only field visible in both contexts.
    pub fn new(name: impl Into<String>, kind: FieldType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            readonly: true,
            context: vec![Context::View, Context::Edit],
            description: description.into(),
        }
    }

    pub fn with_context(mut self, context: &[Context]) -> Self {
        self.context = context.to_vec();
        self
    }

    pub fn visible_in(&self, context: Context) -> bool {
        self.context.contains(&context)
    }

    fn to_json(&self) -> Value {
        json!({
            "type": self.kind,
            "readonly": self.readonly,
            "context": self.context,
            "description": self.description,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemSchema {
    pub title: String,
    pub properties: Vec<FieldSchema>,
}

impl ItemSchema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            properties: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.properties.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.properties.iter().find(|f| f.name == name)
    }

    /// Drops every declared field that is not visible in `context`.
    /// Keys the schema does not declare are left untouched.
    pub fn filter_by_context(&self, mut data: Map<String, Value>, context: Context) -> Map<String, Value> {
        for field in &self.properties {
            if !field.visible_in(context) {
                data.remove(&field.name);
            }
        }
        data
    }

    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|f| (f.name.clone(), f.to_json()))
            .collect();

        json!({
            "$schema": JSON_SCHEMA_DRAFT,
            "title": self.title,
            "type": "object",
            "properties": properties,
        })
    }
}

/// Type and bounds of a single query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Enum {
        values: Vec<String>,
    },
    DateTime,
    IdList,
    Boolean,
}

/// Rewrite applied to a parameter value once it has passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitizer {
    /// Absolute integer value.
    AbsInt,
    /// Absolute ids, duplicates removed, first occurrence kept.
    ParseIdList,
    /// `true|1|yes` to `true`, everything else to `false`.
    StringToBool,
}

impl Sanitizer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sanitizer::AbsInt => "absint",
            Sanitizer::ParseIdList => "parse_id_list",
            Sanitizer::StringToBool => "string_to_bool",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub default: Option<Value>,
    pub sanitize: Option<Sanitizer>,
}

impl ParamSchema {
    fn new(name: impl Into<String>, description: impl Into<String>, kind: ParamKind) -> Self {
        let sanitize = match &kind {
            ParamKind::Integer { .. } => Some(Sanitizer::AbsInt),
            ParamKind::IdList => Some(Sanitizer::ParseIdList),
            ParamKind::Boolean => Some(Sanitizer::StringToBool),
            ParamKind::Enum { .. } | ParamKind::DateTime => None,
        };
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            default: None,
            sanitize,
        }
    }

    pub fn integer(
        name: impl Into<String>,
        description: impl Into<String>,
        minimum: Option<i64>,
        maximum: Option<i64>,
    ) -> Self {
        Self::new(name, description, ParamKind::Integer { minimum, maximum })
    }

    pub fn enumeration(
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
    ) -> Self {
        let values = values.iter().map(|v| v.to_string()).collect();
        Self::new(name, description, ParamKind::Enum { values })
    }

    pub fn date_time(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::DateTime)
    }

    pub fn id_list(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::IdList)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParamKind::Boolean)
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Overrides the sanitiser implied by the kind; `None` keeps the
    /// validated value as is.
    pub fn with_sanitizer(mut self, sanitize: Option<Sanitizer>) -> Self {
        self.sanitize = sanitize;
        self
    }

    fn to_json(&self) -> Value {
        let mut arg = Map::new();
        arg.insert("description".into(), json!(self.description));

        match &self.kind {
            ParamKind::Integer { minimum, maximum } => {
                arg.insert("type".into(), json!("integer"));
                if let Some(min) = minimum {
                    arg.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    arg.insert("maximum".into(), json!(max));
                }
            }
            ParamKind::Enum { values } => {
                arg.insert("type".into(), json!("string"));
                arg.insert("enum".into(), json!(values));
            }
            ParamKind::DateTime => {
                arg.insert("type".into(), json!("string"));
                arg.insert("format".into(), json!("date-time"));
            }
            ParamKind::IdList => {
                arg.insert("type".into(), json!("array"));
                arg.insert("items".into(), json!({ "type": "integer" }));
            }
            ParamKind::Boolean => {
                arg.insert("type".into(), json!("boolean"));
            }
        }

        if let Some(default) = &self.default {
            arg.insert("default".into(), default.clone());
        }
        if let Some(sanitize) = self.sanitize {
            arg.insert("sanitize".into(), json!(sanitize.as_str()));
        }

        Value::Object(arg)
    }
}

/// Ordered set of accepted query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionParams {
    params: Vec<ParamSchema>,
}

impl CollectionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `param`, replacing any existing parameter with the same name
    /// in place.
    pub fn with(mut self, param: ParamSchema) -> Self {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSchema> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSchema> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn to_json(&self) -> Value {
        let args: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json()))
            .collect();
        Value::Object(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ItemSchema {
        ItemSchema::new("report_test")
            .field(FieldSchema::new("id", FieldType::Integer, "Id."))
            .field(
                FieldSchema::new("cost", FieldType::Number, "Internal cost.")
                    .with_context(&[Context::Edit]),
            )
    }

    fn row() -> Map<String, Value> {
        json!({ "id": 7, "cost": 1.5, "undeclared": true })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn view_context_strips_edit_only_fields() {
        let filtered = schema().filter_by_context(row(), Context::View);
        assert_eq!(filtered.get("id"), Some(&json!(7)));
        assert!(!filtered.contains_key("cost"));
        assert_eq!(filtered.get("undeclared"), Some(&json!(true)));
    }

    #[test]
    fn edit_context_keeps_all_declared_fields() {
        let filtered = schema().filter_by_context(row(), Context::Edit);
        assert!(filtered.contains_key("id"));
        assert!(filtered.contains_key("cost"));
    }

    #[test]
    fn item_schema_renders_json_schema_document() {
        let doc = schema().to_json();
        assert_eq!(doc["$schema"], JSON_SCHEMA_DRAFT);
        assert_eq!(doc["title"], "report_test");
        assert_eq!(doc["properties"]["cost"]["type"], "number");
        assert_eq!(doc["properties"]["cost"]["context"], json!(["edit"]));
        assert_eq!(doc["properties"]["id"]["readonly"], true);
    }

    #[test]
    fn with_replaces_parameter_in_place() {
        let params = CollectionParams::new()
            .with(ParamSchema::enumeration("orderby", "Sort.", &["date"]))
            .with(ParamSchema::boolean("flag", "Flag."))
            .with(ParamSchema::enumeration("orderby", "Sort.", &["date", "total"]));

        assert_eq!(params.names(), vec!["orderby", "flag"]);
        assert_eq!(
            params.get("orderby").map(|p| &p.kind),
            Some(&ParamKind::Enum {
                values: vec!["date".to_string(), "total".to_string()]
            })
        );
    }

    #[test]
    fn collection_params_render_constraints() {
        let params = CollectionParams::new()
            .with(ParamSchema::integer("per_page", "Page size.", Some(1), Some(100)).with_default(json!(10)))
            .with(ParamSchema::id_list("products", "Ids."))
            .with(ParamSchema::boolean("extended", "Extended."))
            .with(ParamSchema::enumeration("order", "Order.", &["asc", "desc"]))
            .with(ParamSchema::date_time("after", "After."));

        let doc = params.to_json();
        assert_eq!(doc["per_page"]["minimum"], 1);
        assert_eq!(doc["per_page"]["maximum"], 100);
        assert_eq!(doc["per_page"]["default"], 10);
        assert_eq!(doc["per_page"]["sanitize"], "absint");
        assert_eq!(doc["products"]["items"]["type"], "integer");
        assert_eq!(doc["products"]["sanitize"], "parse_id_list");
        assert_eq!(doc["extended"]["sanitize"], "string_to_bool");
        assert!(doc["order"].get("sanitize").is_none());
        assert_eq!(doc["after"]["format"], "date-time");
        assert!(doc["after"].get("default").is_none());
        assert!(doc["after"].get("sanitize").is_none());
    }
}
