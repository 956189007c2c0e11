//! Validation and sanitisation of report query strings against a
//! [`CollectionParams`] declaration.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;

use crate::schema::{CollectionParams, Context, ParamKind, ParamSchema, Sanitizer};

pub type QueryPairs = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// A parameter value after validation and sanitisation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(u64),
    Text(String),
    DateTime(DateTime<Utc>),
    Ids(Vec<u64>),
    Bool(bool),
}

/// A parameter value that passed validation but has not been sanitised.
#[derive(Debug, Clone, PartialEq)]
enum Validated {
    Integer(i64),
    Text(String),
    DateTime(DateTime<Utc>),
    Ids(Vec<i64>),
    Bool(bool),
}

/// Validated arguments handed to a [`crate::services::ReportQuery`].
///
/// Only parameters declared by the endpoint are ever populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportArgs {
    pub context: Context,
    pub page: u32,
    pub per_page: u32,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub orderby: String,
    pub categories: Option<Vec<u64>>,
    pub products: Option<Vec<u64>>,
    pub extended_product_info: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            context: Context::View,
            page: 1,
            per_page: 10,
            after: None,
            before: None,
            order: SortOrder::Desc,
            orderby: "date".to_string(),
            categories: None,
            products: None,
            extended_product_info: false,
        }
    }
}

impl ReportArgs {
    fn assign(&mut self, name: &str, value: ParamValue) -> Result<(), String> {
        match (name, value) {
            ("context", ParamValue::Text(v)) => {
                self.context = v.parse().unwrap_or_default();
            }
            ("page", ParamValue::Integer(v)) => self.page = page_number(name, v)?,
            ("per_page", ParamValue::Integer(v)) => self.per_page = page_number(name, v)?,
            ("after", ParamValue::DateTime(v)) => self.after = Some(v),
            ("before", ParamValue::DateTime(v)) => self.before = Some(v),
            ("order", ParamValue::Text(v)) => {
                self.order = if v == "asc" {
                    SortOrder::Asc
                } else {
                    SortOrder::Desc
                };
            }
            ("orderby", ParamValue::Text(v)) => self.orderby = v,
            ("categories", ParamValue::Ids(v)) => self.categories = Some(v),
            ("products", ParamValue::Ids(v)) => self.products = Some(v),
            ("extended_product_info", ParamValue::Bool(v)) => self.extended_product_info = v,
            (other, value) => {
                tracing::debug!(param = other, ?value, "Declared parameter has no report argument");
            }
        }
        Ok(())
    }
}

fn page_number(name: &str, v: u64) -> Result<u32, String> {
    u32::try_from(v).map_err(|_| format!("{} is out of range", name))
}

/// Splits a raw query string into ordered key/value pairs.
pub fn parse_query_string(query: Option<&str>) -> Result<QueryPairs, AppError> {
    match query {
        None | Some("") => Ok(Vec::new()),
        Some(query) => serde_urlencoded::from_str::<QueryPairs>(query).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Malformed query string: {}", e))
        }),
    }
}

/// `categories[]` and `categories[3]` both address `categories`.
pub fn base_name(key: &str) -> &str {
    match key.find('[') {
        Some(idx) if key.ends_with(']') => &key[..idx],
        _ => key,
    }
}

/// Validates the declared parameters present in `pairs`, applies defaults
/// and sanitises every value. Undeclared keys are ignored. Every offending
/// parameter is reported at once.
pub fn parse_collection_params(
    pairs: &[(String, String)],
    params: &CollectionParams,
) -> Result<ReportArgs, AppError> {
    let mut raw: HashMap<&str, Vec<&str>> = HashMap::new();
    for (key, value) in pairs {
        raw.entry(base_name(key)).or_default().push(value.as_str());
    }

    let mut args = ReportArgs::default();
    let mut errors = BTreeMap::new();

    for param in params.iter() {
        let default_raw = param.default.as_ref().map(default_as_raw);
        let values: Vec<&str> = match (raw.get(param.name.as_str()), default_raw.as_deref()) {
            (Some(values), _) => values.clone(),
            (None, Some(default)) => vec![default],
            (None, None) => continue,
        };

        let outcome = validate(param, &values)
            .and_then(|value| sanitize(param, value))
            .and_then(|value| args.assign(&param.name, value));
        if let Err(reason) = outcome {
            errors.insert(param.name.clone(), reason);
        }
    }

    if errors.is_empty() {
        Ok(args)
    } else {
        Err(AppError::InvalidParams(errors))
    }
}

fn default_as_raw(default: &Value) -> String {
    match default {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Checks `values` against the declared kind and bounds.
fn validate(param: &ParamSchema, values: &[&str]) -> Result<Validated, String> {
    let name = param.name.as_str();
    // Repeated scalar parameters: the last one wins.
    let last = values.last().copied().unwrap_or_default();

    match &param.kind {
        ParamKind::Integer { minimum, maximum } => {
            let parsed: i64 = last
                .trim()
                .parse()
                .map_err(|_| format!("{} is not of type integer", name))?;
            match (minimum, maximum) {
                (Some(min), Some(max)) if parsed < *min || parsed > *max => Err(format!(
                    "{} must be between {} (inclusive) and {} (inclusive)",
                    name, min, max
                )),
                (Some(min), None) if parsed < *min => {
                    Err(format!("{} must be greater than or equal to {}", name, min))
                }
                (None, Some(max)) if parsed > *max => {
                    Err(format!("{} must be less than or equal to {}", name, max))
                }
                _ => Ok(Validated::Integer(parsed)),
            }
        }
        ParamKind::Enum { values: allowed } => {
            if allowed.iter().any(|v| v == last) {
                Ok(Validated::Text(last.to_string()))
            } else {
                Err(format!("{} is not one of {}", name, allowed.join(", ")))
            }
        }
        ParamKind::DateTime => parse_date_time(last)
            .map(Validated::DateTime)
            .ok_or_else(|| format!("{} is not a valid date-time", name)),
        ParamKind::IdList => parse_id_list(name, values).map(Validated::Ids),
        ParamKind::Boolean => parse_bool(last)
            .map(Validated::Bool)
            .ok_or_else(|| format!("{} is not of type boolean", name)),
    }
}

/// Applies the parameter's declared [`Sanitizer`]. Without one, the value
/// is only converted, and negative numbers are refused.
fn sanitize(param: &ParamSchema, value: Validated) -> Result<ParamValue, String> {
    let name = param.name.as_str();

    match (param.sanitize, value) {
        (Some(Sanitizer::AbsInt), Validated::Integer(v)) => Ok(ParamValue::Integer(v.unsigned_abs())),
        (Some(Sanitizer::ParseIdList), Validated::Ids(ids)) => Ok(ParamValue::Ids(unique_ids(ids))),
        (Some(Sanitizer::StringToBool), Validated::Bool(v)) => Ok(ParamValue::Bool(v)),
        (Some(rule), _) => Err(format!("{} cannot be sanitised with {}", name, rule.as_str())),
        (None, Validated::Integer(v)) => u64::try_from(v)
            .map(ParamValue::Integer)
            .map_err(|_| format!("{} must be a non-negative integer", name)),
        (None, Validated::Ids(ids)) => ids
            .into_iter()
            .map(u64::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::Ids)
            .map_err(|_| format!("{} must only contain non-negative integers", name)),
        (None, Validated::Text(v)) => Ok(ParamValue::Text(v)),
        (None, Validated::DateTime(v)) => Ok(ParamValue::DateTime(v)),
        (None, Validated::Bool(v)) => Ok(ParamValue::Bool(v)),
    }
}

/// RFC 3339, or a bare `YYYY-MM-DDTHH:MM:SS` taken as UTC.
pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Accepts `"3,7,9"`, `"3 7"` or repeated keys. Every token must be an
/// integer.
pub fn parse_id_list(name: &str, values: &[&str]) -> Result<Vec<i64>, String> {
    values
        .iter()
        .flat_map(|v| v.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(idx, token)| {
            token
                .parse()
                .map_err(|_| format!("{}[{}] is not of type integer", name, idx))
        })
        .collect()
}

/// Absolute values with duplicates removed, first occurrence kept.
pub fn unique_ids(ids: Vec<i64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(i64::unsigned_abs)
        .filter(|id| seen.insert(*id))
        .collect()
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
