//! Extension points run while each report row is prepared.
//!
//! [`AdditionalField`]s add computed fields to a row before context
//! filtering. [`ItemFilter`]s run last, in registration order, and may
//! rewrite the finished entry.

use std::sync::Arc;

use serde_json::Value;

use crate::handlers::reports::ReportRequest;
use crate::models::{ReportEntry, ReportItem};
use crate::schema::FieldSchema;

/// Post-processing step for a single report entry.
///
/// `raw` is the row exactly as the data source returned it.
pub trait ItemFilter: Send + Sync {
    fn filter(&self, entry: ReportEntry, raw: &ReportItem, request: &ReportRequest) -> ReportEntry;
}

impl<F> ItemFilter for F
where
    F: Fn(ReportEntry, &ReportItem, &ReportRequest) -> ReportEntry + Send + Sync,
{
    fn filter(&self, entry: ReportEntry, raw: &ReportItem, request: &ReportRequest) -> ReportEntry {
        self(entry, raw, request)
    }
}

type FieldGetter = dyn Fn(&ReportItem, &ReportRequest) -> Option<Value> + Send + Sync;

/// A computed field appended to every row and to the item schema.
#[derive(Clone)]
pub struct AdditionalField {
    pub schema: FieldSchema,
    get: Arc<FieldGetter>,
}

impl AdditionalField {
    pub fn new<F>(schema: FieldSchema, get: F) -> Self
    where
        F: Fn(&ReportItem, &ReportRequest) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            schema,
            get: Arc::new(get),
        }
    }

    /// Sets the field on `item` when it is visible in the request context
    /// and the getter yields a value.
    pub fn apply(&self, item: &mut ReportItem, request: &ReportRequest) {
        if !self.schema.visible_in(request.args.context) {
            return;
        }
        if let Some(value) = (self.get)(item, request) {
            item.insert(self.schema.name.clone(), value);
        }
    }
}

impl std::fmt::Debug for AdditionalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdditionalField")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
