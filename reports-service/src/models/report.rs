//! Report rows and pages as exchanged with the data-query collaborator.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One aggregated row, as produced by a [`crate::services::ReportQuery`].
pub type ReportItem = Map<String, Value>;

/// One page of report rows plus the totals across all pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub data: Vec<ReportItem>,
    pub total: u64,
    pub pages: u32,
    pub page_no: u32,
}

impl ResultPage {
    /// Cuts page `page` (1-based) of `per_page` rows out of the full,
    /// already sorted result. A page past the end yields no rows but keeps
    /// the totals.
    pub fn paginate(rows: Vec<ReportItem>, page: u32, per_page: u32) -> Self {
        let total = rows.len() as u64;
        let per_page = per_page.max(1);
        let pages = total.div_ceil(per_page as u64) as u32;
        let offset = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);

        let data = rows
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        Self {
            data,
            total,
            pages,
            page_no: page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// A row ready for the response body: the context-filtered fields plus a
/// `links` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportEntry {
    pub data: ReportItem,
    pub links: BTreeMap<String, Link>,
}

/// Serialises as one flat object. `links` is reserved: a `links` key in
/// `data` is dropped.
impl Serialize for ReportEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.data.iter().filter(|(key, _)| key.as_str() != "links");
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("links", &self.links)?;
        map.end()
    }
}

impl ReportEntry {
    pub fn new(data: ReportItem) -> Self {
        Self {
            data,
            links: BTreeMap::new(),
        }
    }

    pub fn add_link(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        self.links.insert(rel.into(), Link { href: href.into() });
    }
}
