//! Raw sales records backing the in-memory data source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One product line of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: u64,
    pub product_id: u64,
    pub quantity: u64,
    pub net_revenue: f64,
    #[serde(default)]
    pub tax_rate_id: Option<u64>,
    #[serde(default)]
    pub tax_total: f64,
    pub date_created: DateTime<Utc>,
}

impl OrderLine {
    pub fn gross_revenue(&self) -> f64 {
        self.net_revenue + self.tax_total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: u64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<u64>,
    #[serde(default = "default_stock_status")]
    pub stock_status: String,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
}

fn default_stock_status() -> String {
    "instock".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    pub tax_rate_id: u64,
    /// Short code, e.g. `US-CA-STATE-1`.
    pub code: String,
    pub name: String,
    pub rate: f64,
}

/// Everything a sales store needs, as read from a fixture file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesDataset {
    #[serde(default)]
    pub orders: Vec<OrderLine>,
    #[serde(default)]
    pub products: Vec<ProductInfo>,
    #[serde(default)]
    pub tax_rates: Vec<TaxRate>,
}
