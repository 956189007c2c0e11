//! In-memory sales store serving as the data-query collaborator.
//!
//! Holds a read-only snapshot of order lines, so every query sees a
//! consistent view. Aggregation is per product or per tax rate.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use service_core::error::AppError;

use super::ReportQuery;
use crate::models::{OrderLine, ProductInfo, ReportItem, ResultPage, SalesDataset};
use crate::params::{ReportArgs, SortOrder};

#[derive(Debug, Clone, Default)]
pub struct InMemorySalesStore {
    dataset: Arc<SalesDataset>,
}

impl InMemorySalesStore {
    pub fn new(dataset: SalesDataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }

    /// Loads a JSON [`SalesDataset`] from disk.
    pub async fn from_fixture(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::DataSourceError(anyhow::anyhow!(
                "Failed to read sales fixture {}: {}",
                path.display(),
                e
            ))
        })?;
        let dataset: SalesDataset = serde_json::from_slice(&bytes)?;

        tracing::info!(
            path = %path.display(),
            orders = dataset.orders.len(),
            products = dataset.products.len(),
            tax_rates = dataset.tax_rates.len(),
            "Sales fixture loaded"
        );

        Ok(Self::new(dataset))
    }

    pub fn products_query(&self) -> ProductsReportQuery {
        ProductsReportQuery {
            store: self.clone(),
        }
    }

    pub fn taxes_query(&self) -> TaxesReportQuery {
        TaxesReportQuery {
            store: self.clone(),
        }
    }

    fn lines_in_window<'a>(
        &'a self,
        args: &ReportArgs,
    ) -> Result<impl Iterator<Item = &'a OrderLine> + 'a, AppError> {
        if let (Some(after), Some(before)) = (args.after, args.before) {
            if after > before {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Invalid date range: after ({}) is later than before ({})",
                    after.to_rfc3339(),
                    before.to_rfc3339()
                )));
            }
        }

        let (after, before) = (args.after, args.before);
        Ok(self.dataset.orders.iter().filter(move |line| {
            after.is_none_or(|a| line.date_created >= a)
                && before.is_none_or(|b| line.date_created <= b)
        }))
    }
}

#[derive(Debug, Default)]
struct Totals {
    items_sold: u64,
    gross_revenue: f64,
    total_tax: f64,
    orders: BTreeSet<u64>,
    last_sale: Option<DateTime<Utc>>,
}

impl Totals {
    fn add(&mut self, line: &OrderLine) {
        self.items_sold += line.quantity;
        self.gross_revenue += line.gross_revenue();
        self.total_tax += line.tax_total;
        self.orders.insert(line.order_id);
        self.last_sale = self.last_sale.max(Some(line.date_created));
    }

    fn compare(&self, other: &Self, orderby: &str) -> Ordering {
        match orderby {
            "gross_revenue" => self.gross_revenue.total_cmp(&other.gross_revenue),
            "items_sold" => self.items_sold.cmp(&other.items_sold),
            "orders_count" => self.orders.len().cmp(&other.orders.len()),
            _ => self.last_sale.cmp(&other.last_sale),
        }
    }
}

/// Orders rows by `orderby`/`order`, breaking ties on id ascending so pages
/// are stable.
fn sorted(groups: BTreeMap<u64, Totals>, args: &ReportArgs) -> Vec<(u64, Totals)> {
    let mut rows: Vec<(u64, Totals)> = groups.into_iter().collect();
    rows.sort_by(|(a_id, a), (b_id, b)| {
        let ord = a.compare(b, &args.orderby);
        let ord = match args.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        ord.then(a_id.cmp(b_id))
    });
    rows
}

fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn into_item(value: Value) -> ReportItem {
    match value {
        Value::Object(map) => map,
        _ => ReportItem::new(),
    }
}

/// Per-product items sold, gross revenue and order count.
#[derive(Debug, Clone)]
pub struct ProductsReportQuery {
    store: InMemorySalesStore,
}

impl ProductsReportQuery {
    fn extended_info(product: Option<&ProductInfo>) -> Value {
        match product {
            Some(p) => json!({
                "name": p.name,
                "price": p.price,
                "sku": p.sku,
                "category_ids": p.category_ids,
                "stock_status": p.stock_status,
                "stock_quantity": p.stock_quantity,
            }),
            None => json!({}),
        }
    }
}

#[async_trait]
impl ReportQuery for ProductsReportQuery {
    async fn get_data(&self, args: &ReportArgs) -> Result<ResultPage, AppError> {
        let catalogue: HashMap<u64, &ProductInfo> = self
            .store
            .dataset
            .products
            .iter()
            .map(|p| (p.product_id, p))
            .collect();

        let in_categories = |product_id: u64| match &args.categories {
            Some(categories) if !categories.is_empty() => catalogue
                .get(&product_id)
                .is_some_and(|p| p.category_ids.iter().any(|c| categories.contains(c))),
            _ => true,
        };
        let in_products = |product_id: u64| match &args.products {
            Some(products) if !products.is_empty() => products.contains(&product_id),
            _ => true,
        };

        let mut groups: BTreeMap<u64, Totals> = BTreeMap::new();
        for line in self.store.lines_in_window(args)? {
            if in_products(line.product_id) && in_categories(line.product_id) {
                groups.entry(line.product_id).or_default().add(line);
            }
        }

        let rows = sorted(groups, args)
            .into_iter()
            .map(|(product_id, totals)| {
                let mut row = json!({
                    "product_id": product_id,
                    "items_sold": totals.items_sold,
                    "gross_revenue": round_money(totals.gross_revenue),
                    "orders_count": totals.orders.len(),
                });
                if args.extended_product_info {
                    row["extended_info"] =
                        Self::extended_info(catalogue.get(&product_id).copied());
                }
                into_item(row)
            })
            .collect();

        let page = ResultPage::paginate(rows, args.page, args.per_page);
        tracing::debug!(
            total = page.total,
            pages = page.pages,
            page_no = page.page_no,
            "Products report computed"
        );
        Ok(page)
    }
}

/// Per-tax-rate tax collected and order count, shaped as base report rows.
#[derive(Debug, Clone)]
pub struct TaxesReportQuery {
    store: InMemorySalesStore,
}

#[async_trait]
impl ReportQuery for TaxesReportQuery {
    async fn get_data(&self, args: &ReportArgs) -> Result<ResultPage, AppError> {
        let mut groups: BTreeMap<u64, Totals> = BTreeMap::new();
        for line in self.store.lines_in_window(args)? {
            if let Some(tax_rate_id) = line.tax_rate_id {
                groups.entry(tax_rate_id).or_default().add(line);
            }
        }

        let rates: HashMap<u64, _> = self
            .store
            .dataset
            .tax_rates
            .iter()
            .map(|r| (r.tax_rate_id, r))
            .collect();

        let rows = sorted(groups, args)
            .into_iter()
            .map(|(tax_rate_id, totals)| {
                let rate = rates.get(&tax_rate_id);
                into_item(json!({
                    "slug": rate
                        .map(|r| r.code.clone())
                        .unwrap_or_else(|| format!("tax-rate-{}", tax_rate_id)),
                    "description": rate.map(|r| r.name.clone()).unwrap_or_default(),
                    "tax_rate_id": tax_rate_id,
                    "rate": rate.map(|r| r.rate),
                    "total_tax": round_money(totals.total_tax),
                    "orders_count": totals.orders.len(),
                }))
            })
            .collect();

        let page = ResultPage::paginate(rows, args.page, args.per_page);
        tracing::debug!(
            total = page.total,
            pages = page.pages,
            page_no = page.page_no,
            "Taxes report computed"
        );
        Ok(page)
    }
}
