pub mod memory;
pub mod metrics;
pub mod query;

pub use memory::{InMemorySalesStore, ProductsReportQuery, TaxesReportQuery};
pub use metrics::{get_metrics, init_metrics, record_report_request};
pub use query::ReportQuery;
