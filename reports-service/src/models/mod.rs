//! Domain models for reports-service.

mod report;
mod sales;

pub use report::{Link, ReportEntry, ReportItem, ResultPage};
pub use sales::{OrderLine, ProductInfo, SalesDataset, TaxRate};
