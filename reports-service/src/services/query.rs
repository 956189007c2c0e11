use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::ResultPage;
use crate::params::ReportArgs;

/// The data-query collaborator behind a report endpoint.
///
/// Implementations receive only validated, declared parameters and return
/// one page of rows with exact totals. Whatever error they return is passed
/// to the caller unchanged.
#[async_trait]
pub trait ReportQuery: Send + Sync {
    async fn get_data(&self, args: &ReportArgs) -> Result<ResultPage, AppError>;
}
