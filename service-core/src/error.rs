use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// One or more request parameters failed schema validation.
    /// Keys are parameter names, values the reason each was rejected.
    #[error("Invalid parameter(s): {}", param_names(.0))]
    InvalidParams(BTreeMap<String, String>),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Data source error: {0}")]
    DataSourceError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

fn param_names(params: &BTreeMap<String, String>) -> String {
    params.keys().cloned().collect::<Vec<_>>().join(", ")
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidParams(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_)
            | AppError::DataSourceError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DataSourceError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            params: Option<BTreeMap<String, String>>,
        }

        let status = self.status_code();
        let error_message = self.to_string();

        let (error, details, params) = match self {
            AppError::ValidationError(err) => {
                ("Validation error".to_string(), Some(err.to_string()), None)
            }
            AppError::InvalidParams(params) => {
                let details = params
                    .iter()
                    .map(|(name, reason)| format!("{}: {}", name, reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                (error_message, Some(details), Some(params))
            }
            AppError::BadRequest(err) => (err.to_string(), None, None),
            AppError::InternalError(err) => (
                "Internal server error".to_string(),
                Some(format!("{:#?}", err)),
                None,
            ),
            AppError::DataSourceError(err) => {
                ("Data source error".to_string(), Some(err.to_string()), None)
            }
            AppError::ConfigError(err) => (
                "Configuration error".to_string(),
                Some(err.to_string()),
                None,
            ),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %error, details = ?details, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %error, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error,
                details,
                params,
            }),
        )
            .into_response()
    }
}
