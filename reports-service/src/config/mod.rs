use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportsConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    /// Traces are exported only when this is set.
    pub otlp_endpoint: Option<String>,
    /// Origin used to build absolute `links` and `Link` header URLs.
    #[validate(url)]
    pub public_base_url: String,
    /// JSON sales dataset served by the in-memory store. Empty store when unset.
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl ReportsConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = ReportsConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("reports-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info,reports_service=debug"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            public_base_url: get_env("PUBLIC_BASE_URL", Some("http://localhost:8080"), is_prod)?,
            fixture_path: env::var("REPORTS_FIXTURE_PATH").ok().filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
