use crate::config::ReportsConfig;
use crate::handlers::{self, reports::ReportEndpoint};
use crate::reports::{products, taxes};
use crate::services::InMemorySalesStore;
use axum::{middleware::from_fn, routing::get, Router};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{http_trace_layer, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// The report endpoints served by this process.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<ReportEndpoint>,
    pub taxes: Arc<ReportEndpoint>,
}

impl AppState {
    /// Wires both reports to `store`, building absolute links from
    /// `public_base_url`.
    pub fn new(store: &InMemorySalesStore, public_base_url: &str) -> Self {
        let products = ReportEndpoint::new(
            products::definition(),
            Arc::new(store.products_query()),
            public_base_url,
        );
        let taxes = ReportEndpoint::new(
            taxes::definition(),
            Arc::new(store.taxes_query()),
            public_base_url,
        );

        Self {
            products: Arc::new(products),
            taxes: Arc::new(taxes),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .merge(handlers::reports::routes(state.products))
        .merge(handlers::reports::routes(state.taxes))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: ReportsConfig) -> Result<Self, AppError> {
        let store = match &config.fixture_path {
            Some(path) => InMemorySalesStore::from_fixture(path).await.map_err(|e| {
                tracing::error!("Failed to load sales fixture {}: {}", path, e);
                e
            })?,
            None => {
                tracing::warn!("REPORTS_FIXTURE_PATH not set - serving an empty sales store");
                InMemorySalesStore::default()
            }
        };

        Self::build_with_store(config, store).await
    }

    /// Like [`Application::build`] but with a caller-supplied store.
    pub async fn build_with_store(
        config: ReportsConfig,
        store: InMemorySalesStore,
    ) -> Result<Self, AppError> {
        let state = AppState::new(&store, &config.public_base_url);
        let router = build_router(state);

        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            e
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
