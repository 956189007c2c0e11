#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use reports_service::config::{Environment, ReportsConfig};
use reports_service::models::{OrderLine, ProductInfo, SalesDataset, TaxRate};
use reports_service::services::InMemorySalesStore;
use reports_service::Application;
use service_core::config::Config as CoreConfig;

pub const PUBLIC_BASE_URL: &str = "http://shop.test";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

/// Twelve products, one order each. Product `i` sells `i` units for
/// `10 * i` net plus `i` tax, on 2024-05-`i`, in category `i % 3 + 1`.
/// Even products are taxed at rate 1, odd ones at rate 2.
pub fn sample_dataset() -> SalesDataset {
    let orders = (1..=12u64)
        .map(|i| OrderLine {
            order_id: 1000 + i,
            product_id: i,
            quantity: i,
            net_revenue: 10.0 * i as f64,
            tax_rate_id: Some(if i % 2 == 0 { 1 } else { 2 }),
            tax_total: i as f64,
            date_created: Utc.with_ymd_and_hms(2024, 5, i as u32, 10, 0, 0).unwrap(),
        })
        .collect();

    let products = (1..=12u64)
        .map(|i| ProductInfo {
            product_id: i,
            name: format!("Product {}", i),
            price: 10.0,
            sku: Some(format!("SKU-{}", i)),
            category_ids: vec![i % 3 + 1],
            stock_status: "instock".to_string(),
            stock_quantity: Some(100 - i as i64),
        })
        .collect();

    let tax_rates = vec![
        TaxRate {
            tax_rate_id: 1,
            code: "US-CA-STATE-1".to_string(),
            name: "CA State Tax".to_string(),
            rate: 7.25,
        },
        TaxRate {
            tax_rate_id: 2,
            code: "US-NY-STATE-1".to_string(),
            name: "NY State Tax".to_string(),
            rate: 4.0,
        },
    ];

    SalesDataset {
        orders,
        products,
        tax_rates,
    }
}

pub fn test_config() -> ReportsConfig {
    ReportsConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        environment: Environment::Dev,
        service_name: "reports-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        public_base_url: PUBLIC_BASE_URL.to_string(),
        fixture_path: None,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_store(InMemorySalesStore::new(sample_dataset())).await
    }

    pub async fn spawn_with_store(store: InMemorySalesStore) -> Self {
        let app = Application::build_with_store(test_config(), store)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    pub async fn spawn_with_config(config: ReportsConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    async fn run(app: Application) -> Self {
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path_and_query))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// All `Link` header values, in order.
pub fn link_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("link")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub fn header_u64(response: &reqwest::Response, name: &str) -> u64 {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing {} header", name))
        .to_str()
        .unwrap()
        .parse()
        .unwrap()
}
