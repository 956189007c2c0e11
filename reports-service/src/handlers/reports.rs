//! Generic reports endpoint.
//!
//! A [`ReportEndpoint`] composes a [`ReportDefinition`] (schema, accepted
//! parameters, parent link) with a [`ReportQuery`] data source and any
//! registered hooks. The same handler serves every report route.

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::hooks::{AdditionalField, ItemFilter};
use crate::links::{link_header_value, pagination_links, rest_url};
use crate::models::{ReportEntry, ReportItem};
use crate::params::{parse_collection_params, parse_query_string, QueryPairs, ReportArgs};
use crate::reports::ReportDefinition;
use crate::schema::ItemSchema;
use crate::services::{record_report_request, ReportQuery};

pub const TOTAL_HEADER: HeaderName = HeaderName::from_static("x-wp-total");
pub const TOTAL_PAGES_HEADER: HeaderName = HeaderName::from_static("x-wp-totalpages");

/// A validated collection request.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub args: ReportArgs,
    /// The query string as received, used to rebuild pagination links.
    pub query_pairs: QueryPairs,
}

/// One page of prepared entries plus the metadata that goes into headers.
#[derive(Debug)]
pub struct ReportListResponse {
    pub items: Vec<ReportEntry>,
    pub total: u64,
    pub pages: u32,
    pub links: Vec<(&'static str, String)>,
}

impl IntoResponse for ReportListResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.items).into_response();
        let headers = response.headers_mut();

        headers.insert(TOTAL_HEADER, HeaderValue::from(self.total));
        headers.insert(TOTAL_PAGES_HEADER, HeaderValue::from(self.pages));

        for (rel, url) in &self.links {
            match HeaderValue::from_str(&link_header_value(rel, url)) {
                Ok(value) => {
                    headers.append(header::LINK, value);
                }
                Err(e) => tracing::warn!(rel, error = %e, "Dropping unrepresentable Link header"),
            }
        }

        response
    }
}

pub struct ReportEndpoint {
    definition: ReportDefinition,
    schema: ItemSchema,
    query: Arc<dyn ReportQuery>,
    filters: Vec<Arc<dyn ItemFilter>>,
    additional_fields: Vec<AdditionalField>,
    base_url: String,
}

impl ReportEndpoint {
    pub fn new(
        definition: ReportDefinition,
        query: Arc<dyn ReportQuery>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            schema: definition.item_schema.clone(),
            definition,
            query,
            filters: Vec::new(),
            additional_fields: Vec::new(),
            base_url: base_url.into(),
        }
    }

    /// Registers a post-processing filter. Filters run in registration order.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: ItemFilter + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Registers a computed field. `links` is reserved and is ignored.
    pub fn with_additional_field(mut self, field: AdditionalField) -> Self {
        if field.schema.name == "links" {
            tracing::warn!(report = self.name(), "Additional field name `links` is reserved");
            return self;
        }
        self.schema = self.schema.field(field.schema.clone());
        self.additional_fields.push(field);
        self
    }

    pub fn definition(&self) -> &ReportDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.config.name()
    }

    pub fn route(&self) -> String {
        self.definition.config.route()
    }

    pub fn collection_url(&self) -> String {
        rest_url(&self.base_url, &self.route())
    }

    /// JSON-Schema document for one output item, additional fields included.
    pub fn item_schema(&self) -> Value {
        self.schema.to_json()
    }

    pub fn collection_params(&self) -> Value {
        self.definition.collection_params.to_json()
    }

    /// Validates a raw query string against this endpoint's declared
    /// parameters.
    pub fn parse_request(&self, raw_query: Option<&str>) -> Result<ReportRequest, AppError> {
        let query_pairs = parse_query_string(raw_query)?;
        let args = parse_collection_params(&query_pairs, &self.definition.collection_params)?;
        Ok(ReportRequest { args, query_pairs })
    }

    /// Fetches one page from the data source and renders it.
    pub async fn list(&self, request: &ReportRequest) -> Result<ReportListResponse, AppError> {
        let page = self.query.get_data(&request.args).await?;

        let items: Vec<ReportEntry> = page
            .data
            .iter()
            .map(|raw| self.prepare_item(raw, request))
            .collect();

        let links = pagination_links(
            &self.collection_url(),
            &request.query_pairs,
            page.page_no,
            page.pages,
        )?;

        tracing::info!(
            report = self.name(),
            page = page.page_no,
            per_page = request.args.per_page,
            returned = items.len(),
            total = page.total,
            pages = page.pages,
            "Report page served"
        );

        Ok(ReportListResponse {
            items,
            total: page.total,
            pages: page.pages,
            links,
        })
    }

    fn prepare_item(&self, raw: &ReportItem, request: &ReportRequest) -> ReportEntry {
        let mut data = raw.clone();
        for field in &self.additional_fields {
            field.apply(&mut data, request);
        }
        let data = self.schema.filter_by_context(data, request.args.context);

        let mut entry = ReportEntry::new(data);
        self.add_item_links(raw, &mut entry);

        self.filters
            .iter()
            .fold(entry, |entry, filter| filter.filter(entry, raw, request))
    }

    fn add_item_links(&self, raw: &ReportItem, entry: &mut ReportEntry) {
        let Some(parent) = &self.definition.parent_link else {
            return;
        };

        let id = match raw.get(&parent.id_field) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return,
        };

        let path = format!(
            "/{}/{}/{}",
            self.definition.config.namespace, parent.resource, id
        );
        entry.add_link(parent.rel.clone(), rest_url(&self.base_url, &path));
    }
}

/// GET handler shared by every report route.
#[tracing::instrument(skip(endpoint, query), fields(report = %endpoint.name()))]
pub async fn list_report(
    State(endpoint): State<Arc<ReportEndpoint>>,
    RawQuery(query): RawQuery,
) -> Result<ReportListResponse, AppError> {
    let request = endpoint.parse_request(query.as_deref())?;
    let response = endpoint.list(&request).await?;
    record_report_request(endpoint.name(), response.items.len());
    Ok(response)
}

/// OPTIONS handler: describes the route, its item schema and arguments.
pub async fn describe_report(State(endpoint): State<Arc<ReportEndpoint>>) -> Json<Value> {
    Json(json!({
        "namespace": endpoint.definition().config.namespace,
        "route": endpoint.route(),
        "methods": ["GET"],
        "schema": endpoint.item_schema(),
        "args": endpoint.collection_params(),
    }))
}

pub fn routes(endpoint: Arc<ReportEndpoint>) -> Router {
    Router::new()
        .route(&endpoint.route(), get(list_report).options(describe_report))
        .with_state(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultPage;
    use crate::reports::{products, taxes};
    use crate::schema::{Context, FieldSchema, FieldType};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const BASE_URL: &str = "http://shop.test";

    /// Returns a canned page and remembers the args it was called with.
    #[derive(Default)]
    struct StubQuery {
        page: ResultPage,
        seen: Mutex<Vec<ReportArgs>>,
    }

    #[async_trait]
    impl ReportQuery for StubQuery {
        async fn get_data(&self, args: &ReportArgs) -> Result<ResultPage, AppError> {
            self.seen.lock().unwrap().push(args.clone());
            Ok(self.page.clone())
        }
    }

    struct FailingQuery;

    #[async_trait]
    impl ReportQuery for FailingQuery {
        async fn get_data(&self, _args: &ReportArgs) -> Result<ResultPage, AppError> {
            Err(AppError::DataSourceError(anyhow::anyhow!("warehouse offline")))
        }
    }

    fn product_row(id: u64) -> ReportItem {
        json!({
            "product_id": id,
            "items_sold": id * 2,
            "gross_revenue": id as f64 * 10.5,
            "orders_count": 1,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn stub(rows: Vec<ReportItem>, total: u64, pages: u32, page_no: u32) -> Arc<StubQuery> {
        Arc::new(StubQuery {
            page: ResultPage {
                data: rows,
                total,
                pages,
                page_no,
            },
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn list_renders_items_headers_and_links() {
        let query = stub((6..=10).map(product_row).collect(), 12, 3, 2);
        let endpoint = ReportEndpoint::new(products::definition(), query.clone(), BASE_URL);

        let request = endpoint
            .parse_request(Some("page=2&per_page=5&orderby=gross_revenue&order=asc"))
            .unwrap();
        let response = endpoint.list(&request).await.unwrap();

        assert_eq!(response.items.len(), 5);
        assert_eq!(response.total, 12);
        assert_eq!(response.pages, 3);
        assert_eq!(response.items[0].data["product_id"], 6);
        assert_eq!(
            response.items[0].links["product"].href,
            "http://shop.test/wc/v3/products/6"
        );

        let rels: Vec<&str> = response.links.iter().map(|(rel, _)| *rel).collect();
        assert_eq!(rels, vec!["prev", "next"]);
        assert!(response.links[0].1.contains("page=1"));
        assert!(response.links[1].1.contains("page=3"));

        let seen = query.seen.lock().unwrap();
        assert_eq!(seen[0].orderby, "gross_revenue");
        assert_eq!(seen[0].page, 2);
    }

    #[tokio::test]
    async fn filters_run_in_registration_order() {
        let query = stub(vec![product_row(1)], 1, 1, 1);
        let endpoint = ReportEndpoint::new(products::definition(), query, BASE_URL)
            .with_filter(
                |mut entry: ReportEntry, _raw: &ReportItem, _req: &ReportRequest| {
                    entry.data.insert("note".into(), json!("first"));
                    entry
                },
            )
            .with_filter(
                |mut entry: ReportEntry, raw: &ReportItem, _req: &ReportRequest| {
                    let note = entry.data["note"].as_str().unwrap_or_default().to_string();
                    entry.data.insert("note".into(), json!(format!("{}+second", note)));
                    entry
                        .data
                        .insert("raw_items".into(), raw["items_sold"].clone());
                    entry
                },
            );

        let response = endpoint.list(&ReportRequest::default()).await.unwrap();
        assert_eq!(response.items[0].data["note"], "first+second");
        assert_eq!(response.items[0].data["raw_items"], 2);
    }

    #[tokio::test]
    async fn context_controls_additional_field_visibility() {
        let query = stub(vec![product_row(4)], 1, 1, 1);
        let endpoint = ReportEndpoint::new(products::definition(), query, BASE_URL)
            .with_additional_field(AdditionalField::new(
                FieldSchema::new("margin", FieldType::Number, "Margin.")
                    .with_context(&[Context::Edit]),
                |item: &ReportItem, _req: &ReportRequest| {
                    item.get("gross_revenue")
                        .and_then(Value::as_f64)
                        .map(|g| json!(g / 2.0))
                },
            ));

        assert_eq!(
            endpoint.item_schema()["properties"]["margin"]["context"],
            json!(["edit"])
        );

        let view = endpoint.parse_request(Some("context=view")).unwrap();
        let response = endpoint.list(&view).await.unwrap();
        assert!(!response.items[0].data.contains_key("margin"));

        let edit = endpoint.parse_request(Some("context=edit")).unwrap();
        let response = endpoint.list(&edit).await.unwrap();
        assert_eq!(response.items[0].data["margin"], 21.0);
        assert_eq!(response.items[0].data["items_sold"], 8);
    }

    #[tokio::test]
    async fn links_is_reserved_for_additional_fields() {
        let query = stub(vec![product_row(2)], 1, 1, 1);
        let endpoint = ReportEndpoint::new(products::definition(), query, BASE_URL)
            .with_additional_field(AdditionalField::new(
                FieldSchema::new("links", FieldType::Object, "Shadow."),
                |_item: &ReportItem, _req: &ReportRequest| Some(json!("bogus")),
            ));

        assert!(endpoint.item_schema()["properties"].get("links").is_none());

        let response = endpoint.list(&ReportRequest::default()).await.unwrap();
        assert!(!response.items[0].data.contains_key("links"));
        assert_eq!(
            response.items[0].links["product"].href,
            "http://shop.test/wc/v3/products/2"
        );
    }

    #[tokio::test]
    async fn undeclared_params_never_reach_the_data_source() {
        let query = stub(Vec::new(), 0, 0, 1);
        let endpoint = ReportEndpoint::new(taxes::definition(), query.clone(), BASE_URL);

        let request = endpoint
            .parse_request(Some("categories=1,2&products=3&extended_product_info=1"))
            .unwrap();
        let response = endpoint.list(&request).await.unwrap();
        assert!(response.items.is_empty());
        assert!(response.links.is_empty());

        let seen = query.seen.lock().unwrap();
        assert_eq!(seen[0].categories, None);
        assert_eq!(seen[0].products, None);
        assert!(!seen[0].extended_product_info);
        assert_eq!(seen[0].orderby, "date");
        assert_eq!(seen[0].per_page, 10);
    }

    #[tokio::test]
    async fn invalid_params_are_rejected_before_querying() {
        let query = stub(Vec::new(), 0, 0, 1);
        let endpoint = ReportEndpoint::new(products::definition(), query.clone(), BASE_URL);

        let err = endpoint.parse_request(Some("orderby=price")).unwrap_err();
        assert!(matches!(err, AppError::InvalidParams(_)));
        assert!(query.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn data_source_errors_propagate_unchanged() {
        let endpoint = ReportEndpoint::new(products::definition(), Arc::new(FailingQuery), BASE_URL);
        let err = endpoint.list(&ReportRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::DataSourceError(_)));
    }

    #[tokio::test]
    async fn rows_without_an_id_get_no_parent_link() {
        let row = json!({ "slug": "x" }).as_object().cloned().unwrap();
        let endpoint = ReportEndpoint::new(taxes::definition(), stub(vec![row], 1, 1, 1), BASE_URL);
        let response = endpoint.list(&ReportRequest::default()).await.unwrap();
        assert!(response.items[0].links.is_empty());
    }

    #[test]
    fn response_headers_carry_totals_and_links() {
        let response = ReportListResponse {
            items: Vec::new(),
            total: 12,
            pages: 3,
            links: vec![
                ("prev", "http://shop.test/r?page=1".to_string()),
                ("next", "http://shop.test/r?page=3".to_string()),
            ],
        }
        .into_response();

        let headers = response.headers();
        assert_eq!(headers[TOTAL_HEADER], "12");
        assert_eq!(headers[TOTAL_PAGES_HEADER], "3");
        let links: Vec<&str> = headers
            .get_all(header::LINK)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(
            links,
            vec![
                "<http://shop.test/r?page=1>; rel=\"prev\"",
                "<http://shop.test/r?page=3>; rel=\"next\"",
            ]
        );
    }
}
