use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pagesift_core::batch::BatchOrchestrator;
use pagesift_core::pipeline::ExtractService;
use pagesift_core::quota::store::MemoryQuotaStore;
use pagesift_core::quota::{default_rules, QuotaGovernor, QuotaRule};
use pagesift_core::testutil::MockFetcher;
use pagesift_server::routes;
use pagesift_server::settings::{Environment, QuotaBackend, Settings};
use pagesift_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";

/// Build an app around a mock fetcher with an in-memory quota store.
pub fn build_app(
    fetcher: MockFetcher,
    environment: Environment,
    rules: Vec<QuotaRule>,
) -> Router {
    let settings = Settings {
        environment,
        port: 0,
        api_keys: vec![TEST_API_KEY.to_string()],
        crawler_timeout: Duration::from_secs(2),
        quota_backend: QuotaBackend::Memory,
        quota_rules: rules.clone(),
    };
    let governor = Arc::new(QuotaGovernor::new(
        Arc::new(MemoryQuotaStore::new()),
        rules,
        settings.api_keys.clone(),
        settings.quota_enabled(),
    ));
    let service = ExtractService::new(fetcher, settings.crawler_timeout);
    let batch = BatchOrchestrator::new(service.clone());

    routes::router(Arc::new(AppState {
        service,
        batch,
        governor,
        settings,
    }))
}

/// Development app: quotas disabled, standard rules on the books.
pub fn dev_app(fetcher: MockFetcher) -> Router {
    build_app(fetcher, Environment::Development, default_rules())
}

pub async fn post_json(
    app: Router,
    path: &str,
    body: serde_json::Value,
    api_key: Option<&str>,
) -> Response<axum::body::Body> {
    let mut request = Request::post(path)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.9");
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    app.oneshot(
        request
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn json_body(response: Response<axum::body::Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
