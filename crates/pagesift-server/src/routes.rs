use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pagesift_core::config::ExtractionConfig;
use pagesift_core::traits::PageFetcher;

use crate::dto::{
    BatchRequest, ExtractRequest, HealthResponse, QuotaResponse, QuotaRuleInfo, SuccessResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::quota_layer;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router<F: PageFetcher + 'static>(state: Arc<AppState<F>>) -> Router {
    let api = Router::new()
        .route(
            "/extract",
            post(extract::<F>).layer(middleware::from_fn_with_state(
                state.clone(),
                quota_layer::extract_quota::<F>,
            )),
        )
        .route(
            "/extract/batch",
            post(extract_batch::<F>).layer(middleware::from_fn_with_state(
                state.clone(),
                quota_layer::batch_quota::<F>,
            )),
        )
        .route("/quota", get(quota::<F>));

    let public = Router::new()
        .route("/health", get(health::<F>))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.nest("/api/v1", api).with_state(state)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Extraction result envelope", body = Object),
        (status = 400, description = "Invalid URL or options", body = crate::dto::ErrorResponse),
        (status = 408, description = "Fetch timed out", body = crate::dto::ErrorResponse),
        (status = 429, description = "Quota exceeded", body = crate::dto::ErrorResponse),
        (status = 503, description = "Target unreachable", body = crate::dto::ErrorResponse),
    ),
    tag = "extract"
)]
pub async fn extract<F: PageFetcher>(
    State(state): State<Arc<AppState<F>>>,
    axum::Json(body): axum::Json<ExtractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = ExtractionConfig::from_options(body.config)?;
    let result = state.service.extract_url(&body.url, &config).await?;
    Ok(axum::Json(SuccessResponse::new(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/extract/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch summary envelope", body = Object),
        (status = 400, description = "Invalid URLs or options", body = crate::dto::ErrorResponse),
        (status = 429, description = "Quota exceeded", body = crate::dto::ErrorResponse),
    ),
    tag = "extract"
)]
pub async fn extract_batch<F: PageFetcher>(
    State(state): State<Arc<AppState<F>>>,
    axum::Json(body): axum::Json<BatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let max_concurrent = body.config.max_concurrent;
    let config = ExtractionConfig::from_options(body.config)?;
    let summary = state.batch.run(&body.urls, &config, max_concurrent).await?;
    Ok(axum::Json(SuccessResponse::new(summary)))
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/quota",
    responses(
        (status = 200, description = "Configured quota rules", body = Object),
    ),
    tag = "system"
)]
pub async fn quota<F: PageFetcher>(
    State(state): State<Arc<AppState<F>>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let caller = state.governor.resolve_caller(api_key, "probe");

    let rules = state
        .settings
        .quota_rules
        .iter()
        .map(|rule| QuotaRuleInfo {
            scope: rule.scope.as_str().to_string(),
            limit: rule.limit,
            window_seconds: rule.window.as_secs(),
        })
        .collect();

    axum::Json(SuccessResponse::new(QuotaResponse {
        enabled: state.settings.quota_enabled(),
        bypassed: caller.trusted,
        rules,
    }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health<F: PageFetcher>(State(state): State<Arc<AppState<F>>>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.settings.environment.as_str(),
    })
}
