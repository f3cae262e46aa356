//! Quota enforcement middleware.
//!
//! Applied per route so each endpoint charges its own scope. Denials are
//! answered here with the standard error envelope; allowed responses get
//! `X-RateLimit-*` headers describing the tightest window.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use pagesift_core::error::AppError;
use pagesift_core::quota::{QuotaDecision, QuotaStatus, RuleScope};
use pagesift_core::traits::PageFetcher;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn extract_quota<F: PageFetcher>(
    State(state): State<Arc<AppState<F>>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RuleScope::Extract, request, next).await
}

pub async fn batch_quota<F: PageFetcher>(
    State(state): State<Arc<AppState<F>>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state, RuleScope::Batch, request, next).await
}

async fn enforce<F: PageFetcher>(
    state: Arc<AppState<F>>,
    scope: RuleScope,
    request: Request,
    next: Next,
) -> Response {
    let api_key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    let client_ip = client_ip(&request);
    let caller = state.governor.resolve_caller(api_key, &client_ip);

    match state.governor.check(&caller, scope).await {
        QuotaDecision::Bypassed => next.run(request).await,
        QuotaDecision::Allowed(status) => {
            let mut response = next.run(request).await;
            apply_headers(&mut response, status);
            response
        }
        QuotaDecision::Denied {
            retry_after,
            status,
        } => {
            tracing::info!(identity = %caller.identity, ?scope, retry_after, "quota denied");
            let mut response = ApiError(AppError::QuotaExceeded {
                retry_after_seconds: retry_after,
            })
            .into_response();
            apply_headers(&mut response, status);
            response
        }
    }
}

/// Client address for anonymous identity: first `X-Forwarded-For` hop,
/// falling back to the socket peer.
fn client_ip(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(response: &mut Response, status: QuotaStatus) {
    let headers = response.headers_mut();
    for (name, value) in [
        ("x-ratelimit-limit", status.limit),
        ("x-ratelimit-remaining", status.remaining),
        ("x-ratelimit-reset", status.reset_after),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            headers.insert(name, value);
        }
    }
}
