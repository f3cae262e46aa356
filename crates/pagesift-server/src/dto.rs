use serde::{Deserialize, Serialize};

use pagesift_core::config::ExtractionOptions;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ExtractRequest {
    /// Target URL to fetch and extract
    pub url: String,
    /// Extraction options; which mode runs depends on which keys are set
    #[serde(default)]
    #[schema(value_type = Object)]
    pub config: ExtractionOptions,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BatchRequest {
    /// Target URLs, at most 10
    pub urls: Vec<String>,
    /// Extraction options applied to every URL, plus `max_concurrent`
    #[serde(default)]
    #[schema(value_type = Object)]
    pub config: ExtractionOptions,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error envelope: `{"success": false, "error": "...", "message": ..., "details": ...}`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Human-readable guidance, when the error has any to give.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuotaRuleInfo {
    pub scope: String,
    pub limit: u64,
    pub window_seconds: u64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuotaResponse {
    pub enabled: bool,
    /// Whether the presented API key exempts this caller.
    pub bypassed: bool,
    pub rules: Vec<QuotaRuleInfo>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
}
