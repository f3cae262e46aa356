use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use pagesift_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::FetchTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::FetchUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::FetchError(_)
            | AppError::ExtractionError(_)
            | AppError::StoreError(_)
            | AppError::ConfigError(_)
            | AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse::new(self.0.to_string());

        if let AppError::QuotaExceeded {
            retry_after_seconds,
        } = self.0
        {
            let body = body
                .with_message(
                    "Too many requests. Please try again later \
                     or use an API key for unlimited access.",
                )
                .with_details(serde_json::json!({
                    "retry_after_seconds": retry_after_seconds
                }));
            return (
                status,
                [(header::RETRY_AFTER, retry_after_seconds.to_string())],
                axum::Json(body),
            )
                .into_response();
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_error_kinds() {
        let cases = [
            (AppError::ValidationError("x".into()), 400),
            (AppError::FetchTimeout(30), 408),
            (
                AppError::QuotaExceeded {
                    retry_after_seconds: 12,
                },
                429,
            ),
            (AppError::FetchUnavailable("x".into()), 503),
            (AppError::ExtractionError("x".into()), 500),
        ];
        for (error, expected) in cases {
            let response = ApiError(error).into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[test]
    fn quota_denial_carries_retry_after_header() {
        let response = ApiError(AppError::QuotaExceeded {
            retry_after_seconds: 42,
        })
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
