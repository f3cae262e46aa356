use thiserror::Error;

/// Application-wide error types for pagesift.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request input: bad URL, invalid config shape, oversized batch.
    #[error("{0}")]
    ValidationError(String),

    /// Quota denied for the current window.
    #[error("Rate limit exceeded")]
    QuotaExceeded { retry_after_seconds: u64 },

    /// Page fetch exceeded the per-request timeout.
    #[error("Timeout after {0}s")]
    FetchTimeout(u64),

    /// Page fetch failed (HTTP error, bad response body, DNS failure).
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// The fetch collaborator itself is unreachable.
    #[error("Fetch service unavailable: {0}")]
    FetchUnavailable(String),

    /// DOM parsing or selector evaluation failed.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Quota counter backend failed.
    #[error("Quota store error: {0}")]
    StoreError(String),

    /// Startup/environment configuration problem.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// True for errors caused by the request itself rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_) | AppError::QuotaExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(AppError::ValidationError("bad url".into()).is_client_error());
        assert!(
            AppError::QuotaExceeded {
                retry_after_seconds: 30
            }
            .is_client_error()
        );
        assert!(!AppError::FetchTimeout(15).is_client_error());
        assert!(!AppError::ExtractionError("bad dom".into()).is_client_error());
    }
}
