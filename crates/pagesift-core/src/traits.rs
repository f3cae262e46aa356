use std::future::Future;

use url::Url;

use crate::error::AppError;
use crate::models::RawPage;

/// Options forwarded to the fetch adapter per request.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Hint consumed opaquely by the adapter; the core never interprets it.
    pub use_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

/// Fetches and renders a page, returning raw HTML plus resolved host and
/// HTTP status. How the page is obtained (plain HTTP, headless browser,
/// pooled sessions) is entirely the implementation's concern.
pub trait PageFetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> impl Future<Output = Result<RawPage, AppError>> + Send;
}
