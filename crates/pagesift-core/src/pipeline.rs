//! Fetch-then-extract pipeline for a single URL.

use std::time::{Duration, Instant};

use url::Url;

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::extract;
use crate::models::ExtractionResult;
use crate::traits::{FetchOptions, PageFetcher};
use crate::util::round2;

/// Runs one URL through fetch, DOM parse, and the configured extraction
/// mode. Generic over the fetcher so tests can run the whole pipeline
/// against canned pages.
#[derive(Debug, Clone)]
pub struct ExtractService<F> {
    fetcher: F,
    fetch_timeout: Duration,
}

impl<F: PageFetcher> ExtractService<F> {
    pub fn new(fetcher: F, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            fetch_timeout,
        }
    }

    /// Validate, fetch with a deadline, and extract.
    ///
    /// `crawl_time` on the result covers fetch plus extraction, rounded to
    /// two decimals.
    pub async fn extract_url(
        &self,
        raw_url: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult, AppError> {
        let url = parse_url(raw_url)?;
        let started = Instant::now();

        let options = FetchOptions {
            use_cache: config.shared().use_cache,
        };
        let page = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&url, &options))
            .await
            .map_err(|_| AppError::FetchTimeout(self.fetch_timeout.as_secs()))??;

        let mut result = extract::extract(&page, config)?;
        result.metadata.crawl_time = round2(started.elapsed().as_secs_f64());
        tracing::debug!(
            url = %url,
            status = page.status_code,
            words = result.word_count,
            crawl_time = result.metadata.crawl_time,
            "extraction completed"
        );
        Ok(result)
    }
}

/// Accept only absolute http(s) URLs with a host.
fn parse_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("URL must not be empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| AppError::ValidationError(format!("Invalid URL '{trimmed}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::ValidationError(format!(
            "URL scheme must be http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AppError::ValidationError(format!(
            "URL has no host: '{trimmed}'"
        )));
    }
    Ok(url)
}
