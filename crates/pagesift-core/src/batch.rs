//! Bounded concurrent batch extraction.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::models::ExtractionResult;
use crate::pipeline::ExtractService;
use crate::traits::PageFetcher;
use crate::util::round2;

/// Maximum URLs accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 10;
/// Concurrency used when the caller doesn't ask for one.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 2;
/// Hard cap on requested concurrency.
pub const MAX_BATCH_CONCURRENCY: usize = 3;

/// Per-URL outcome. One failed URL never fails the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn ok(url: String, data: ExtractionResult) -> Self {
        Self {
            url,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(url: String, error: &AppError) -> Self {
        Self {
            url,
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Outcomes in input order, independent of completion order.
    pub results: Vec<BatchItem>,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    /// Wall-clock seconds for the whole batch, rounded to two decimals.
    pub total_time: f64,
    pub average_time_per_url: f64,
}

/// Fans a batch of URLs out over the extract pipeline, at most
/// `max_concurrent` in flight at once.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator<F> {
    service: ExtractService<F>,
}

impl<F: PageFetcher> BatchOrchestrator<F> {
    pub fn new(service: ExtractService<F>) -> Self {
        Self { service }
    }

    pub async fn run(
        &self,
        urls: &[String],
        config: &ExtractionConfig,
        max_concurrent: Option<usize>,
    ) -> Result<BatchSummary, AppError> {
        if urls.is_empty() {
            return Err(AppError::ValidationError(
                "urls must be a non-empty list".to_string(),
            ));
        }
        if urls.len() > MAX_BATCH_SIZE {
            return Err(AppError::ValidationError(format!(
                "Maximum {MAX_BATCH_SIZE} URLs per batch, got {}",
                urls.len()
            )));
        }
        if max_concurrent == Some(0) {
            return Err(AppError::ValidationError(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        let concurrency = max_concurrent
            .unwrap_or(DEFAULT_BATCH_CONCURRENCY)
            .min(MAX_BATCH_CONCURRENCY);

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let started = Instant::now();

        let tasks = urls.iter().map(|url| {
            let semaphore = semaphore.clone();
            let service = self.service.clone();
            let config = config.clone();
            let url = url.clone();
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return BatchItem::failed(
                            url,
                            &AppError::ExtractionError("batch limiter closed".to_string()),
                        )
                    }
                };
                match service.extract_url(&url, &config).await {
                    Ok(data) => BatchItem::ok(url, data),
                    Err(error) => {
                        tracing::warn!(url, %error, "batch item failed");
                        BatchItem::failed(url, &error)
                    }
                }
            }
        });
        // join_all returns outcomes in input order regardless of when each
        // future finishes.
        let results = futures::future::join_all(tasks).await;

        let successful = results.iter().filter(|r| r.success).count();
        let total_time = round2(started.elapsed().as_secs_f64());
        let summary = BatchSummary {
            total_processed: results.len(),
            successful,
            failed: results.len() - successful,
            total_time,
            // Guarded by the non-empty check above.
            average_time_per_url: round2(total_time / results.len() as f64),
            results,
        };
        tracing::info!(
            total = summary.total_processed,
            successful = summary.successful,
            failed = summary.failed,
            total_time = summary.total_time,
            "batch completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::MockFetcher;

    const PAGE: &str = r#"<html><head><title>B</title></head>
        <body><p>Batch page body content with enough words</p></body></html>"#;

    fn orchestrator(fetcher: MockFetcher) -> BatchOrchestrator<MockFetcher> {
        BatchOrchestrator::new(ExtractService::new(fetcher, Duration::from_secs(5)))
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/p{i}")).collect()
    }

    #[tokio::test]
    async fn results_keep_input_order_despite_uneven_delays() {
        let fetcher = MockFetcher::new()
            .with_delayed_page("https://example.com/p0", PAGE, Duration::from_millis(50))
            .with_page("https://example.com/p1", PAGE)
            .with_delayed_page("https://example.com/p2", PAGE, Duration::from_millis(20));
        let summary = orchestrator(fetcher)
            .run(&urls(3), &ExtractionConfig::default(), Some(3))
            .await
            .unwrap();
        let got: Vec<_> = summary.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "https://example.com/p0",
                "https://example.com/p1",
                "https://example.com/p2"
            ]
        );
        assert_eq!(summary.successful, 3);
    }

    #[tokio::test]
    async fn one_failure_does_not_sink_the_batch() {
        let fetcher = MockFetcher::new()
            .with_page("https://example.com/p0", PAGE)
            .with_failure("https://example.com/p1", "connection refused")
            .with_page("https://example.com/p2", PAGE);
        let summary = orchestrator(fetcher)
            .run(&urls(3), &ExtractionConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(summary.total_processed, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.total_processed,
            summary.successful + summary.failed
        );
        assert!(summary.average_time_per_url <= summary.total_time);
        let failed = &summary.results[1];
        assert!(!failed.success);
        assert!(failed.data.is_none());
        assert!(failed.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn batch_latency_tracks_slowest_item_not_the_sum() {
        let mut fetcher = MockFetcher::new();
        for i in 0..3 {
            fetcher = fetcher.with_delayed_page(
                &format!("https://example.com/p{i}"),
                PAGE,
                Duration::from_millis(100),
            );
        }
        let started = std::time::Instant::now();
        let summary = orchestrator(fetcher)
            .run(&urls(3), &ExtractionConfig::default(), Some(3))
            .await
            .unwrap();
        // All three run in one wave: the batch should finish in roughly one
        // item's delay, well under the 300ms serial sum.
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(summary.total_time < 0.25);
        assert_eq!(summary.successful, 3);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_bound() {
        let mut fetcher = MockFetcher::new();
        for i in 0..8 {
            fetcher = fetcher.with_delayed_page(
                &format!("https://example.com/p{i}"),
                PAGE,
                Duration::from_millis(15),
            );
        }
        let observed_via = fetcher.clone();
        orchestrator(fetcher)
            .run(&urls(8), &ExtractionConfig::default(), Some(2))
            .await
            .unwrap();
        assert!(observed_via.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn requested_concurrency_is_capped_and_zero_rejected() {
        let fetcher = MockFetcher::new().with_page("https://example.com/p0", PAGE);
        let summary = orchestrator(fetcher.clone())
            .run(&urls(1), &ExtractionConfig::default(), Some(50))
            .await
            .unwrap();
        assert_eq!(summary.successful, 1);

        let err = orchestrator(fetcher)
            .run(&urls(1), &ExtractionConfig::default(), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn oversized_and_empty_batches_rejected() {
        let orch = orchestrator(MockFetcher::new());
        let err = orch
            .run(&urls(11), &ExtractionConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = orch
            .run(&[], &ExtractionConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
