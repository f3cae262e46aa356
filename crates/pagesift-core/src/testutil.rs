//! Hand-rolled fetch mock shared by unit and integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::error::AppError;
use crate::models::RawPage;
use crate::traits::{FetchOptions, PageFetcher};

#[derive(Debug, Clone)]
enum MockOutcome {
    Page {
        html: String,
        status_code: u16,
        delay: Duration,
    },
    Failure(String),
}

/// A [`PageFetcher`] serving canned responses keyed by exact URL.
///
/// Tracks how many fetches were in flight simultaneously so tests can
/// assert on concurrency bounds.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    inner: Arc<MockInner>,
}

#[derive(Debug, Default)]
struct MockInner {
    routes: Mutex<HashMap<String, MockOutcome>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetch_count: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.insert(
            url,
            MockOutcome::Page {
                html: html.to_string(),
                status_code: 200,
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn with_status_page(self, url: &str, html: &str, status_code: u16) -> Self {
        self.insert(
            url,
            MockOutcome::Page {
                html: html.to_string(),
                status_code,
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn with_delayed_page(self, url: &str, html: &str, delay: Duration) -> Self {
        self.insert(
            url,
            MockOutcome::Page {
                html: html.to_string(),
                status_code: 200,
                delay,
            },
        );
        self
    }

    /// Route that fails with `FetchUnavailable`.
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.insert(url, MockOutcome::Failure(message.to_string()));
        self
    }

    /// Highest number of fetches observed in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetch_count.load(Ordering::SeqCst)
    }

    fn insert(&self, url: &str, outcome: MockOutcome) {
        self.lock_routes().insert(url.to_string(), outcome);
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, MockOutcome>> {
        self.inner
            .routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url, _options: &FetchOptions) -> Result<RawPage, AppError> {
        self.inner.fetch_count.fetch_add(1, Ordering::SeqCst);
        let outcome = self.lock_routes().get(url.as_str()).cloned();
        let Some(outcome) = outcome else {
            return Err(AppError::FetchError(format!("no mock route for {url}")));
        };

        let active = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(active, Ordering::SeqCst);

        let result = match outcome {
            MockOutcome::Page {
                html,
                status_code,
                delay,
            } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                RawPage::new(url.clone(), html, status_code)
            }
            MockOutcome::Failure(message) => Err(AppError::FetchUnavailable(message)),
        };

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
