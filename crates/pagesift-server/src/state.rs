use std::sync::Arc;

use pagesift_core::batch::BatchOrchestrator;
use pagesift_core::pipeline::ExtractService;
use pagesift_core::quota::QuotaGovernor;
use pagesift_core::traits::PageFetcher;

use crate::settings::Settings;

/// Shared application state, available to all route handlers via
/// `State<Arc<AppState<F>>>`. Generic over the fetcher so integration
/// tests can run the whole stack against canned pages.
pub struct AppState<F: PageFetcher> {
    pub service: ExtractService<F>,
    pub batch: BatchOrchestrator<F>,
    pub governor: Arc<QuotaGovernor>,
    pub settings: Settings,
}
