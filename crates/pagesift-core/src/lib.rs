pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod quota;
pub mod testutil;
pub mod traits;
pub mod util;

pub use batch::{BatchItem, BatchOrchestrator, BatchSummary};
pub use config::{ExtractionConfig, ExtractionOptions};
pub use error::AppError;
pub use models::{ExtractionResult, RawPage};
pub use pipeline::ExtractService;
pub use quota::{Caller, QuotaDecision, QuotaGovernor, QuotaRule, QuotaStatus, RuleScope};
pub use traits::{FetchOptions, PageFetcher};
