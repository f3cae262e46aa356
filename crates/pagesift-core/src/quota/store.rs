//! Window counter storage.
//!
//! The governor only needs one primitive: atomically bump a keyed counter
//! that expires after a fixed TTL. Backends implement that primitive;
//! everything else (limits, bypass, header math) lives in the governor.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::AppError;

/// Counter state after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Value after this increment; the first hit in a window reads 1.
    pub count: u64,
    /// Seconds until the window resets, rounded up.
    pub reset_after: u64,
}

/// Atomic increment-with-TTL over named counters.
///
/// `increment` must be atomic with respect to concurrent callers on the
/// same key: no two callers may observe the same count within one window.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<WindowCount, AppError>;
}

/// In-process store backed by a mutex-guarded map.
///
/// Suitable for a single instance and for tests; multi-instance
/// deployments want the database-backed store instead.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    windows: Mutex<HashMap<String, WindowEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u64,
    expires_at: Instant,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<WindowCount, AppError> {
        let now = Instant::now();
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| AppError::StoreError("quota store mutex poisoned".to_string()))?;

        // Opportunistic cleanup so dead windows don't pile up.
        windows.retain(|_, entry| entry.expires_at > now);

        let entry = windows
            .entry(key.to_string())
            .and_modify(|entry| entry.count += 1)
            .or_insert(WindowEntry {
                count: 1,
                expires_at: now + ttl,
            });

        let remaining = entry.expires_at.saturating_duration_since(now);
        Ok(WindowCount {
            count: entry.count,
            reset_after: remaining.as_secs_f64().ceil() as u64,
        })
    }
}
