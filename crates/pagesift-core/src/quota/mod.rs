//! Fixed-window request quotas.
//!
//! The governor increments every applicable window counter first and
//! compares after, so concurrent requests racing on the same identity can
//! never both observe "one slot left" and both pass.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use subtle::ConstantTimeEq;

use store::QuotaStore;

/// What a quota rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Counted for every governed request, regardless of endpoint.
    Global,
    Extract,
    Batch,
}

impl RuleScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleScope::Global => "global",
            RuleScope::Extract => "extract",
            RuleScope::Batch => "batch",
        }
    }
}

/// One fixed-window limit: at most `limit` requests per `window`.
#[derive(Debug, Clone, Copy)]
pub struct QuotaRule {
    pub scope: RuleScope,
    pub limit: u64,
    pub window: Duration,
}

impl QuotaRule {
    pub const fn new(scope: RuleScope, limit: u64, window: Duration) -> Self {
        Self {
            scope,
            limit,
            window,
        }
    }
}

/// The stock rule set: a global budget plus tighter per-endpoint limits.
pub fn default_rules() -> Vec<QuotaRule> {
    vec![
        QuotaRule::new(RuleScope::Global, 100, Duration::from_secs(3600)),
        QuotaRule::new(RuleScope::Global, 20, Duration::from_secs(60)),
        QuotaRule::new(RuleScope::Extract, 15, Duration::from_secs(60)),
        QuotaRule::new(RuleScope::Batch, 3, Duration::from_secs(60)),
    ]
}

/// A resolved request identity. Trusted callers bypass the governor.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Counter key prefix, e.g. `ip:203.0.113.9`.
    pub identity: String,
    pub trusted: bool,
}

/// Snapshot of the tightest applicable window, for response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub limit: u64,
    pub remaining: u64,
    pub reset_after: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum QuotaDecision {
    /// Trusted caller, disabled governor, or no applicable rules.
    Bypassed,
    Allowed(QuotaStatus),
    Denied {
        /// Largest reset among the violated windows.
        retry_after: u64,
        status: QuotaStatus,
    },
}

pub struct QuotaGovernor {
    store: Arc<dyn QuotaStore>,
    rules: Vec<QuotaRule>,
    api_keys: Vec<String>,
    enabled: bool,
}

impl QuotaGovernor {
    pub fn new(
        store: Arc<dyn QuotaStore>,
        rules: Vec<QuotaRule>,
        api_keys: Vec<String>,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            rules,
            api_keys,
            enabled,
        }
    }

    /// Resolve the caller's identity from the presented key and client IP.
    ///
    /// A key matching any configured key (compared in constant time) marks
    /// the caller trusted; an unknown key is ignored and the caller is
    /// treated as anonymous rather than rejected.
    pub fn resolve_caller(&self, api_key: Option<&str>, client_ip: &str) -> Caller {
        if let Some(key) = api_key {
            if self.api_keys.iter().any(|known| constant_time_eq(known, key)) {
                return Caller {
                    identity: "key:trusted".to_string(),
                    trusted: true,
                };
            }
        }
        Caller {
            identity: format!("ip:{client_ip}"),
            trusted: false,
        }
    }

    /// Charge one request against every rule that applies to `scope`.
    ///
    /// Counters are incremented before comparison, including the request
    /// that ends up denied; a denied request still consumes its slot in
    /// every window it touched. Store failures never block the request:
    /// the affected rule is skipped with an error log.
    pub async fn check(&self, caller: &Caller, scope: RuleScope) -> QuotaDecision {
        if !self.enabled || caller.trusted {
            return QuotaDecision::Bypassed;
        }

        let mut tightest: Option<QuotaStatus> = None;
        let mut retry_after: u64 = 0;
        let mut violated = false;

        for rule in self
            .rules
            .iter()
            .filter(|r| r.scope == RuleScope::Global || r.scope == scope)
        {
            let key = format!(
                "{}:{}:{}",
                caller.identity,
                rule.scope.as_str(),
                rule.window.as_secs()
            );
            let window = match self.store.increment(&key, rule.window).await {
                Ok(window) => window,
                Err(error) => {
                    tracing::error!(%error, key = %key, "quota store unavailable, skipping rule");
                    continue;
                }
            };

            let status = QuotaStatus {
                limit: rule.limit,
                remaining: rule.limit.saturating_sub(window.count),
                reset_after: window.reset_after,
            };
            if window.count > rule.limit {
                violated = true;
                retry_after = retry_after.max(window.reset_after);
            }
            if tightest.map_or(true, |t| status.remaining < t.remaining) {
                tightest = Some(status);
            }
        }

        match (violated, tightest) {
            (_, None) => QuotaDecision::Bypassed,
            (false, Some(status)) => QuotaDecision::Allowed(status),
            (true, Some(status)) => QuotaDecision::Denied {
                retry_after,
                status,
            },
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
