use std::time::Duration;

use pagesift_core::quota::{QuotaRule, RuleScope};
use pagesift_core::AppError;

/// Deployment environment. Quotas are only enforced in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaBackend {
    Memory,
    Postgres,
}

/// Server configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub port: u16,
    /// Keys that bypass quota enforcement entirely.
    pub api_keys: Vec<String>,
    pub crawler_timeout: Duration,
    pub quota_backend: QuotaBackend,
    pub quota_rules: Vec<QuotaRule>,
}

impl Settings {
    /// Read configuration from environment variables.
    ///
    /// - `PAGESIFT_ENV` — `development` (default) or `production`
    /// - `PAGESIFT_PORT` — listen port, defaults to 8080
    /// - `PAGESIFT_API_KEYS` — comma-separated trusted keys
    /// - `CRAWLER_TIMEOUT` — per-fetch deadline in seconds, defaults to 30
    /// - `QUOTA_BACKEND` — `memory` (default) or `postgres`
    /// - `QUOTA_GLOBAL_PER_HOUR`, `QUOTA_GLOBAL_PER_MINUTE`,
    ///   `QUOTA_EXTRACT_PER_MINUTE`, `QUOTA_BATCH_PER_MINUTE` — limit
    ///   overrides; zero removes the rule
    pub fn from_env() -> Result<Self, AppError> {
        let environment = match std::env::var("PAGESIFT_ENV") {
            Err(_) => Environment::Development,
            Ok(raw) => match raw.to_lowercase().as_str() {
                "development" | "dev" => Environment::Development,
                "production" | "prod" => Environment::Production,
                other => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid PAGESIFT_ENV '{other}': expected development or production"
                    )))
                }
            },
        };

        let port = parse_var("PAGESIFT_PORT", 8080u16)?;
        let crawler_timeout = Duration::from_secs(parse_var("CRAWLER_TIMEOUT", 30u64)?);

        let api_keys = std::env::var("PAGESIFT_API_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let quota_backend = match std::env::var("QUOTA_BACKEND") {
            Err(_) => QuotaBackend::Memory,
            Ok(raw) => match raw.to_lowercase().as_str() {
                "memory" => QuotaBackend::Memory,
                "postgres" => QuotaBackend::Postgres,
                other => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid QUOTA_BACKEND '{other}': expected memory or postgres"
                    )))
                }
            },
        };

        let mut quota_rules = Vec::new();
        let hour = Duration::from_secs(3600);
        let minute = Duration::from_secs(60);
        for (scope, var, default, window) in [
            (RuleScope::Global, "QUOTA_GLOBAL_PER_HOUR", 100u64, hour),
            (RuleScope::Global, "QUOTA_GLOBAL_PER_MINUTE", 20, minute),
            (RuleScope::Extract, "QUOTA_EXTRACT_PER_MINUTE", 15, minute),
            (RuleScope::Batch, "QUOTA_BATCH_PER_MINUTE", 3, minute),
        ] {
            let limit = parse_var(var, default)?;
            if limit > 0 {
                quota_rules.push(QuotaRule::new(scope, limit, window));
            }
        }

        Ok(Self {
            environment,
            port,
            api_keys,
            crawler_timeout,
            quota_backend,
            quota_rules,
        })
    }

    pub fn quota_enabled(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| {
            AppError::ConfigError(format!("Invalid {name} '{raw}': expected a number"))
        }),
    }
}
