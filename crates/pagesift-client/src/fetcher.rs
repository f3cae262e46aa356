use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pagesift_core::error::AppError;
use pagesift_core::models::RawPage;
use pagesift_core::traits::{FetchOptions, PageFetcher};
use reqwest::Client;
use url::Url;

/// Browser User-Agents cycled across requests to spread fingerprints.
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Version/17.4 Safari/605.1.15",
];

/// HTTP fetcher using reqwest.
///
/// By default, SSRF protection is **enabled** — requests to private or
/// reserved IP ranges are blocked before any connection is made. Use
/// [`allow_private_urls`](Self::allow_private_urls) to disable this for
/// local development against private hosts.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    next_agent: Arc<AtomicUsize>,
    ssrf_protection: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// `timeout` bounds the whole request including body download. The
    /// pipeline applies its own deadline on top; this one protects the
    /// client when used standalone.
    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AppError::FetchError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            next_agent: Arc::new(AtomicUsize::new(0)),
            ssrf_protection: true,
        })
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }

    fn user_agent(&self) -> &'static str {
        let n = self.next_agent.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[n % USER_AGENTS.len()]
    }
}

impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<RawPage, AppError> {
        if self.ssrf_protection {
            validate_target(url).await?;
        }

        let mut request = self.client.get(url.clone()).header(
            reqwest::header::USER_AGENT,
            self.user_agent(),
        );
        if !options.use_cache {
            request = request.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::FetchTimeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::FetchUnavailable(format!("Connection failed: {e}"))
            } else {
                AppError::FetchError(e.to_string())
            }
        })?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(AppError::FetchError(format!("HTTP {status_code} for {url}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::FetchError(format!("Failed to read response body: {e}")))?;

        tracing::debug!(url = %url, status = status_code, bytes = html.len(), "page fetched");
        RawPage::new(url.clone(), html, status_code)
    }
}

/// Reject targets that resolve to private or reserved addresses.
///
/// IP literals are checked directly; hostnames are resolved and every
/// returned address must be public.
async fn validate_target(url: &Url) -> Result<(), AppError> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::ValidationError("URL has no host".to_string()))?;

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(AppError::ValidationError(format!(
                "Blocked: {host} is a private/reserved address"
            )));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::FetchUnavailable(format!("DNS resolution failed for {host}: {e}")))?
        .collect();
    if addrs.is_empty() {
        return Err(AppError::FetchUnavailable(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }
    for addr in &addrs {
        if is_private_ip(addr.ip()) {
            return Err(AppError::ValidationError(format!(
                "Blocked: {host} resolves to private/reserved IP {}",
                addr.ip()
            )));
        }
    }
    Ok(())
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254.0.0/16 (cloud metadata)
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // link-local
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // unique local
                || match v6.to_ipv4_mapped() {
                    Some(v4) => is_private_ip(IpAddr::V4(v4)),
                    None => false,
                }
        }
    }
}
