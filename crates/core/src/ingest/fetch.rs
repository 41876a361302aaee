use anyhow::Context;
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::time::{Duration, Instant};
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_REDIRECTS: usize = 5;

// Enough of an error page to recognise a block page or a maintenance notice.
const BODY_PREVIEW_CHARS: usize = 500;

const ACCEPT_LANGUAGE_VALUE: &str = "es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3";

pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2.1 Safari/605.1.15",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Rss,
}

impl DocumentKind {
    fn accept(&self) -> &'static str {
        match self {
            DocumentKind::Html => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
            }
            DocumentKind::Rss => "application/rss+xml, application/xml, text/xml, */*",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_redirects: usize,
    /// The upstream page has been served with broken certificate chains, so verification is off.
    pub accept_invalid_certs: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_invalid_certs: true,
        }
    }
}

impl FetchOptions {
    /// The first request plus `max_retries` retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Final URL, after redirects.
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawDocument {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status} {reason} ({url})")]
    Status {
        url: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("invalid request for {url}: {message}")]
    InvalidRequest { url: String, message: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            FetchError::Status { reason, .. } => reason,
            FetchError::Transport { message, .. } | FetchError::InvalidRequest { message, .. } => {
                message
            }
        }
    }

    pub fn truncated_body(&self) -> Option<&str> {
        match self {
            FetchError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::InvalidRequest { url, .. } => url,
        }
    }

    /// Malformed URLs, redirect loops and similar client-side mistakes fail the same way every
    /// time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::InvalidRequest { .. })
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_redirect() {
            FetchError::InvalidRequest {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, kind: DocumentKind) -> Result<RawDocument, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .context("failed to build upstream http client")?;

        Ok(Self { http, options })
    }

    async fn fetch_once(&self, url: &str, kind: DocumentKind) -> Result<RawDocument, FetchError> {
        let user_agent = pick_user_agent(&mut rand::rng());
        let res = self
            .http
            .get(url)
            .headers(browser_headers(kind, user_agent))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = res.status();
        let final_url = res.url().to_string();
        let body = res
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body: truncate_body(&body),
            });
        }

        Ok(RawDocument {
            url: final_url,
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, kind: DocumentKind) -> Result<RawDocument, FetchError> {
        let max_attempts = self.options.max_attempts();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let res = self.fetch_once(url, kind).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match res {
                Ok(doc) => {
                    tracing::info!(
                        url,
                        final_url = %doc.url,
                        attempt,
                        status = doc.status,
                        elapsed_ms,
                        bytes = doc.body.len(),
                        "upstream fetch succeeded"
                    );
                    return Ok(doc);
                }
                Err(err) => {
                    if !err.is_retryable() || attempt >= max_attempts {
                        tracing::error!(
                            url = err.url(),
                            attempt,
                            status = ?err.status(),
                            elapsed_ms,
                            body = err.truncated_body().unwrap_or(""),
                            error = %err,
                            "upstream fetch failed"
                        );
                        return Err(err);
                    }
                    tracing::warn!(
                        url,
                        attempt,
                        status = ?err.status(),
                        elapsed_ms,
                        delay = ?self.options.retry_delay,
                        error = %err,
                        "upstream fetch failed; retrying"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                }
            }
        }
    }
}

pub fn pick_user_agent<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0])
}

pub fn browser_headers(kind: DocumentKind, user_agent: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(ACCEPT, HeaderValue::from_static(kind.accept()));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

fn truncate_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn picks_user_agents_from_the_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let ua = pick_user_agent(&mut rng);
            assert!(USER_AGENTS.contains(&ua));
        }
    }

    #[test]
    fn seeded_picks_are_reproducible() {
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| pick_user_agent(&mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| pick_user_agent(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn browser_headers_depend_on_document_kind() {
        let html = browser_headers(DocumentKind::Html, USER_AGENTS[0]);
        assert!(html[ACCEPT].to_str().unwrap().starts_with("text/html"));
        assert_eq!(html[CONNECTION], "keep-alive");
        assert_eq!(html[CACHE_CONTROL], "max-age=0");
        assert_eq!(html[USER_AGENT], USER_AGENTS[0]);

        let rss = browser_headers(DocumentKind::Rss, USER_AGENTS[3]);
        assert!(rss[ACCEPT].to_str().unwrap().starts_with("application/rss+xml"));
        assert_eq!(rss[ACCEPT_LANGUAGE], ACCEPT_LANGUAGE_VALUE);
    }

    #[test]
    fn truncates_error_bodies() {
        let body = "x".repeat(2_000);
        assert_eq!(truncate_body(body.as_bytes()).len(), BODY_PREVIEW_CHARS);
        assert_eq!(truncate_body(b"short"), "short");
    }

    #[test]
    fn attempt_count_saturates() {
        assert_eq!(FetchOptions::default().max_attempts(), 4);
        let huge = FetchOptions {
            max_retries: u32::MAX,
            ..FetchOptions::default()
        };
        assert_eq!(huge.max_attempts(), u32::MAX);
    }

    #[test]
    fn only_invalid_requests_skip_retries() {
        let status = FetchError::Status {
            url: "https://example.test".into(),
            status: 503,
            reason: "Service Unavailable".into(),
            body: "busy".into(),
        };
        assert!(status.is_retryable());
        assert_eq!(status.status(), Some(503));
        assert_eq!(status.reason(), "Service Unavailable");
        assert_eq!(status.truncated_body(), Some("busy"));

        let invalid = FetchError::InvalidRequest {
            url: "not a url".into(),
            message: "relative URL without a base".into(),
        };
        assert!(!invalid.is_retryable());
        assert_eq!(invalid.status(), None);
    }
}
