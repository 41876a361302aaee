pub mod aggregate;
pub mod cache;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod service;
pub mod time;

pub mod config {
    use crate::ingest::fetch::FetchOptions;
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_DOLAR_URL: &str = "https://dolarhoy.com/";
    pub const DEFAULT_NEWS_URL: &str = "https://www.ambito.com/rss/pages/economia.xml";
    const DEFAULT_CACHE_TTL_SECS: u64 = 120;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub dolar_url: String,
        pub news_url: String,
        pub cache_ttl: Duration,
        pub fetch: FetchOptions,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Same as [`Settings::from_env`], reading values through `lookup`.
        pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let defaults = FetchOptions::default();
            let fetch = FetchOptions {
                timeout: Duration::from_secs(
                    env_parse(&lookup, "FETCH_TIMEOUT_SECS").unwrap_or(defaults.timeout.as_secs()),
                ),
                max_retries: env_parse(&lookup, "FETCH_MAX_RETRIES")
                    .unwrap_or(defaults.max_retries),
                retry_delay: Duration::from_millis(
                    env_parse(&lookup, "FETCH_RETRY_DELAY_MS")
                        .unwrap_or(defaults.retry_delay.as_millis() as u64),
                ),
                max_redirects: env_parse(&lookup, "FETCH_MAX_REDIRECTS")
                    .unwrap_or(defaults.max_redirects),
                ..defaults
            };

            Ok(Self {
                api_key: lookup("API_KEY")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                sentry_dsn: lookup("SENTRY_DSN"),
                dolar_url: env_url(&lookup, "DOLAR_URL")
                    .unwrap_or_else(|| DEFAULT_DOLAR_URL.to_string()),
                news_url: env_url(&lookup, "NEWS_URL")
                    .unwrap_or_else(|| DEFAULT_NEWS_URL.to_string()),
                cache_ttl: Duration::from_secs(
                    env_parse(&lookup, "CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS),
                ),
                fetch,
            })
        }

        pub fn require_api_key(&self) -> anyhow::Result<&str> {
            self.api_key.as_deref().context("API_KEY is required")
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                api_key: None,
                sentry_dsn: None,
                dolar_url: DEFAULT_DOLAR_URL.to_string(),
                news_url: DEFAULT_NEWS_URL.to_string(),
                cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
                fetch: FetchOptions::default(),
            }
        }
    }

    fn env_parse<T, F>(lookup: &F, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
        F: Fn(&str) -> Option<String>,
    {
        lookup(key).and_then(|s| s.trim().parse::<T>().ok())
    }

    fn env_url<F>(lookup: &F, key: &str) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(key).filter(|s| !s.trim().is_empty())
    }

}
