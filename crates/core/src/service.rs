use crate::aggregate::{aggregate, fallback_snapshot};
use crate::cache::TtlCache;
use crate::config::Settings;
use crate::domain::news::NewsSnapshot;
use crate::domain::quote::{QuotationSnapshot, QuoteLookup, QuoteType};
use crate::error::QueryError;
use crate::ingest::ambito::extract_news;
use crate::ingest::dolarhoy::extract_quotes;
use crate::ingest::fetch::{DocumentFetcher, DocumentKind, FetchError, HttpFetcher};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub const QUOTES_CACHE_KEY: &str = "quotes";
pub const NEWS_CACHE_KEY: &str = "news";
pub const AMBITO_SOURCE: &str = "ambito.com";

/// Entry point for everything the HTTP layer serves.
///
/// Never fails on upstream trouble: fetch and extraction failures come back as snapshots with
/// `success = false` (or an empty news list) and an `error` message.
pub struct DolarService {
    fetcher: Arc<dyn DocumentFetcher>,
    dolar_url: String,
    news_url: String,
    cache_ttl: Duration,
    quotes: TtlCache<QuotationSnapshot>,
    news: TtlCache<NewsSnapshot>,
}

impl DolarService {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, settings: &Settings) -> Self {
        Self {
            fetcher,
            dolar_url: settings.dolar_url.clone(),
            news_url: settings.news_url.clone(),
            cache_ttl: settings.cache_ttl,
            quotes: TtlCache::new(),
            news: TtlCache::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(settings.fetch.clone())?;
        Ok(Self::new(Arc::new(fetcher), settings))
    }

    pub async fn get_quotations(&self) -> QuotationSnapshot {
        self.quotes
            .get_or_compute(QUOTES_CACHE_KEY, self.cache_ttl, || self.scrape_quotations())
            .await
    }

    pub async fn get_fresh_quotations(&self) -> QuotationSnapshot {
        self.quotes.invalidate(QUOTES_CACHE_KEY).await;
        self.get_quotations().await
    }

    /// `tipo` must be one of the seven lowercase tags; anything else is rejected before any fetch.
    pub async fn get_quotations_by_type(&self, tipo: &str) -> Result<QuoteLookup, QueryError> {
        let quote_type: QuoteType = tipo.parse()?;
        let snapshot = self.get_quotations().await;
        Ok(QuoteLookup {
            quote_type,
            quote: snapshot.quote(quote_type),
            source: snapshot.source,
            timestamp: snapshot.timestamp,
        })
    }

    pub async fn get_news(&self) -> NewsSnapshot {
        self.news
            .get_or_compute(NEWS_CACHE_KEY, self.cache_ttl, || self.scrape_news())
            .await
    }

    /// Runs the quotations pipeline once, bypassing the cache entirely.
    pub async fn scrape_quotations(&self) -> QuotationSnapshot {
        match self.fetch_text(&self.dolar_url, DocumentKind::Html).await {
            Ok(html) => quotations_from_html(&html, Utc::now()),
            Err(err) => {
                tracing::error!(url = %self.dolar_url, error = %format!("{err:#}"), "quotations scrape failed");
                fallback_snapshot(&err, Utc::now())
            }
        }
    }

    pub async fn scrape_news(&self) -> NewsSnapshot {
        match self.fetch_text(&self.news_url, DocumentKind::Rss).await {
            Ok(xml) => news_from_xml(&xml, Utc::now()),
            Err(err) => {
                tracing::error!(url = %self.news_url, error = %format!("{err:#}"), "news fetch failed");
                let message = match err.downcast_ref::<FetchError>() {
                    Some(fetch_err) => format!("HTTP error: {fetch_err}"),
                    None => format!("{err:#}"),
                };
                NewsSnapshot::failed(AMBITO_SOURCE, Utc::now(), message)
            }
        }
    }

    async fn fetch_text(&self, url: &str, kind: DocumentKind) -> anyhow::Result<String> {
        let doc = self.fetcher.fetch(url, kind).await?;
        Ok(doc.text())
    }
}

pub fn quotations_from_html(html: &str, timestamp: DateTime<Utc>) -> QuotationSnapshot {
    let raw = extract_quotes(html);
    if raw.is_empty() {
        tracing::warn!(
            bytes = html.len(),
            "no quote tiles recognised; upstream markup may have changed"
        );
    }
    aggregate(&raw, timestamp)
}

pub fn news_from_xml(xml: &str, timestamp: DateTime<Utc>) -> NewsSnapshot {
    match extract_news(xml) {
        Ok(items) => NewsSnapshot::new(items, AMBITO_SOURCE, timestamp),
        Err(err) => {
            tracing::warn!(bytes = xml.len(), error = %err, "news feed could not be parsed");
            NewsSnapshot::failed(
                AMBITO_SOURCE,
                timestamp,
                format!("feed is not well-formed XML: {err}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{DOLARHOY_SOURCE, FALLBACK_HTTP_SOURCE};
    use crate::domain::quote::Quote;
    use crate::ingest::fetch::RawDocument;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAGE: &str = r#"<html><body><div class="tile dolar">
        <div class="tile is-child">
          <a class="titleText" href="/cotizaciondolarblue">Dólar blue</a>
          <div class="compra"><div class="val">$1.185</div></div>
          <div class="venta"><div class="val">$1.205</div></div>
        </div>
        <div class="tile is-child">
          <a class="titleText" href="/seccion/bitcoins">Dólar cripto</a>
          <div class="compra"><div class="val">$1.180,00</div></div>
          <div class="venta"><div class="val">$1.000,00</div></div>
        </div>
      </div></body></html>"#;

    struct FakeFetcher {
        html: Result<String, FetchError>,
        rss: String,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn serving(html: &str, rss: &str) -> Self {
            Self {
                html: Ok(html.to_string()),
                rss: rss.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: FetchError) -> Self {
            Self {
                html: Err(err),
                rss: String::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl DocumentFetcher for FakeFetcher {
        async fn fetch(&self, url: &str, kind: DocumentKind) -> Result<RawDocument, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = match kind {
                DocumentKind::Html => self.html.clone()?,
                DocumentKind::Rss => self.rss.clone(),
            };
            Ok(RawDocument {
                url: url.to_string(),
                status: 200,
                body: body.into_bytes(),
            })
        }
    }

    fn service(fetcher: &Arc<FakeFetcher>) -> DolarService {
        DolarService::new(fetcher.clone(), &Settings::default())
    }

    #[tokio::test]
    async fn cached_queries_return_the_same_snapshot() {
        let fetcher = Arc::new(FakeFetcher::serving(PAGE, ""));
        let svc = service(&fetcher);

        let first = svc.get_quotations().await;
        let second = svc.get_quotations().await;

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
        assert!(first.success);
        assert_eq!(first.source, DOLARHOY_SOURCE);
    }

    #[tokio::test]
    async fn fresh_queries_always_refetch() {
        let fetcher = Arc::new(FakeFetcher::serving(PAGE, ""));
        let svc = service(&fetcher);

        svc.get_quotations().await;
        svc.get_fresh_quotations().await;
        svc.get_fresh_quotations().await;
        assert_eq!(fetcher.calls(), 3);

        // The fresh result is what later cached reads see.
        let fresh = svc.get_fresh_quotations().await;
        assert_eq!(svc.get_quotations().await, fresh);
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test]
    async fn exhausted_fetch_yields_all_zero_snapshot() {
        let fetcher = Arc::new(FakeFetcher::failing(FetchError::Status {
            url: "https://dolarhoy.com/".into(),
            status: 503,
            reason: "Service Unavailable".into(),
            body: "<h1>busy</h1>".into(),
        }));
        let svc = service(&fetcher);

        let snap = svc.get_fresh_quotations().await;

        assert!(!snap.success);
        assert_eq!(snap.source, FALLBACK_HTTP_SOURCE);
        assert_eq!(snap.quotes.len(), 7);
        assert!(snap.quotes.values().all(Quote::is_zero));
        assert!(snap.error.is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn lookup_by_type_returns_one_quote() {
        let fetcher = Arc::new(FakeFetcher::serving(PAGE, ""));
        let svc = service(&fetcher);

        let blue = svc.get_quotations_by_type("blue").await.unwrap();
        assert_eq!(blue.quote_type, QuoteType::Blue);
        assert_eq!(blue.quote, Quote::pair(dec!(1185), dec!(1205)));

        let freelance = svc.get_quotations_by_type("freelance").await.unwrap();
        assert_eq!(freelance.quote, Quote::single(dec!(925.00)));

        let oficial = svc.get_quotations_by_type("oficial").await.unwrap();
        assert!(oficial.quote.is_zero());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn lookup_rejects_unknown_types_without_fetching() {
        let fetcher = Arc::new(FakeFetcher::serving(PAGE, ""));
        let svc = service(&fetcher);

        let err = svc.get_quotations_by_type("invalid").await.unwrap_err();
        assert_eq!(err, QueryError::UnknownQuoteType("invalid".to_string()));
        assert!(svc.get_quotations_by_type("Blue").await.is_err());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn news_is_cached_separately_from_quotes() {
        let rss = r#"<rss><channel>
            <item><title>Uno</title><pubDate>Sat, 17 Oct 2026 12:00:00 +0000</pubDate></item>
            <item><title>Dos</title><pubDate>mañana</pubDate></item>
          </channel></rss>"#;
        let fetcher = Arc::new(FakeFetcher::serving(PAGE, rss));
        let svc = service(&fetcher);

        let news = svc.get_news().await;
        svc.get_news().await;
        svc.get_fresh_quotations().await;

        assert_eq!(news.count, 2);
        assert_eq!(news.source, AMBITO_SOURCE);
        assert_eq!(news.items[1].published_at, "mañana");
        assert_eq!(fetcher.calls(), 2);
    }

    #[test]
    fn unparsable_feed_becomes_empty_snapshot_with_error() {
        let ts = Utc::now();
        let snap = news_from_xml("<html><body>502 Bad Gateway", ts);

        assert!(snap.items.is_empty());
        assert_eq!(snap.count, 0);
        assert!(snap.error.unwrap().starts_with("feed is not well-formed XML"));
    }

    #[test]
    fn unrecognised_page_is_unsuccessful_but_well_formed() {
        let snap = quotations_from_html("<html><body>Mantenimiento</body></html>", Utc::now());

        assert!(!snap.success);
        assert_eq!(snap.quotes.len(), 7);
        assert!(snap.error.is_some());
    }
}
