use crate::domain::quote::{Quote, QuoteType, QuotationSnapshot};
use crate::ingest::fetch::FetchError;
use crate::ingest::types::RawQuotes;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

pub const DOLARHOY_SOURCE: &str = "dolarhoy.com";
pub const FALLBACK_SOURCE: &str = "valores_fallback";
pub const FALLBACK_HTTP_SOURCE: &str = "valores_fallback_http_error";

// Freelance = crypto-implied sell rate minus a 7.5% haircut.
const FREELANCE_FACTOR: Decimal = dec!(0.925);

const EMPTY_EXTRACTION_ERROR: &str = "no quotation tiles could be extracted from the page";

/// Builds the full seven-type snapshot from whatever the extractor found.
pub fn aggregate(raw: &RawQuotes, timestamp: DateTime<Utc>) -> QuotationSnapshot {
    let mut quotes = BTreeMap::new();
    for quote_type in QuoteType::ALL {
        if quote_type == QuoteType::Freelance {
            continue;
        }
        let quote = raw
            .get(&quote_type)
            .copied()
            .unwrap_or_else(|| quote_type.zero_quote());
        quotes.insert(quote_type, quote);
    }

    let cripto_sell = raw
        .get(&QuoteType::Cripto)
        .map(Quote::sell_or_value)
        .unwrap_or_default();
    quotes.insert(QuoteType::Freelance, Quote::single(freelance_rate(cripto_sell)));

    let success = !raw.is_empty();
    QuotationSnapshot {
        quotes,
        source: DOLARHOY_SOURCE.to_string(),
        success,
        timestamp,
        error: (!success).then(|| EMPTY_EXTRACTION_ERROR.to_string()),
    }
}

pub fn freelance_rate(cripto_sell: Decimal) -> Decimal {
    if cripto_sell <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (cripto_sell * FREELANCE_FACTOR).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// All-zero snapshot for a pipeline that could not get as far as extraction.
pub fn fallback_snapshot(err: &anyhow::Error, timestamp: DateTime<Utc>) -> QuotationSnapshot {
    let (source, error) = match err.downcast_ref::<FetchError>() {
        Some(fetch_err) => (FALLBACK_HTTP_SOURCE, format!("HTTP error: {fetch_err}")),
        None => (FALLBACK_SOURCE, format!("{err:#}")),
    };

    QuotationSnapshot {
        quotes: QuoteType::ALL
            .into_iter()
            .map(|t| (t, t.zero_quote()))
            .collect(),
        source: source.to_string(),
        success: false,
        timestamp,
        error: Some(error),
    }
}
