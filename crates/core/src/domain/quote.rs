use crate::error::QueryError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Currency-rate categories published by the upstream page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteType {
    Oficial,
    Blue,
    Mep,
    Ccl,
    Cripto,
    Tarjeta,
    Freelance,
}

impl QuoteType {
    pub const ALL: [QuoteType; 7] = [
        QuoteType::Oficial,
        QuoteType::Blue,
        QuoteType::Mep,
        QuoteType::Ccl,
        QuoteType::Cripto,
        QuoteType::Tarjeta,
        QuoteType::Freelance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteType::Oficial => "oficial",
            QuoteType::Blue => "blue",
            QuoteType::Mep => "mep",
            QuoteType::Ccl => "ccl",
            QuoteType::Cripto => "cripto",
            QuoteType::Tarjeta => "tarjeta",
            QuoteType::Freelance => "freelance",
        }
    }

    /// Tarjeta and freelance carry a single value; everything else is buy/sell.
    pub fn is_single_valued(&self) -> bool {
        matches!(self, QuoteType::Tarjeta | QuoteType::Freelance)
    }

    pub fn zero_quote(&self) -> Quote {
        if self.is_single_valued() {
            Quote::Single(SingleValueQuote::default())
        } else {
            Quote::Pair(QuotePair::default())
        }
    }
}

impl fmt::Display for QuoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteType {
    type Err = QueryError;

    // Case-sensitive on purpose: "Blue" is not a valid tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuoteType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| QueryError::UnknownQuoteType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePair {
    pub buy: Decimal,
    pub sell: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleValueQuote {
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quote {
    Pair(QuotePair),
    Single(SingleValueQuote),
}

impl Quote {
    pub fn pair(buy: Decimal, sell: Decimal) -> Self {
        Quote::Pair(QuotePair { buy, sell })
    }

    pub fn single(value: Decimal) -> Self {
        Quote::Single(SingleValueQuote { value })
    }

    /// Sell side of a pair, or the value of a single quote.
    pub fn sell_or_value(&self) -> Decimal {
        match self {
            Quote::Pair(p) => p.sell,
            Quote::Single(s) => s.value,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Quote::Pair(p) => p.buy.is_zero() && p.sell.is_zero(),
            Quote::Single(s) => s.value.is_zero(),
        }
    }
}

/// Result of one scrape of the quotations page. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationSnapshot {
    pub quotes: BTreeMap<QuoteType, Quote>,
    pub source: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuotationSnapshot {
    pub fn quote(&self, quote_type: QuoteType) -> Quote {
        self.quotes
            .get(&quote_type)
            .copied()
            .unwrap_or_else(|| quote_type.zero_quote())
    }
}

/// Answer to a single-type query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteLookup {
    #[serde(rename = "tipo")]
    pub quote_type: QuoteType,
    pub quote: Quote,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}
