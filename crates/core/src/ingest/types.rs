use crate::domain::quote::{Quote, QuoteType};
use std::collections::BTreeMap;

/// Quotes the extractor actually found on the page, before zero-filling.
pub type RawQuotes = BTreeMap<QuoteType, Quote>;
