use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

// "$ 1.234,56": optional symbol, '.' thousands groups, optional ',' and up to 2 decimals.
static AMOUNT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$?\s*([0-9]{1,3}(?:\.[0-9]{3})+|[0-9]+)(?:,([0-9]{1,2}))?")
        .expect("Invalid amount pattern")
});

/// Reads the first es-AR formatted amount in `text`.
///
/// Returns `None` when nothing amount-shaped is present; a literal zero parses to `Some(0)`.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let caps = AMOUNT_REGEX.captures(text)?;
    let integer = caps.get(1)?.as_str().replace('.', "");
    let normalized = match caps.get(2) {
        Some(fraction) => format!("{integer}.{}", fraction.as_str()),
        None => integer,
    };
    Decimal::from_str(&normalized).ok()
}
