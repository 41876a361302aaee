use crate::domain::quote::{Quote, QuoteType};
use crate::ingest::amount::parse_amount;
use crate::ingest::classify::classify;
use crate::ingest::types::RawQuotes;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// One place on the page where quote tiles live.
struct ContainerStrategy {
    name: &'static str,
    container: Selector,
}

struct TileSelectors {
    tile: Selector,
    link: Selector,
    buy: Selector,
    sell: Selector,
    value: Selector,
}

// Tried in order; the first container that yields any quote wins. Container selectors match
// on class only, whatever the element.
static STRATEGIES: LazyLock<[ContainerStrategy; 2]> = LazyLock::new(|| {
    [
        ContainerStrategy {
            name: "main",
            container: selector(r#"[class*="tile dolar"]"#),
        },
        ContainerStrategy {
            name: "more_cotizaciones",
            container: selector(
                r#"[class*="modulo__more_cotizaciones"] [class*="cotizaciones_more"]"#,
            ),
        },
    ]
});

static TILE: LazyLock<TileSelectors> = LazyLock::new(|| TileSelectors {
    tile: selector(r#"div[class*="tile is-child"]"#),
    link: selector(r#"a[class*="titleText"]"#),
    buy: selector(r#"div[class*="compra"] div[class*="val"]"#),
    sell: selector(r#"div[class*="venta"] div[class*="val"]"#),
    value: selector(r#"div[class*="val"]"#),
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid tile selector")
}

/// Pulls every recognisable quote tile out of the quotations page.
///
/// Only what was actually found is returned; missing types are filled in by the aggregator.
/// Broken markup never fails the call, it just yields fewer (or no) entries.
pub fn extract_quotes(html: &str) -> RawQuotes {
    let document = Html::parse_document(html);
    let mut found = RawQuotes::new();

    for strategy in STRATEGIES.iter() {
        let Some(container) = document.select(&strategy.container).next() else {
            tracing::info!(container = strategy.name, "quotes container not found");
            continue;
        };

        let added = extract_container(container, strategy.name, &mut found);
        tracing::info!(container = strategy.name, added, "quotes container scanned");

        if !found.is_empty() {
            break;
        }
    }

    tracing::info!(
        types_found = ?found.keys().map(QuoteType::as_str).collect::<Vec<_>>(),
        success = !found.is_empty(),
        "quotes extraction finished"
    );
    found
}

fn extract_container(container: ElementRef<'_>, name: &str, found: &mut RawQuotes) -> usize {
    let mut added = 0;
    for (idx, tile) in container.select(&TILE.tile).enumerate() {
        let Some(link) = tile.select(&TILE.link).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or("");
        let Some(quote_type) = classify(href) else {
            tracing::debug!(container = name, idx, href, "tile link not recognised");
            continue;
        };

        // An earlier container (or tile) already supplied this type.
        if found.contains_key(&quote_type) {
            continue;
        }

        match read_tile(tile, quote_type) {
            Some(quote) => {
                tracing::info!(
                    container = name,
                    idx,
                    quote_type = quote_type.as_str(),
                    title = %element_text(link),
                    ?quote,
                    "quote tile extracted"
                );
                found.insert(quote_type, quote);
                added += 1;
            }
            None => {
                tracing::debug!(
                    container = name,
                    idx,
                    quote_type = quote_type.as_str(),
                    "quote tile had no usable values"
                );
            }
        }
    }
    added
}

fn read_tile(tile: ElementRef<'_>, quote_type: QuoteType) -> Option<Quote> {
    let buy = first_amount(tile, &TILE.buy).unwrap_or_default();
    let sell = first_amount(tile, &TILE.sell).unwrap_or_default();

    if quote_type == QuoteType::Tarjeta {
        // Tarjeta often shows a lone value without buy/sell columns.
        if buy.is_zero() && sell.is_zero() {
            return first_amount(tile, &TILE.value).map(Quote::single);
        }
        let value = if sell > Decimal::ZERO { sell } else { buy };
        return Some(Quote::single(value));
    }

    if buy > Decimal::ZERO || sell > Decimal::ZERO {
        Some(Quote::pair(buy, sell))
    } else {
        None
    }
}

fn first_amount(tile: ElementRef<'_>, selector: &Selector) -> Option<Decimal> {
    let element = tile.select(selector).next()?;
    parse_amount(&element_text(element))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
