use crate::domain::news::NewsItem;
use crate::time::art::normalize_pub_date;
use roxmltree::{Document, Node, ParsingOptions};
use scraper::Html;

pub const NEWS_LIMIT: usize = 5;

/// Reads the newest headlines from an RSS feed, in feed order.
///
/// Items without a title or a `pubDate` are skipped and do not count toward the limit. A
/// `pubDate` that is not RFC 2822 is kept verbatim instead of dropping the item.
pub fn extract_news(xml: &str) -> Result<Vec<NewsItem>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)?;

    let mut items = Vec::with_capacity(NEWS_LIMIT);
    let mut seen = 0usize;
    for item in doc.descendants().filter(|n| is_plain_element(n, "item")) {
        if items.len() >= NEWS_LIMIT {
            break;
        }
        seen += 1;

        let title = child_text(item, "title")
            .map(|t| strip_markup(&t))
            .unwrap_or_default();
        let raw_date = child_text(item, "pubDate")
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        if title.is_empty() || raw_date.is_empty() {
            tracing::debug!(idx = seen - 1, "rss item without title or pubDate skipped");
            continue;
        }

        let published_at = match normalize_pub_date(&raw_date) {
            Some(d) => d,
            None => {
                tracing::warn!(pub_date = %raw_date, "unparsable rss pubDate; keeping original text");
                raw_date
            }
        };

        items.push(NewsItem {
            title,
            published_at,
        });
    }

    tracing::info!(items = items.len(), scanned = seen, "rss extraction finished");
    Ok(items)
}

fn is_plain_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace().is_none()
}

fn child_text(item: Node<'_, '_>, name: &str) -> Option<String> {
    let node = item.descendants().find(|n| is_plain_element(n, name))?;
    Some(
        node.descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect(),
    )
}

// Some feeds embed inline HTML in titles.
fn strip_markup(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Ámbito - Economía</title>
    <link>https://www.ambito.com</link>
    {items}
  </channel>
</rss>"#
        )
    }

    fn item(title: &str, date: &str) -> String {
        format!("<item><title><![CDATA[{title}]]></title><pubDate>{date}</pubDate></item>")
    }

    #[test]
    fn caps_at_five_items_in_feed_order() {
        let items: String = (1..=8)
            .map(|i| item(&format!("Noticia {i}"), "Sat, 17 Oct 2026 12:00:00 +0000"))
            .collect();
        let news = extract_news(&feed(&items)).unwrap();

        assert_eq!(news.len(), 5);
        let titles: Vec<_> = news.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Noticia 1", "Noticia 2", "Noticia 3", "Noticia 4", "Noticia 5"]
        );
        assert_eq!(news[0].published_at, "2026-10-17 09:00:00 -03");
    }

    #[test]
    fn keeps_unparsable_dates_verbatim() {
        let items = item("Suba del blue", "ayer a la tarde");
        let news = extract_news(&feed(&items)).unwrap();

        assert_eq!(news.len(), 1);
        assert_eq!(news[0].published_at, "ayer a la tarde");
    }

    #[test]
    fn drops_items_without_title_or_date() {
        let items = [
            "<item><pubDate>Sat, 17 Oct 2026 12:00:00 +0000</pubDate></item>".to_string(),
            "<item><title>Sin fecha</title></item>".to_string(),
            item("   ", "Sat, 17 Oct 2026 12:00:00 +0000"),
            item("Con todo", "Sat, 17 Oct 2026 12:00:00 +0000"),
        ]
        .concat();
        let news = extract_news(&feed(&items)).unwrap();

        assert_eq!(news.len(), 1);
        assert_eq!(news[0].title, "Con todo");
    }

    #[test]
    fn skipped_items_do_not_count_toward_the_limit() {
        let mut items = String::from("<item><title>Sin fecha</title></item>");
        for i in 1..=6 {
            items.push_str(&item(&format!("N{i}"), "Sat, 17 Oct 2026 12:00:00 +0000"));
        }
        let news = extract_news(&feed(&items)).unwrap();

        assert_eq!(news.len(), 5);
        assert_eq!(news[0].title, "N1");
        assert_eq!(news[4].title, "N5");
    }

    #[test]
    fn strips_markup_and_ignores_namespaced_titles() {
        let items = r#"<item>
              <media:content url="x.jpg"><media:title>Foto</media:title></media:content>
              <title><![CDATA[ El <b>dólar</b> hoy ]]></title>
              <pubDate>Sat, 17 Oct 2026 15:45:10 GMT</pubDate>
            </item>"#;
        let news = extract_news(&feed(items)).unwrap();

        assert_eq!(news[0].title, "El dólar hoy");
        assert_eq!(news[0].published_at, "2026-10-17 12:45:10 -03");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(extract_news("<rss><channel><item>").is_err());
        assert!(extract_news("<html>error 502</body>").is_err());
    }

    #[test]
    fn feed_without_items_is_empty() {
        assert!(extract_news(&feed("")).unwrap().is_empty());
    }
}
