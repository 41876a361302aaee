use chrono::{DateTime, FixedOffset, Utc};

// Buenos Aires has no DST, so a fixed UTC-3 offset is exact.
const ART_OFFSET_SECS: i32 = -3 * 3600;

const ART_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S -03";

pub fn art_offset() -> Option<FixedOffset> {
    FixedOffset::east_opt(ART_OFFSET_SECS)
}

/// Parses an RSS `pubDate` (RFC 2822 with an explicit offset) and renders it in ART.
pub fn normalize_pub_date(raw: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc2822(raw.trim()).ok()?;
    let art = parsed.with_timezone(&art_offset()?);
    Some(art.format(ART_DISPLAY_FORMAT).to_string())
}

/// Wall-clock rendering of a UTC instant in Buenos Aires time.
pub fn format_art(instant: DateTime<Utc>) -> String {
    match art_offset() {
        Some(offset) => instant
            .with_timezone(&offset)
            .format(ART_DISPLAY_FORMAT)
            .to_string(),
        None => instant.to_rfc3339(),
    }
}
