//! Display helpers for raw posts.

use crate::PostRecord;
use chrono::{DateTime, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://\S+|www\.\S+|t\.co/\S+").expect("link pattern is valid")
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static UNDERSCORE_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2})_(\d{2})-(\d{2})-(\d{2})")
        .expect("underscore timestamp pattern is valid")
});

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Removes URLs from post text and collapses whitespace.
pub fn strip_links(text: &str) -> String {
    let without_links = LINK_RE.replace_all(text, "");
    WHITESPACE_RE
        .replace_all(&without_links, " ")
        .trim()
        .to_string()
}

/// Renders a post timestamp as `YYYY-MM-DD HH:MM`.
///
/// Accepts RFC 3339, naive ISO date-times and the scraper's
/// `YYYY-MM-DD_HH-MM-SS` form. Anything else is returned untouched.
pub fn format_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.format(DISPLAY_FORMAT).to_string();
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return dt.format(DISPLAY_FORMAT).to_string();
        }
    }

    if let Some(caps) = UNDERSCORE_TIMESTAMP_RE.captures(trimmed) {
        let iso = format!(
            "{}-{}-{}T{}:{}:{}",
            &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
        );
        if let Ok(dt) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S") {
            return dt.format(DISPLAY_FORMAT).to_string();
        }
    }

    raw.to_string()
}

/// Public permalink for a post, or `#` when the id is missing.
pub fn post_url(post: &PostRecord) -> String {
    if post.post_id.trim().is_empty() {
        return "#".to_string();
    }
    format!("https://twitter.com/i/web/status/{}", post.post_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_links() {
        let text = "Bridge collapsed https://t.co/abc123  near  www.example.org/x see t.co/zz now";
        assert_eq!(strip_links(text), "Bridge collapsed near see now");
        assert_eq!(strip_links("HTTPS://EXAMPLE.COM"), "");
    }

    #[test]
    fn test_format_timestamp_variants() {
        assert_eq!(format_timestamp("2025-04-19T14:49:23Z"), "2025-04-19 14:49");
        assert_eq!(format_timestamp("2025-04-19T14:49:23.120"), "2025-04-19 14:49");
        assert_eq!(format_timestamp("2025-04-19_14-49-23"), "2025-04-19 14:49");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp("2025-13-40_99-99-99"), "2025-13-40_99-99-99");
    }

    #[test]
    fn test_post_url() {
        let post = PostRecord::new("1913", "2025-04-19T14:49:23Z");
        assert_eq!(post_url(&post), "https://twitter.com/i/web/status/1913");
        assert_eq!(post_url(&PostRecord::default()), "#");
    }
}
