// ABOUTME: Release-date normalization from scraped free text to canonical YYYY-MM-DD.
// ABOUTME: Strips ordinal suffixes and tries the month-day-year layouts used by the crawled sites.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::UNKNOWN;

/// Day numbers followed by an English ordinal suffix, e.g. "17th" or "1st".
static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid ordinal regex"));

/// Layouts tried in order. When parsing, `%B` also accepts the abbreviation.
const DATE_PATTERNS: &[&str] = &[
    "%b %d %Y",  // Jan 17 2024 (catalog set pages)
    "%b %d, %Y", // Jan 17, 2024
    "%B %d, %Y", // October 19, 2018 (aggregator detail pages)
    "%B %d %Y",  // October 19 2018
    "%Y-%m-%d",  // already canonical
];

/// Parses a scraped date into a `NaiveDate`.
///
/// Returns `None` for empty input, the unknown sentinel, or any text that does
/// not match one of the accepted layouts.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN) {
        return None;
    }

    let stripped = ORDINAL_RE.replace_all(trimmed, "$1");
    let cleaned = stripped
        .split_whitespace()
        .map(|word| if word.eq_ignore_ascii_case("sept") { "Sep" } else { word })
        .collect::<Vec<_>>()
        .join(" ");

    DATE_PATTERNS
        .iter()
        .find_map(|pat| NaiveDate::parse_from_str(&cleaned, pat).ok())
}

/// Normalizes a scraped date to `YYYY-MM-DD`, or the unknown sentinel.
///
/// Never fails: malformed dates are expected on these sites and must not
/// abort a batch.
pub fn normalize_date(raw: &str) -> String {
    match parse_release_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => {
            if !raw.trim().is_empty() && !raw.trim().eq_ignore_ascii_case(UNKNOWN) {
                tracing::debug!(raw, "unparseable release date");
            }
            UNKNOWN.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_style_with_ordinal() {
        assert_eq!(normalize_date("Jan 17th 2024"), "2024-01-17");
        assert_eq!(normalize_date("Mar 1st 2023"), "2023-03-01");
        assert_eq!(normalize_date("Feb 22nd 2019"), "2019-02-22");
        assert_eq!(normalize_date("Nov 3rd 2017"), "2017-11-03");
    }

    #[test]
    fn aggregator_style_long_month() {
        assert_eq!(normalize_date("October 19, 2018"), "2018-10-19");
        assert_eq!(normalize_date("January 9, 1999"), "1999-01-09");
    }

    #[test]
    fn month_names_containing_suffix_letters_survive() {
        // "August" contains "st" and "Thursday"-like words contain "th";
        // only suffixes glued to day digits are removed.
        assert_eq!(normalize_date("August 21st, 2020"), "2020-08-21");
        assert_eq!(normalize_date("Aug 21st 2020"), "2020-08-21");
        assert_eq!(normalize_date("Sept 13th 2019"), "2019-09-13");
    }

    #[test]
    fn sentinel_and_garbage_map_to_unknown() {
        assert_eq!(normalize_date(UNKNOWN), UNKNOWN);
        assert_eq!(normalize_date("N/A"), UNKNOWN);
        assert_eq!(normalize_date(""), UNKNOWN);
        assert_eq!(normalize_date("Coming soon"), UNKNOWN);
        assert_eq!(normalize_date("Feb 30th 2024"), UNKNOWN);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["Jan 17th 2024", "October 19, 2018", "garbage", UNKNOWN] {
            let once = normalize_date(raw);
            assert_eq!(normalize_date(&once), once);
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(normalize_date("  Jan   17th   2024 \n"), "2024-01-17");
    }
}
