// ABOUTME: Process-wide cache of parsed CSS selectors for the configurable extraction rules.
// ABOUTME: Each distinct rule string is parsed once; rules that fail to parse are remembered as unusable.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use scraper::Selector;

/// Rule string -> parsed selector, or `None` when the rule is not valid CSS.
type Cache = HashMap<String, Option<Selector>>;

static SELECTORS: Lazy<RwLock<Cache>> = Lazy::new(RwLock::default);

fn parse(css: &str) -> Option<Selector> {
    let parsed = Selector::parse(css).ok();
    if parsed.is_none() {
        tracing::warn!(selector = css, "extraction rule is not a valid CSS selector, it will match nothing");
    }
    parsed
}

/// The parsed selector for `css`. `None` means the rule never matches.
pub fn get_or_compile(css: &str) -> Option<Selector> {
    let cached = SELECTORS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(css)
        .cloned();
    if let Some(selector) = cached {
        return selector;
    }
    SELECTORS
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .entry(css.to_string())
        .or_insert_with(|| parse(css))
        .clone()
}

/// Parse every rule up front and return the ones that are not valid CSS.
pub fn precompile_selectors<I, S>(selectors: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cache = SELECTORS.write().unwrap_or_else(|e| e.into_inner());
    let mut invalid = Vec::new();
    for css in selectors {
        let css = css.as_ref();
        let entry = cache.entry(css.to_string()).or_insert_with(|| parse(css));
        if entry.is_none() && !invalid.iter().any(|seen| seen == css) {
            invalid.push(css.to_string());
        }
    }
    invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_agree() {
        assert!(get_or_compile("div.cardresult").is_some());
        assert!(get_or_compile("div.cardresult").is_some());
        assert!(get_or_compile("[[[broken").is_none());
        assert!(get_or_compile("[[[broken").is_none());
    }

    #[test]
    fn precompile_reports_invalid_rules_once() {
        let invalid = precompile_selectors([
            "tr[id^='product-']",
            "td.console >",
            "#attribute tr",
            "td.console >",
        ]);
        assert_eq!(invalid, vec!["td.console >".to_string()]);
        assert!(get_or_compile("tr[id^='product-']").is_some());
        assert!(get_or_compile("#attribute tr").is_some());
    }
}
