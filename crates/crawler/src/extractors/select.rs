// ABOUTME: Selector-based helpers for pulling text and attributes out of scraper element trees.
// ABOUTME: All lookups go through the compiled selector cache; invalid selectors simply match nothing.

//! Selector-based field extraction utilities.
//!
//! Key behaviors:
//! - Text is whitespace-normalized; empty text counts as absent.
//! - Attribute values are trimmed; empty values count as absent.
//! - Lookups are scoped to an element, so a document is queried through
//!   `Html::root_element()`.

use scraper::{ElementRef, Selector};

use crate::extractors::compiled::get_or_compile;

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All descendants of `scope` matching `css`, in document order.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match get_or_compile(css) {
        Some(selector) => scope.select(&selector).collect(),
        None => Vec::new(),
    }
}

/// First descendant of `scope` matching `css`.
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = get_or_compile(css)?;
    let first = scope.select(&selector).next();
    first
}

/// Normalized inner text of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Normalized text of the first match, if it is non-empty.
pub fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(scope, css)
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Trimmed, non-empty attribute of an element.
pub fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Text of an element, skipping any text inside descendants matching `exclude_css`.
///
/// Used for price links that wrap a marketplace icon next to the price.
pub fn text_excluding(el: ElementRef<'_>, exclude_css: &str) -> String {
    let exclude: Option<Selector> = get_or_compile(exclude_css);
    let mut parts = Vec::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let excluded = exclude.as_ref().is_some_and(|selector| {
            node.ancestors()
                .take_while(|ancestor| ancestor.id() != el.id())
                .filter_map(ElementRef::wrap)
                .any(|ancestor| selector.matches(&ancestor))
        });
        if !excluded {
            parts.push(&**text);
        }
    }
    normalize_whitespace(&parts.join(" "))
}
