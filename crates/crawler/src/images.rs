// ABOUTME: Card image URL resolution and placeholder filtering.
// ABOUTME: Resolves relative image sources against a page URL and rejects known stand-in images.

use url::Url;

/// Placeholder images served by the crawled sites before the real scan loads.
pub const DEFAULT_PLACEHOLDER_IMAGES: &[&str] = &[
    "https://www.pokellector.com/images/card-placeholder-small.jpg",
    "https://jp.pokellector.com/images/card-placeholder-small.jpg",
    "https://www.pricecharting.com/images/no-image-available.png",
];

/// Substrings that mark a stand-in picture regardless of host (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "card-placeholder",
    "no-image-available",
    "blank.gif",
    "data:image/gif;base64,r0lgodlhaqabai",
];

/// Resolves a potentially relative image URL against a base URL.
/// Returns None if resolution fails or the input is invalid.
pub fn resolve_image_url(src: &str, base_url: Option<&str>) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }

    // Protocol-relative sources are common on CDN-backed listings
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }

    let base = Url::parse(base_url?).ok()?;
    base.join(src).ok().map(|u| u.to_string())
}

/// Checks whether an image URL is a known placeholder.
pub fn is_placeholder(url: &str, known: &[String]) -> bool {
    let trimmed = url.trim();
    if known.iter().any(|p| p == trimmed) {
        return true;
    }
    let lower = trimmed.to_lowercase();
    PLACEHOLDER_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Resolves `src` and returns it only when it names a real image.
pub fn accept_image(src: &str, base_url: Option<&str>, known: &[String]) -> Option<String> {
    let resolved = resolve_image_url(src, base_url)?;
    if is_placeholder(&resolved, known) {
        return None;
    }
    Some(resolved)
}

/// The default placeholder list as owned strings, for `Options`.
pub fn default_placeholders() -> Vec<String> {
    DEFAULT_PLACEHOLDER_IMAGES
        .iter()
        .map(|s| s.to_string())
        .collect()
}
