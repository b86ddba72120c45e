// ABOUTME: Plain HTTP page download used by the HTTP driver.
// ABOUTME: Rejects non-HTTP targets, failed statuses and oversized bodies, then decodes the body to text.

use std::collections::HashMap;

use anyhow::anyhow;
use encoding_rs::Encoding;

use crate::error::FetchError;

/// Listing pages are small; anything past this is not a page we can use.
pub const MAX_PAGE_BYTES: usize = 8 * 1024 * 1024;

const OP: &str = "Fetch";

/// Per-session request settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub max_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            max_bytes: MAX_PAGE_BYTES,
        }
    }
}

/// A downloaded page, decoded to UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub html: String,
}

/// GET `url` and decode the body.
///
/// Anything other than a 2xx response is a transient failure; the caller
/// decides whether to retry or skip the page.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchedPage, FetchError> {
    let target = url::Url::parse(url)
        .map_err(|e| FetchError::invalid_url(url, OP, Some(anyhow!("invalid URL: {e}"))))?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(FetchError::invalid_url(
            url,
            OP,
            Some(anyhow!("scheme must be http or https")),
        ));
    }
    let tld = target
        .host_str()
        .and_then(|host| host.rsplit('.').next())
        .map(str::to_ascii_lowercase);

    let mut request = client.get(target);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::timeout(url, OP, Some(anyhow!("request timed out: {e}")))
        } else {
            FetchError::transient(url, OP, Some(anyhow!("request failed: {e}")))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::transient(url, OP, Some(anyhow!("HTTP status {status}"))));
    }
    if response.content_length().is_some_and(|len| len as usize > opts.max_bytes) {
        return Err(too_large(url, opts.max_bytes));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::transient(url, OP, Some(anyhow!("failed to read body: {e}"))))?;
    if body.len() > opts.max_bytes {
        return Err(too_large(url, opts.max_bytes));
    }

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        html: decode_body(&body, content_type.as_deref(), tld.as_deref()),
    })
}

fn too_large(url: &str, max_bytes: usize) -> FetchError {
    FetchError::transient(url, OP, Some(anyhow!("page larger than {max_bytes} bytes")))
}

/// Decode with the declared charset, else guess from the bytes and the host's TLD.
fn decode_body(body: &[u8], content_type: Option<&str>, tld: Option<&str>) -> String {
    let declared = content_type
        .and_then(declared_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = declared.unwrap_or_else(|| {
        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(body, true);
        detector.guess(tld.map(str::as_bytes), true)
    });
    encoding.decode(body).0.into_owned()
}

fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_ascii_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("cardex-test")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_decodes_a_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<div class=\"cardresult\">Pikachu</div>");
        });

        let page = fetch(&client(), &server.url("/search"), &FetchOptions::default())
            .await
            .unwrap();
        mock.assert();
        assert_eq!(page.status, 200);
        assert!(page.html.contains("Pikachu"));
    }

    #[tokio::test]
    async fn error_status_is_transient() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(503).body("busy");
        });

        let err = fetch(&client(), &server.url("/busy"), &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn oversized_page_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/huge");
            then.status(200).body("x".repeat(64));
        });

        let opts = FetchOptions {
            max_bytes: 16,
            ..Default::default()
        };
        let err = fetch(&client(), &server.url("/huge"), &opts).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn non_http_scheme_is_an_invalid_url() {
        let err = fetch(&client(), "ftp://example.com/x", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_invalid_url());
    }

    #[test]
    fn charset_parameter_is_read_case_insensitively() {
        assert_eq!(
            declared_charset("text/html; Charset=Shift_JIS"),
            Some("shift_jis".to_string())
        );
        assert_eq!(
            declared_charset("text/html; charset=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(declared_charset("text/html"), None);
    }

    #[test]
    fn shift_jis_pages_decode() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("ピカチュウ");
        assert_eq!(
            decode_body(&bytes, Some("text/html; charset=shift_jis"), None),
            "ピカチュウ"
        );
    }
}
