//! Caller-facing response shape.
//!
//! Turns an accumulated [`CycleResult`] into a [`Response`]: excluded headers
//! are dropped and the body is classified as text or binary from the
//! `content-type` the application sent. Binary bodies travel base64 encoded
//! so they survive transports that only carry text.

use crate::http::CycleResult;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use vellox_core::RawHeaders;

/// Media types delivered as text unless configured otherwise.
///
/// An entry ending in `/*` covers its whole top-level type.
pub const DEFAULT_TEXT_MIME_TYPES: [&str; 6] = [
    "text/*",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/vnd.api+json",
    "application/vnd.oai.openapi",
];

/// Response body as handed to the synchronous caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Textual content, kept as characters
    Text(String),
    /// Opaque bytes, base64 encoded (standard alphabet, padded)
    Base64(String),
}

/// Outbound response description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Headers in application order, excluded names removed
    pub headers: RawHeaders,
    /// Text or encoded body
    pub body: ResponseBody,
}

impl Response {
    /// Marshal a finished cycle for the caller.
    ///
    /// The text/binary decision looks at the full header list, so it still
    /// works when `content-type` itself is excluded.
    #[must_use]
    pub fn from_cycle(
        result: CycleResult,
        text_mime_types: &[String],
        exclude_headers: &[String],
    ) -> Self {
        let CycleResult {
            status,
            headers,
            body,
        } = result;

        let content_type = find_header(&headers, "content-type");
        let is_text = content_type
            .and_then(media_type)
            .is_some_and(|media| is_text_mime(&media, text_mime_types));

        let body = encode_body(body, is_text);
        let headers = headers
            .into_iter()
            .filter(|(name, _)| {
                !exclude_headers
                    .iter()
                    .any(|excluded| name.eq_ignore_ascii_case(excluded.as_bytes()))
            })
            .collect();

        Self {
            status,
            headers,
            body,
        }
    }

    /// Whether the body was base64 encoded.
    #[must_use]
    pub const fn is_base64_encoded(&self) -> bool {
        matches!(self.body, ResponseBody::Base64(_))
    }

    /// The body as text, if it was delivered as text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Base64(_) => None,
        }
    }

    /// The original body bytes, decoding base64 if needed.
    ///
    /// # Errors
    ///
    /// Returns [`base64::DecodeError`] if an encoded body is malformed.
    pub fn body_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match &self.body {
            ResponseBody::Text(text) => Ok(text.clone().into_bytes()),
            ResponseBody::Base64(encoded) => STANDARD.decode(encoded),
        }
    }

    /// First value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        find_header(&self.headers, name)
    }

    /// First value of header `name` as UTF-8.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Every value of header `name`, in order.
    #[must_use]
    pub fn header_all(&self, name: &str) -> Vec<&[u8]> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, value)| value.as_slice())
            .collect()
    }
}

fn find_header<'a>(headers: &'a RawHeaders, name: &str) -> Option<&'a [u8]> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
        .map(|(_, value)| value.as_slice())
}

/// Base media type of a `content-type` value: parameters stripped, lower-cased.
#[must_use]
pub fn media_type(content_type: &[u8]) -> Option<String> {
    let value = std::str::from_utf8(content_type).ok()?;
    let base = value.split(';').next()?.trim();
    if base.is_empty() {
        return None;
    }
    Some(base.to_ascii_lowercase())
}

/// Whether `media` is covered by the allow-list.
#[must_use]
pub fn is_text_mime(media: &str, text_mime_types: &[String]) -> bool {
    text_mime_types.iter().any(|allowed| {
        let allowed = allowed.trim().to_ascii_lowercase();
        match allowed.strip_suffix("/*") {
            Some(top_level) => media
                .split_once('/')
                .is_some_and(|(top, _)| top == top_level),
            None => media == allowed,
        }
    })
}

fn encode_body(body: Vec<u8>, is_text: bool) -> ResponseBody {
    if body.is_empty() {
        return ResponseBody::Text(String::new());
    }
    if !is_text {
        return ResponseBody::Base64(STANDARD.encode(body));
    }
    match String::from_utf8(body) {
        Ok(text) => ResponseBody::Text(text),
        Err(err) => ResponseBody::Base64(STANDARD.encode(err.into_bytes())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        DEFAULT_TEXT_MIME_TYPES.iter().map(ToString::to_string).collect()
    }

    fn cycle(content_type: &str, body: &[u8]) -> CycleResult {
        CycleResult {
            status: 200,
            headers: vec![(b"content-type".to_vec(), content_type.as_bytes().to_vec())],
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_media_type_strips_parameters() {
        assert_eq!(
            media_type(b"Text/Plain; charset=utf-8").as_deref(),
            Some("text/plain")
        );
        assert_eq!(media_type(b"  ").as_deref(), None);
    }

    #[test]
    fn test_wildcard_and_exact_matches() {
        let allow = defaults();
        assert!(is_text_mime("text/html", &allow));
        assert!(is_text_mime("application/json", &allow));
        assert!(!is_text_mime("application/json-seq", &allow));
        assert!(!is_text_mime("image/png", &allow));
    }

    #[test]
    fn test_json_is_text() {
        let response = Response::from_cycle(
            cycle("application/json; charset=utf-8", br#"{"Hello":"World"}"#),
            &defaults(),
            &[],
        );
        assert_eq!(response.text(), Some(r#"{"Hello":"World"}"#));
        assert!(!response.is_base64_encoded());
    }

    #[test]
    fn test_octet_stream_is_base64() {
        let bytes = [0_u8, 159, 146, 150, 255];
        let response = Response::from_cycle(cycle("application/octet-stream", &bytes), &defaults(), &[]);

        assert!(response.is_base64_encoded());
        assert_eq!(response.body_bytes().unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_invalid_utf8_text_falls_back_to_base64() {
        let bytes = [0xff_u8, 0xfe];
        let response = Response::from_cycle(cycle("text/plain", &bytes), &defaults(), &[]);
        assert!(response.is_base64_encoded());
        assert_eq!(response.body_bytes().unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_missing_content_type_is_binary() {
        let result = CycleResult {
            status: 200,
            headers: Vec::new(),
            body: b"plain".to_vec(),
        };
        let response = Response::from_cycle(result, &defaults(), &[]);
        assert!(response.is_base64_encoded());
    }

    #[test]
    fn test_empty_body_is_text() {
        let response = Response::from_cycle(cycle("image/png", b""), &defaults(), &[]);
        assert_eq!(response.body, ResponseBody::Text(String::new()));
    }

    #[test]
    fn test_excluded_headers_dropped_after_classification() {
        let mut result = cycle("application/json", b"{}");
        result.headers.push((b"X-Secret".to_vec(), b"1".to_vec()));
        result.headers.push((b"x-secret".to_vec(), b"2".to_vec()));
        result.headers.push((b"set-cookie".to_vec(), b"a=1".to_vec()));

        let excluded = vec!["content-type".to_string(), "x-secret".to_string()];
        let response = Response::from_cycle(result, &defaults(), &excluded);

        assert_eq!(response.text(), Some("{}"));
        assert!(response.header("content-type").is_none());
        assert!(response.header_all("x-secret").is_empty());
        assert_eq!(response.header_str("set-cookie"), Some("a=1"));
    }
}
