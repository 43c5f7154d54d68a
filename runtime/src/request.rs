use vellox_core::{AppState, HttpScope, RawHeaders};

/// Inbound request as handed over by the synchronous caller.
///
/// # Example
///
/// ```
/// use vellox_runtime::Request;
///
/// let request = Request::new("post", "/items?page=2")
///     .with_header("content-type", "application/json")
///     .with_body(br#"{"name":"widget"}"#.to_vec());
///
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.path(), "/items");
/// assert_eq!(request.query_string(), b"page=2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    path: String,
    query_string: Vec<u8>,
    headers: RawHeaders,
    body: Vec<u8>,
}

impl Request {
    /// Create a request. A `?query` suffix on `target` becomes the query string.
    #[must_use]
    pub fn new(method: impl Into<String>, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let path = if path.is_empty() { "/" } else { path };

        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.to_string(),
            query_string: query.as_bytes().to_vec(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set the raw query string, replacing any parsed from the target.
    #[must_use]
    pub fn with_query_string(mut self, query: impl Into<Vec<u8>>) -> Self {
        self.query_string = query.into();
        self
    }

    /// Append one header. Duplicates are kept.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers
            .push((name.as_ref().to_vec(), value.as_ref().to_vec()));
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: RawHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Set the full body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Upper-case method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string.
    #[must_use]
    pub fn query_string(&self) -> &[u8] {
        &self.query_string
    }

    /// Headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &RawHeaders {
        &self.headers
    }

    /// Body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Build the HTTP scope for this request and hand back the body.
    #[must_use]
    pub fn into_scope(self, base_path: &str, state: AppState) -> (HttpScope, Vec<u8>) {
        let scope = HttpScope::builder(self.method, self.path)
            .query_string(self.query_string)
            .headers(self.headers)
            .state(state)
            .base_path(base_path)
            .build();
        (scope, self.body)
    }
}
