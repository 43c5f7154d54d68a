//! Connection scopes: the immutable description of one conversation.
//!
//! A scope is built once by the adapter, handed to the managed application by
//! value and never changed afterwards. All fields are read through getters.

use crate::message::RawHeaders;
use crate::state::AppState;

/// Protocol version advertised in every scope.
pub const PROTOCOL_VERSION: &str = "3.0";

/// Specification version advertised in every scope.
pub const SPEC_VERSION: &str = "2.0";

/// Placeholder client address `(host, port)`.
pub const DEFAULT_CLIENT: (&str, u16) = ("127.0.0.1", 0);

/// Placeholder server address `(host, port)`.
pub const DEFAULT_SERVER: (&str, u16) = ("vellox", 80);

/// Description of one conversation.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Startup/shutdown handshake
    Lifespan(LifespanScope),
    /// One request/response cycle
    Http(HttpScope),
}

impl Scope {
    /// Protocol kind: `"lifespan"` or `"http"`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Lifespan(_) => "lifespan",
            Self::Http(_) => "http",
        }
    }

    /// The shared application state carried by this scope.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        match self {
            Self::Lifespan(scope) => &scope.state,
            Self::Http(scope) => &scope.state,
        }
    }

    /// The HTTP details, if this is an HTTP scope.
    #[must_use]
    pub const fn as_http(&self) -> Option<&HttpScope> {
        match self {
            Self::Http(scope) => Some(scope),
            Self::Lifespan(_) => None,
        }
    }

    /// `(version, spec_version)` of the protocol.
    #[must_use]
    pub const fn protocol(&self) -> (&'static str, &'static str) {
        (PROTOCOL_VERSION, SPEC_VERSION)
    }
}

/// Scope of the lifespan conversation.
#[derive(Debug, Clone)]
pub struct LifespanScope {
    state: AppState,
}

impl LifespanScope {
    /// Create a lifespan scope over `state`.
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    /// The shared application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }
}

/// Scope of one HTTP request/response cycle.
#[derive(Debug, Clone)]
pub struct HttpScope {
    http_version: String,
    method: String,
    scheme: String,
    path: String,
    raw_path: Vec<u8>,
    root_path: String,
    query_string: Vec<u8>,
    headers: RawHeaders,
    client: (String, u16),
    server: (String, u16),
    state: AppState,
}

impl HttpScope {
    /// Start building a scope for `method` on `path`.
    #[must_use]
    pub fn builder(method: impl Into<String>, path: impl Into<String>) -> HttpScopeBuilder {
        let path = path.into();
        HttpScopeBuilder {
            scope: Self {
                http_version: "1.1".to_string(),
                method: method.into().to_ascii_uppercase(),
                scheme: "https".to_string(),
                raw_path: path.clone().into_bytes(),
                path,
                root_path: String::new(),
                query_string: Vec::new(),
                headers: Vec::new(),
                client: (DEFAULT_CLIENT.0.to_string(), DEFAULT_CLIENT.1),
                server: (DEFAULT_SERVER.0.to_string(), DEFAULT_SERVER.1),
                state: AppState::new(),
            },
        }
    }

    /// HTTP version, e.g. `"1.1"`.
    #[must_use]
    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    /// Upper-case request method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URL scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Request path with any base path removed.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path exactly as received, before base path removal.
    #[must_use]
    pub fn raw_path(&self) -> &[u8] {
        &self.raw_path
    }

    /// The base path the adapter is mounted under (`""` at the root).
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Raw query string without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> &[u8] {
        &self.query_string
    }

    /// Request headers in arrival order.
    #[must_use]
    pub fn headers(&self) -> &RawHeaders {
        &self.headers
    }

    /// First value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, value)| value.as_slice())
    }

    /// Client address placeholder.
    #[must_use]
    pub fn client(&self) -> (&str, u16) {
        (&self.client.0, self.client.1)
    }

    /// Server address placeholder.
    #[must_use]
    pub fn server(&self) -> (&str, u16) {
        (&self.server.0, self.server.1)
    }

    /// The shared application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for [`HttpScope`]; the only way to set its fields.
#[derive(Debug)]
pub struct HttpScopeBuilder {
    scope: HttpScope,
}

impl HttpScopeBuilder {
    /// Set the URL scheme.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scope.scheme = scheme.into();
        self
    }

    /// Set the raw query string.
    #[must_use]
    pub fn query_string(mut self, query: impl Into<Vec<u8>>) -> Self {
        self.scope.query_string = query.into();
        self
    }

    /// Set the request headers.
    #[must_use]
    pub fn headers(mut self, headers: RawHeaders) -> Self {
        self.scope.headers = headers;
        self
    }

    /// Set the client address.
    #[must_use]
    pub fn client(mut self, host: impl Into<String>, port: u16) -> Self {
        self.scope.client = (host.into(), port);
        self
    }

    /// Set the server address.
    #[must_use]
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.scope.server = (host.into(), port);
        self
    }

    /// Attach the shared application state.
    #[must_use]
    pub fn state(mut self, state: AppState) -> Self {
        self.scope.state = state;
        self
    }

    /// Mount under `base_path`: strip it from the path and record it as root path.
    ///
    /// A base path of `/` (or empty) leaves the path untouched. The resulting
    /// path always starts with `/`.
    #[must_use]
    pub fn base_path(mut self, base_path: &str) -> Self {
        let base = base_path.trim_end_matches('/');
        if base.is_empty() {
            return self;
        }

        let path = &self.scope.path;
        let matches = path == base
            || path
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('/'));

        if matches {
            let rest = &path[base.len()..];
            self.scope.path = if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            };
            self.scope.root_path = base.to_string();
        }
        self
    }

    /// Finish the scope.
    #[must_use]
    pub fn build(self) -> HttpScope {
        self.scope
    }
}
