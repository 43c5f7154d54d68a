//! The adapter facade: what a synchronous host calls.
//!
//! An [`Adapter`] wraps one managed application. The first call runs the
//! lifespan startup handshake; every call then runs its own HTTP cycle on a
//! fresh execution context. Shutdown is the host's decision and happens only
//! through [`Adapter::shutdown`].
//!
//! Concurrent calls on one adapter are allowed. The lifespan controller sits
//! behind a mutex; cycles share nothing but the application state.

use crate::config::{AdapterConfig, LifespanMode};
use crate::error::{AdapterError, ConfigurationError, LifespanError};
use crate::http::HttpCycle;
use crate::lifespan::{LifespanController, LifespanState};
use crate::request::Request;
use crate::response::Response;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use vellox_core::{AppState, Application, SharedApplication};

/// Synchronous entry point for one managed application.
///
/// # Example
///
/// ```
/// use vellox_core::{Message, application_fn};
/// use vellox_runtime::{Adapter, Request};
///
/// let adapter = Adapter::new(application_fn(|_scope, _receive, send| async move {
///     send.send(Message::response_start(
///         200,
///         vec![(b"content-type".to_vec(), b"text/plain".to_vec())],
///     ))?;
///     send.send(Message::response_body(b"hello".to_vec()))?;
///     Ok(())
/// }));
///
/// let response = adapter.call(Request::new("GET", "/")).unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(response.text(), Some("hello"));
///
/// adapter.shutdown();
/// ```
pub struct Adapter {
    app: SharedApplication,
    config: AdapterConfig,
    state: AppState,
    lifespan: Mutex<LifespanController>,
}

impl Adapter {
    /// Wrap `app` with the default configuration.
    #[must_use]
    pub fn new(app: impl Application) -> Self {
        Self::with_config(app, AdapterConfig::default())
    }

    /// Wrap `app` with an already validated configuration.
    #[must_use]
    pub fn with_config(app: impl Application, config: AdapterConfig) -> Self {
        Self::from_shared(Arc::new(app), config, AppState::new())
    }

    /// Start building an adapter from string arguments.
    #[must_use]
    pub fn builder(app: impl Application) -> AdapterBuilder {
        AdapterBuilder::new(Arc::new(app))
    }

    fn from_shared(app: SharedApplication, config: AdapterConfig, state: AppState) -> Self {
        let lifespan = LifespanController::new(config.lifespan, config.lifespan_timeout);
        Self {
            app,
            config,
            state,
            lifespan: Mutex::new(lifespan),
        }
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The configured lifespan mode.
    #[must_use]
    pub const fn lifespan(&self) -> LifespanMode {
        self.config.lifespan
    }

    /// The state shared with every scope this adapter builds.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Replace the contents of the shared state.
    ///
    /// Scopes already handed out see the new contents too.
    pub fn set_state(&self, values: Map<String, Value>) {
        self.state.replace(values);
    }

    /// Where the lifespan handshake stands.
    #[must_use]
    pub fn lifespan_state(&self) -> LifespanState {
        self.controller().state()
    }

    // Controller transitions are plain assignments, a panic mid-call leaves a valid state.
    fn controller(&self) -> MutexGuard<'_, LifespanController> {
        self.lifespan.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the startup handshake if it has not run yet.
    ///
    /// # Errors
    ///
    /// Returns [`LifespanError`] only when lifespan is `on` and startup failed.
    #[tracing::instrument(skip(self), fields(mode = %self.config.lifespan))]
    pub fn startup(&self) -> Result<(), LifespanError> {
        self.controller().start(&self.app, &self.state)
    }

    /// Run the shutdown handshake. Faults are logged, never returned.
    #[tracing::instrument(skip(self), fields(mode = %self.config.lifespan))]
    pub fn shutdown(&self) {
        self.controller().stop();
    }

    /// Handle one request: startup if needed, then the request's cycle.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::Lifespan`] if lifespan is `on` and startup failed;
    ///   the request is not run
    /// - [`AdapterError::Cycle`] if the request's own cycle failed
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub fn call(&self, request: Request) -> Result<Response, AdapterError> {
        self.startup()?;
        self.handle(request)
    }

    /// Run the request's cycle without touching the lifespan.
    ///
    /// Lets a host serve requests even after a strict startup failed.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Cycle`] if the cycle failed.
    pub fn handle(&self, request: Request) -> Result<Response, AdapterError> {
        let (scope, body) = request.into_scope(&self.config.base_path, self.state.clone());
        let result = HttpCycle::new(scope, body).run(&self.app)?;
        Ok(Response::from_cycle(
            result,
            &self.config.text_mime_types,
            &self.config.exclude_headers,
        ))
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("lifespan", &self.lifespan)
            .finish_non_exhaustive()
    }
}

/// Builder accepting loosely typed arguments, validated by [`AdapterBuilder::build`].
///
/// # Example
///
/// ```
/// use vellox_core::application_fn;
/// use vellox_runtime::Adapter;
///
/// let app = application_fn(|_scope, _receive, _send| async move { Ok(()) });
///
/// let err = Adapter::builder(app).lifespan("sometimes").build().unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "Invalid argument supplied for `lifespan`. Choices are: auto|on|off"
/// );
/// ```
pub struct AdapterBuilder {
    app: SharedApplication,
    lifespan: Option<String>,
    config: AdapterConfig,
    state: Map<String, Value>,
}

impl AdapterBuilder {
    fn new(app: SharedApplication) -> Self {
        Self {
            app,
            lifespan: None,
            config: AdapterConfig::default(),
            state: Map::new(),
        }
    }

    /// Lifespan mode: `auto`, `on` or `off`.
    #[must_use]
    pub fn lifespan(mut self, mode: impl Into<String>) -> Self {
        self.lifespan = Some(mode.into());
        self
    }

    /// Path prefix the application is mounted under.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.config.base_path = base_path.into();
        self
    }

    /// Media types delivered as text.
    #[must_use]
    pub fn text_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_text_mime_types(types);
        self
    }

    /// Response headers to drop.
    #[must_use]
    pub fn exclude_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_exclude_headers(headers);
        self
    }

    /// Initial application state.
    #[must_use]
    pub fn state(mut self, state: Map<String, Value>) -> Self {
        self.state = state;
        self
    }

    /// Bound each lifespan handshake.
    #[must_use]
    pub const fn lifespan_timeout(mut self, timeout: Duration) -> Self {
        self.config.lifespan_timeout = Some(timeout);
        self
    }

    /// Validate the arguments and build the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the lifespan mode is not one of the choices.
    pub fn build(self) -> Result<Adapter, ConfigurationError> {
        let mut config = self.config;
        if let Some(mode) = self.lifespan {
            config.lifespan = mode.parse()?;
        }

        tracing::debug!(
            lifespan = %config.lifespan,
            base_path = %config.base_path,
            "Adapter configured"
        );

        Ok(Adapter::from_shared(self.app, config, AppState::from_map(self.state)))
    }
}

impl fmt::Debug for AdapterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBuilder")
            .field("lifespan", &self.lifespan)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use vellox_core::{Message, application_fn};

    fn noop() -> impl Application {
        application_fn(|_scope, _receive, _send| async move { Ok(()) })
    }

    #[test]
    fn test_default_settings() {
        let adapter = Adapter::new(noop());

        assert_eq!(adapter.lifespan(), LifespanMode::Auto);
        assert_eq!(adapter.config().base_path, "/");
        assert!(adapter.config().exclude_headers.is_empty());
        assert!(adapter.state().is_empty());
        assert_eq!(adapter.lifespan_state(), LifespanState::NotStarted);
    }

    #[test]
    fn test_builder_validates_lifespan() {
        let err = Adapter::builder(noop()).lifespan("unknown").build().unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid argument supplied for `lifespan`. Choices are: auto|on|off"
        );

        let adapter = Adapter::builder(noop()).lifespan("off").build().unwrap();
        assert_eq!(adapter.lifespan(), LifespanMode::Off);
    }

    #[test]
    fn test_state_constructor_and_setter() {
        let mut initial = Map::new();
        initial.insert("name".to_string(), json!("billy"));

        let adapter = Adapter::builder(noop()).state(initial.clone()).build().unwrap();
        assert_eq!(*adapter.state(), initial);

        let handle = adapter.state().clone();
        let mut replaced = Map::new();
        replaced.insert("age".to_string(), json!(20));
        adapter.set_state(replaced.clone());

        assert_eq!(handle, replaced);
    }

    #[test]
    fn test_cycle_error_surfaces() {
        let adapter = Adapter::builder(noop()).lifespan("off").build().unwrap();
        let err = adapter.call(Request::new("GET", "/")).unwrap_err();
        assert!(matches!(err, AdapterError::Cycle(_)));
    }

    #[test]
    fn test_base_path_reaches_application() {
        let adapter = Adapter::builder(application_fn(|scope, _receive, send| async move {
            let path = scope.as_http().map(|http| http.path().to_string()).unwrap_or_default();
            send.send(Message::response_start(
                200,
                vec![(b"content-type".to_vec(), b"text/plain".to_vec())],
            ))?;
            send.send(Message::response_body(path.into_bytes()))?;
            Ok(())
        }))
        .lifespan("off")
        .base_path("/prod")
        .build()
        .unwrap();

        let response = adapter.call(Request::new("GET", "/prod/users")).unwrap();
        assert_eq!(response.text(), Some("/users"));
    }
}
