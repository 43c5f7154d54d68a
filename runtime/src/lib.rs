//! # Vellox Runtime
//!
//! Adapter engine that lets an asynchronous scope/receive/send application be
//! called from a strictly synchronous, single-shot request/response caller.
//!
//! ## Core Components
//!
//! - **Bridge**: runs the application's cooperative logic inside a blocking call
//! - **Lifespan Controller**: startup/shutdown handshake, honoring `auto`/`on`/`off`
//! - **HTTP Cycle**: one request in, one accumulated response out
//! - **Adapter**: the composition point the host calls
//!
//! ## Example
//!
//! ```ignore
//! use vellox_runtime::{Adapter, Request};
//!
//! let adapter = Adapter::builder(my_app).lifespan("on").build()?;
//!
//! let response = adapter.call(Request::new("GET", "/"))?;
//! assert_eq!(response.status, 200);
//!
//! // When the host tears the adapter down
//! adapter.shutdown();
//! ```

/// Synchronous-to-asynchronous execution bridge
pub mod bridge;

/// Adapter configuration and lifespan mode
pub mod config;

/// The adapter facade
pub mod adapter;

/// One HTTP request/response conversation
pub mod http;

/// Startup/shutdown handshake
pub mod lifespan;

/// Inbound request description
pub mod request;

/// Outbound response description and text/binary classification
pub mod response;

/// Error types for the adapter engine
pub mod error {
    use thiserror::Error;

    /// Invalid construction argument.
    ///
    /// Raised synchronously while building an adapter and never retried.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("{0}")]
    pub struct ConfigurationError(String);

    impl ConfigurationError {
        /// An argument outside its fixed set of choices.
        #[must_use]
        pub fn invalid_choice(argument: &str, choices: &[&str]) -> Self {
            Self(format!(
                "Invalid argument supplied for `{argument}`. Choices are: {}",
                choices.join("|")
            ))
        }

        /// The human readable message.
        #[must_use]
        pub fn message(&self) -> &str {
            &self.0
        }
    }

    /// Failure of the execution context itself, not of the application.
    #[derive(Error, Debug)]
    pub enum BridgeError {
        /// The per-conversation runtime could not be built
        #[error("Failed to build execution context: {0}")]
        Runtime(#[from] std::io::Error),

        /// The bridge was used after its runtime was released
        #[error("Execution context already shut down")]
        ShutDown,
    }

    /// Abnormal end of the managed application.
    #[derive(Error, Debug)]
    pub enum ApplicationFault {
        /// The application returned an error
        #[error("Application raised: {0:#}")]
        Raised(anyhow::Error),

        /// The application panicked
        #[error("Application panicked: {0}")]
        Panicked(String),

        /// The application task was cancelled before finishing
        #[error("Application task was cancelled")]
        Cancelled,
    }

    impl From<tokio::task::JoinError> for ApplicationFault {
        fn from(error: tokio::task::JoinError) -> Self {
            if !error.is_panic() {
                return Self::Cancelled;
            }
            let payload = error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Self::Panicked(message)
        }
    }

    /// Failure of the startup/shutdown handshake.
    ///
    /// Fatal under lifespan `on`; logged and absorbed under `auto` and `off`,
    /// and always absorbed during shutdown.
    #[derive(Error, Debug)]
    pub enum LifespanError {
        /// The application answered `lifespan.startup.failed`
        #[error("Lifespan startup failure. {0}")]
        StartupFailed(String),

        /// The application answered `lifespan.shutdown.failed`
        #[error("Lifespan shutdown failure. {0}")]
        ShutdownFailed(String),

        /// The application exited without taking part in the handshake
        #[error("Lifespan protocol unsupported by the application and lifespan is 'on'")]
        Unsupported,

        /// Startup already failed on this adapter and lifespan is `on`
        #[error("Lifespan startup failed earlier and lifespan is 'on'")]
        AlreadyFailed,

        /// The application sent a message that does not belong to the handshake
        #[error("Unexpected '{received}' message during lifespan {phase}")]
        UnexpectedMessage {
            /// `startup` or `shutdown`
            phase: &'static str,
            /// Kind of the offending message
            received: &'static str,
        },

        /// The handshake did not finish within the configured timeout
        #[error("Lifespan {0} timed out")]
        Timeout(&'static str),

        /// The application raised or panicked
        #[error(transparent)]
        Application(#[from] ApplicationFault),

        /// The execution context failed
        #[error(transparent)]
        Bridge(#[from] BridgeError),
    }

    /// Failure of one HTTP cycle. Always fatal to that request only.
    #[derive(Error, Debug)]
    pub enum CycleError {
        /// A message arrived out of protocol order
        #[error("Expected '{expected}' message, received '{received}'")]
        UnexpectedMessage {
            /// Kind the cycle was waiting for
            expected: &'static str,
            /// Kind that actually arrived
            received: &'static str,
        },

        /// The application sent a second `http.response.start`
        #[error("Application sent 'http.response.start' more than once")]
        DuplicateResponseStart,

        /// The application finished without starting a response
        #[error("Application finished without sending 'http.response.start'")]
        NoResponse,

        /// The application raised or panicked mid-cycle
        #[error("Application fault during HTTP cycle: {0}")]
        Application(#[from] ApplicationFault),

        /// The execution context failed
        #[error(transparent)]
        Bridge(#[from] BridgeError),
    }

    /// Anything the adapter facade can return.
    #[derive(Error, Debug)]
    pub enum AdapterError {
        /// Invalid configuration
        #[error(transparent)]
        Configuration(#[from] ConfigurationError),

        /// Startup failed and lifespan is `on`
        #[error(transparent)]
        Lifespan(#[from] LifespanError),

        /// The request's own cycle failed
        #[error(transparent)]
        Cycle(#[from] CycleError),
    }
}

// Re-export for convenience
pub use adapter::{Adapter, AdapterBuilder};
pub use config::{AdapterConfig, LifespanMode};
pub use error::{
    AdapterError, ApplicationFault, BridgeError, ConfigurationError, CycleError, LifespanError,
};
pub use http::{CycleResult, HttpCycle};
pub use lifespan::{LIFESPAN_FAULT_MESSAGE, LifespanController, LifespanState};
pub use request::Request;
pub use response::{DEFAULT_TEXT_MIME_TYPES, Response, ResponseBody};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::error::*;

    #[test]
    fn test_invalid_choice_message() {
        let err = ConfigurationError::invalid_choice("lifespan", &["auto", "on", "off"]);
        assert_eq!(
            err.to_string(),
            "Invalid argument supplied for `lifespan`. Choices are: auto|on|off"
        );
    }

    #[test]
    fn test_panic_payload_is_kept() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let joined = runtime.block_on(async {
            tokio::spawn(async {
                #[allow(clippy::panic)]
                {
                    panic!("boom");
                }
            })
            .await
        });

        let fault = ApplicationFault::from(joined.unwrap_err());
        assert!(matches!(fault, ApplicationFault::Panicked(ref m) if m == "boom"));
    }
}
