//! Protocol messages exchanged between the adapter and a managed application.
//!
//! Every message has a `type` naming its kind plus kind-specific fields. On the
//! Rust side a message is a tagged variant, so a message missing a required
//! field cannot be constructed. [`Message::from_value`] is the boundary for
//! dynamically built messages (JSON-like mappings): unknown kinds and missing
//! required fields are rejected there.
//!
//! # Example
//!
//! ```
//! use vellox_core::message::Message;
//! use serde_json::json;
//!
//! let message = Message::from_value(json!({
//!     "type": "http.response.start",
//!     "status": 200,
//! }))
//! .unwrap();
//!
//! assert_eq!(message.kind(), "http.response.start");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered header list: `(name, value)` byte pairs, duplicates preserved.
pub type RawHeaders = Vec<(Vec<u8>, Vec<u8>)>;

/// Errors raised when a dynamic mapping is turned into a [`Message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The mapping has no string `type` field
    #[error("Message is missing the `type` field")]
    MissingType,

    /// The `type` field names no known message kind
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// The kind is known but its fields are invalid or incomplete
    #[error("Invalid '{kind}' message: {reason}")]
    InvalidFields {
        /// The message kind
        kind: String,
        /// What was wrong with the fields
        reason: String,
    },
}

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Adapter → application: the application should run its startup logic
    #[serde(rename = "lifespan.startup")]
    LifespanStartup,

    /// Application → adapter: startup finished
    #[serde(rename = "lifespan.startup.complete")]
    LifespanStartupComplete,

    /// Application → adapter: startup failed
    #[serde(rename = "lifespan.startup.failed")]
    LifespanStartupFailed {
        /// Failure description
        #[serde(default)]
        message: String,
    },

    /// Adapter → application: the application should run its shutdown logic
    #[serde(rename = "lifespan.shutdown")]
    LifespanShutdown,

    /// Application → adapter: shutdown finished
    #[serde(rename = "lifespan.shutdown.complete")]
    LifespanShutdownComplete,

    /// Application → adapter: shutdown failed
    #[serde(rename = "lifespan.shutdown.failed")]
    LifespanShutdownFailed {
        /// Failure description
        #[serde(default)]
        message: String,
    },

    /// Adapter → application: (a chunk of) the inbound request body
    #[serde(rename = "http.request")]
    HttpRequest {
        /// Body bytes
        #[serde(default)]
        body: Vec<u8>,
        /// Whether more body chunks follow
        #[serde(default)]
        more_body: bool,
    },

    /// Application → adapter: status line and headers
    #[serde(rename = "http.response.start")]
    HttpResponseStart {
        /// HTTP status code
        status: u16,
        /// Response headers
        #[serde(default)]
        headers: RawHeaders,
    },

    /// Application → adapter: (a chunk of) the response body
    #[serde(rename = "http.response.body")]
    HttpResponseBody {
        /// Body bytes
        #[serde(default)]
        body: Vec<u8>,
        /// Whether more body chunks follow
        #[serde(default)]
        more_body: bool,
    },

    /// Adapter → application: the client is gone, no more request data
    #[serde(rename = "http.disconnect")]
    HttpDisconnect,
}

/// Every wire name [`Message`] understands.
pub const MESSAGE_KINDS: [&str; 10] = [
    "lifespan.startup",
    "lifespan.startup.complete",
    "lifespan.startup.failed",
    "lifespan.shutdown",
    "lifespan.shutdown.complete",
    "lifespan.shutdown.failed",
    "http.request",
    "http.response.start",
    "http.response.body",
    "http.disconnect",
];

impl Message {
    /// The wire name of this message's kind (the `type` field).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LifespanStartup => "lifespan.startup",
            Self::LifespanStartupComplete => "lifespan.startup.complete",
            Self::LifespanStartupFailed { .. } => "lifespan.startup.failed",
            Self::LifespanShutdown => "lifespan.shutdown",
            Self::LifespanShutdownComplete => "lifespan.shutdown.complete",
            Self::LifespanShutdownFailed { .. } => "lifespan.shutdown.failed",
            Self::HttpRequest { .. } => "http.request",
            Self::HttpResponseStart { .. } => "http.response.start",
            Self::HttpResponseBody { .. } => "http.response.body",
            Self::HttpDisconnect => "http.disconnect",
        }
    }

    /// Build a response start message.
    #[must_use]
    pub const fn response_start(status: u16, headers: RawHeaders) -> Self {
        Self::HttpResponseStart { status, headers }
    }

    /// Build a final (non-continued) response body message.
    #[must_use]
    pub fn response_body(body: impl Into<Vec<u8>>) -> Self {
        Self::HttpResponseBody {
            body: body.into(),
            more_body: false,
        }
    }

    /// Build a response body chunk that announces more chunks.
    #[must_use]
    pub fn response_chunk(body: impl Into<Vec<u8>>) -> Self {
        Self::HttpResponseBody {
            body: body.into(),
            more_body: true,
        }
    }

    /// Parse a dynamic mapping into a message.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MissingType`] if there is no string `type` field
    /// - [`ProtocolError::UnknownType`] if the kind is not one of [`MESSAGE_KINDS`]
    /// - [`ProtocolError::InvalidFields`] if a required field is missing or mistyped
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();

        if !MESSAGE_KINDS.contains(&kind.as_str()) {
            return Err(ProtocolError::UnknownType(kind));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidFields {
            kind,
            reason: e.to_string(),
        })
    }

    /// Convert into a dynamic mapping (the inverse of [`Message::from_value`]).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFields`] if serialization fails.
    pub fn to_value(&self) -> Result<serde_json::Value, ProtocolError> {
        serde_json::to_value(self).map_err(|e| ProtocolError::InvalidFields {
            kind: self.kind().to_string(),
            reason: e.to_string(),
        })
    }
}
