//! # Vellox Testing
//!
//! Testing utilities for code built on the Vellox adapter.
//!
//! This crate provides:
//! - Managed applications with known behavior ([`apps`])
//! - A Given-When-Then runner for single conversations ([`ConversationTest`])
//! - Log capture for asserting on `tracing` output ([`LogCapture`])
//! - proptest strategies for request parts ([`properties`])
//!
//! ## Example
//!
//! ```ignore
//! use vellox_runtime::{Adapter, Request};
//! use vellox_testing::apps::{LifespanProbe, json_app};
//!
//! let probe = LifespanProbe::new();
//! let adapter = Adapter::builder(probe.wrap(json_app(&json!({"Hello": "World"}))))
//!     .lifespan("on")
//!     .build()?;
//!
//! adapter.call(Request::new("GET", "/"))?;
//! adapter.shutdown();
//! assert_eq!(probe.startups(), 1);
//! ```

/// Managed applications for tests
pub mod apps;


/// Log capture
pub mod logs;

/// Property-based testing strategies
pub mod properties;

// Re-export commonly used items
pub use apps::LifespanProbe;
pub use conversation_test::{ConversationTest, assertions};
pub use logs::LogCapture;
