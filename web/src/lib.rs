//! Axum host for the Vellox adapter.
//!
//! The adapter is strictly synchronous; this crate puts it behind an async
//! HTTP server. Every inbound request is read in full, handed to
//! [`Adapter::call`](vellox_runtime::Adapter::call) on tokio's blocking pool,
//! and the returned response is written back with base64 bodies decoded.
//!
//! # Request Flow
//!
//! ```text
//! ┌──────────────┐   read body    ┌─────────────────┐  spawn_blocking  ┌─────────┐
//! │ http::Request│ ─────────────► │ vellox Request  │ ───────────────► │ Adapter │
//! └──────────────┘                └─────────────────┘                  └────┬────┘
//!        ▲                                                                  │
//!        │             decode base64, copy headers                          ▼
//! ┌──────┴────────┐ ◄──────────────────────────────────────────── ┌────────────────┐
//! │ http::Response│                                               │ vellox Response│
//! └───────────────┘                                               └────────────────┘
//! ```
//!
//! Failed calls become a JSON error body `{"code", "message"}`: `503` when
//! a strict lifespan startup failed, `500` otherwise.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vellox_runtime::Adapter;
//!
//! let adapter = Arc::new(Adapter::builder(app).lifespan("on").build()?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!
//! vellox_web::serve(listener, adapter, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! ```

/// Request/response conversion
pub mod convert;

/// Error type for the host
pub mod error;

/// Router and server
pub mod router;

// Re-export key types for convenience
pub use error::ServeError;
pub use router::{DEFAULT_BODY_LIMIT, router, router_with_body_limit, serve};
