//! # Vellox Core
//!
//! Protocol types shared by the Vellox adapter and the applications it drives.
//!
//! The adapter lets an application written against an asynchronous
//! message-passing interface (`scope`, `receive`, `send`) be invoked from a
//! plain synchronous request/response call. This crate holds the vocabulary
//! of that conversation; the execution machinery lives in `vellox-runtime`.
//!
//! ## Core Concepts
//!
//! - **Message**: one protocol message, a tagged variant keyed by its `type`
//! - **Scope**: immutable description of one conversation (`lifespan` or `http`)
//! - **`AppState`**: mapping shared by reference across all conversations of an adapter
//! - **Channel**: ordered exchange of messages in each direction
//! - **Application**: the callable `(scope, receive, send)` being adapted

pub mod application;
pub mod channel;
pub mod message;
pub mod scope;
pub mod state;

// Re-export commonly used types
pub use application::{AppResult, Application, SharedApplication, application_fn};
pub use channel::{Channel, ChannelClosed, Receive, Sender, channel};
pub use message::{Message, ProtocolError, RawHeaders};
pub use scope::{HttpScope, HttpScopeBuilder, LifespanScope, Scope};
pub use state::AppState;
