//! The managed-application contract.
//!
//! An application is anything callable with `(scope, receive, send)` that
//! returns a future. It talks to the adapter only through the channel halves
//! it is given. Async closures implement [`Application`] directly;
//! [`application_fn`] pins down the argument types so they can be elided:
//!
//! ```
//! use vellox_core::{Application, Message, application_fn};
//!
//! let app = application_fn(|scope, _receive, send| async move {
//!     if scope.kind() == "http" {
//!         send.send(Message::response_start(200, vec![]))?;
//!         send.send(Message::response_body(b"ok".to_vec()))?;
//!     }
//!     Ok(())
//! });
//!
//! fn assert_app(_: &impl Application) {}
//! assert_app(&app);
//! ```

use crate::channel::{Receive, Sender};
use crate::scope::Scope;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Result of running an application for one conversation.
pub type AppResult = anyhow::Result<()>;

/// An application driven through the scope/receive/send protocol.
///
/// The returned future owns everything it needs (`'static`) so the adapter can
/// keep a lifespan conversation alive across separate blocking calls.
pub trait Application: Send + Sync + 'static {
    /// Run one conversation described by `scope`.
    fn call(&self, scope: Scope, receive: Receive, send: Sender) -> BoxFuture<'static, AppResult>;
}

impl<F, Fut> Application for F
where
    F: Fn(Scope, Receive, Sender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult> + Send + 'static,
{
    fn call(&self, scope: Scope, receive: Receive, send: Sender) -> BoxFuture<'static, AppResult> {
        Box::pin(self(scope, receive, send))
    }
}

/// Identity helper that lets closure arguments be inferred as
/// `(Scope, Receive, Sender)`, in the manner of `tower::service_fn`.
pub const fn application_fn<F, Fut>(f: F) -> F
where
    F: Fn(Scope, Receive, Sender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult> + Send + 'static,
{
    f
}

/// Shared, type-erased application.
pub type SharedApplication = Arc<dyn Application>;
