//! Axum router that forwards every request to an [`Adapter`].

use crate::convert::{request_from_http, response_to_http};
use crate::error::ServeError;
use axum::Router;
use axum::extract::{Request, State};
use axum::response::Response;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use vellox_runtime::Adapter;

/// Largest inbound body read by default (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone)]
struct HostState {
    adapter: Arc<Adapter>,
    body_limit: usize,
}

/// Router whose fallback hands every request to `adapter`.
///
/// # Example
///
/// ```ignore
/// let adapter = Arc::new(Adapter::builder(app).lifespan("on").build()?);
/// let app = vellox_web::router(Arc::clone(&adapter));
/// axum::serve(listener, app).await?;
/// ```
pub fn router(adapter: Arc<Adapter>) -> Router {
    router_with_body_limit(adapter, DEFAULT_BODY_LIMIT)
}

/// [`router`] with a custom inbound body limit.
pub fn router_with_body_limit(adapter: Arc<Adapter>, body_limit: usize) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(HostState {
            adapter,
            body_limit,
        })
}

/// Serve `adapter` on `listener` until `signal` resolves, then run its shutdown handshake.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(listener: TcpListener, adapter: Arc<Adapter>, signal: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "Serving adapter");

    let served = axum::serve(listener, router(Arc::clone(&adapter)))
        .with_graceful_shutdown(signal)
        .await;

    // The lifespan conversation blocks while it winds down.
    if let Err(err) = tokio::task::spawn_blocking(move || adapter.shutdown()).await {
        tracing::error!(error = %err, "Adapter shutdown did not complete");
    }

    served
}

async fn dispatch(State(host): State<HostState>, request: Request) -> Result<Response, ServeError> {
    let request = request_from_http(request, host.body_limit).await?;
    let adapter = Arc::clone(&host.adapter);

    // The adapter blocks the calling thread for the whole cycle.
    let response = tokio::task::spawn_blocking(move || adapter.call(request)).await??;

    response_to_http(&response)
}
