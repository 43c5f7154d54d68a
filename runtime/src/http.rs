//! One HTTP request/response conversation.
//!
//! The cycle sends the whole inbound body as a single `http.request` message
//! and then reads the application's messages in order:
//!
//! ```text
//! Request ──response.start──► Response ──response.body(more_body=false)──► Complete
//!    │                           │  ▲
//!    │                           │  └── response.body(more_body=true)
//!    └── anything else: error    └── second response.start: error
//! ```
//!
//! Once complete the caller gets its result straight away. The application
//! is told the client disconnected and runs to its end on a detached thread;
//! anything it still sends is ignored and a late fault is only logged.

use crate::bridge::{Bridge, Conversation, Step};
use crate::error::CycleError;
use vellox_core::{HttpScope, Message, RawHeaders, Scope, SharedApplication};

/// Accumulated response of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResult {
    /// HTTP status code
    pub status: u16,
    /// Headers as sent, duplicates preserved
    pub headers: RawHeaders,
    /// Body chunks concatenated in arrival order
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Request,
    Response,
    Complete,
}

/// Builds the [`CycleResult`] as messages arrive.
#[derive(Debug)]
struct Accumulator {
    state: CycleState,
    status: u16,
    headers: RawHeaders,
    body: Vec<u8>,
}

impl Accumulator {
    const fn new() -> Self {
        Self {
            state: CycleState::Request,
            status: 0,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn feed(&mut self, message: Message) -> Result<CycleState, CycleError> {
        match (self.state, message) {
            (CycleState::Request, Message::HttpResponseStart { status, headers }) => {
                self.status = status;
                self.headers = headers;
                self.state = CycleState::Response;
            },
            (CycleState::Request, other) => {
                return Err(CycleError::UnexpectedMessage {
                    expected: "http.response.start",
                    received: other.kind(),
                });
            },
            (CycleState::Response, Message::HttpResponseBody { body, more_body }) => {
                self.body.extend_from_slice(&body);
                if !more_body {
                    self.state = CycleState::Complete;
                }
            },
            (CycleState::Response, Message::HttpResponseStart { .. }) => {
                return Err(CycleError::DuplicateResponseStart);
            },
            (CycleState::Response, other) => {
                return Err(CycleError::UnexpectedMessage {
                    expected: "http.response.body",
                    received: other.kind(),
                });
            },
            (CycleState::Complete, other) => {
                tracing::trace!(kind = other.kind(), "Ignoring message after response completed");
            },
        }
        Ok(self.state)
    }

    fn into_result(self) -> Result<CycleResult, CycleError> {
        if self.state == CycleState::Request {
            return Err(CycleError::NoResponse);
        }
        Ok(CycleResult {
            status: self.status,
            headers: self.headers,
            body: self.body,
        })
    }
}

/// One request/response conversation.
#[derive(Debug)]
pub struct HttpCycle {
    scope: HttpScope,
    body: Vec<u8>,
}

impl HttpCycle {
    /// Prepare a cycle for `scope` with the full inbound `body`.
    #[must_use]
    pub const fn new(scope: HttpScope, body: Vec<u8>) -> Self {
        Self { scope, body }
    }

    /// Drive `app` through the cycle on a fresh execution context.
    ///
    /// # Errors
    ///
    /// - [`CycleError::UnexpectedMessage`] / [`CycleError::DuplicateResponseStart`]
    ///   if the application breaks message order
    /// - [`CycleError::NoResponse`] if it finishes without starting a response
    /// - [`CycleError::Application`] if it raises or panics before the response completed
    /// - [`CycleError::Bridge`] if the execution context cannot be built
    pub fn run(self, app: &SharedApplication) -> Result<CycleResult, CycleError> {
        let span = tracing::debug_span!(
            "http_cycle",
            method = %self.scope.method(),
            path = %self.scope.path()
        );
        let _enter = span.enter();

        let result = Self::drive_to_completion(app, self.scope, self.body);
        match &result {
            Ok(cycle) => {
                metrics::counter!("vellox.cycle.completed").increment(1);
                tracing::debug!(status = cycle.status, body_len = cycle.body.len(), "HTTP cycle completed");
            },
            Err(error) => {
                metrics::counter!("vellox.cycle.failed").increment(1);
                tracing::debug!(error = %error, "HTTP cycle failed");
            },
        }
        result
    }

    fn drive_to_completion(
        app: &SharedApplication,
        scope: HttpScope,
        body: Vec<u8>,
    ) -> Result<CycleResult, CycleError> {
        let bridge = Bridge::new()?;
        let mut conversation = bridge.spawn(app, Scope::Http(scope))?;

        // An app that never reads the body is fine; its exit shows up in `next`.
        let _ = conversation.push(Message::HttpRequest {
            body,
            more_body: false,
        });

        let result = bridge.block_on(collect(&mut conversation))??;

        if conversation.is_running() {
            let _ = conversation.push(Message::HttpDisconnect);
            conversation.close();
            detach(bridge, conversation);
        }

        Ok(result)
    }
}

async fn collect(conversation: &mut Conversation) -> Result<CycleResult, CycleError> {
    let mut accumulator = Accumulator::new();

    loop {
        match conversation.next().await {
            Step::Message(message) => {
                if accumulator.feed(message)? == CycleState::Complete {
                    return accumulator.into_result();
                }
            },
            Step::Exited(Ok(())) => {
                if accumulator.state == CycleState::Response {
                    tracing::debug!("Application finished before its final body chunk");
                }
                return accumulator.into_result();
            },
            Step::Exited(Err(fault)) => return Err(CycleError::Application(fault)),
        }
    }
}

/// Let the application finish on its own thread once the response is out.
fn detach(bridge: Bridge, mut conversation: Conversation) {
    let span = tracing::Span::current();

    let spawned = std::thread::Builder::new()
        .name("vellox-cycle-finish".to_string())
        .spawn(move || {
            let _enter = span.enter();
            match bridge.block_on(conversation.finish()) {
                Ok(Ok(())) => tracing::trace!("Application finished after response completed"),
                Ok(Err(fault)) => {
                    tracing::warn!(error = %fault, "Application fault after response completed");
                },
                Err(error) => {
                    tracing::warn!(error = %error, "Application could not finish after response completed");
                },
            }
        });

    // The closure, and with it the bridge, was dropped; the task is cancelled.
    if let Err(error) = spawned {
        tracing::warn!(error = %error, "Could not detach application; remaining work cancelled");
    }
}
