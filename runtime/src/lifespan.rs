//! Startup/shutdown handshake with the managed application.
//!
//! The controller runs at most one lifespan conversation per adapter. The
//! conversation is opened by [`LifespanController::start`] and stays parked on
//! its own execution context until [`LifespanController::stop`] resumes it, so
//! whatever the application set up during startup lives exactly as long as
//! the adapter.
//!
//! # State machine
//!
//! ```text
//! NotStarted ──start──► Starting ──► Started ──stop──► Stopping ──► Stopped
//!                           │                              │
//!                           └──► StartFailed               └──► StopFailed
//! ```

use crate::bridge::{Bridge, Conversation, Step};
use crate::config::LifespanMode;
use crate::error::LifespanError;
use std::future::Future;
use std::time::Duration;
use vellox_core::{AppState, LifespanScope, Message, Scope, SharedApplication};

/// Text of the log record emitted for every absorbed or raised lifespan fault.
pub const LIFESPAN_FAULT_MESSAGE: &str = "Exception in 'lifespan' protocol.";

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifespanState {
    /// `start` has not run yet
    NotStarted,
    /// Waiting for the startup reply
    Starting,
    /// Started, or assumed started when lifespan is off or unsupported
    Started,
    /// Startup failed
    StartFailed,
    /// Waiting for the shutdown reply
    Stopping,
    /// Shutdown finished
    Stopped,
    /// Shutdown failed; the failure was logged
    StopFailed,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Startup,
    Shutdown,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
        }
    }
}

enum Reply {
    Complete,
    Exited,
}

/// A lifespan conversation kept alive between `start` and `stop`.
#[derive(Debug)]
struct LifespanSession {
    conversation: Conversation,
    bridge: Bridge,
}

/// Owns the lifespan conversation of one adapter.
#[derive(Debug)]
pub struct LifespanController {
    mode: LifespanMode,
    timeout: Option<Duration>,
    state: LifespanState,
    supported: bool,
    session: Option<LifespanSession>,
}

impl LifespanController {
    /// Create a controller that has not started yet.
    #[must_use]
    pub const fn new(mode: LifespanMode, timeout: Option<Duration>) -> Self {
        Self {
            mode,
            timeout,
            state: LifespanState::NotStarted,
            supported: false,
            session: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifespanState {
        self.state
    }

    /// Configured mode.
    #[must_use]
    pub const fn mode(&self) -> LifespanMode {
        self.mode
    }

    /// Whether the application completed the startup handshake.
    ///
    /// `false` before startup, when lifespan is off, and when the application
    /// turned out not to speak the protocol.
    #[must_use]
    pub const fn supported(&self) -> bool {
        self.supported
    }

    /// Run the startup handshake once.
    ///
    /// Repeated calls return immediately. Under `auto` and `off` every fault
    /// is logged and absorbed.
    ///
    /// # Errors
    ///
    /// Only when the mode is `on`:
    /// - [`LifespanError::StartupFailed`] if the application reports failure
    /// - [`LifespanError::Unsupported`] if it never engages with the protocol
    /// - [`LifespanError::Application`] if it raises or panics
    /// - [`LifespanError::Timeout`] if it does not answer in time
    /// - [`LifespanError::AlreadyFailed`] on every call after a failed startup
    pub fn start(&mut self, app: &SharedApplication, state: &AppState) -> Result<(), LifespanError> {
        match self.state {
            LifespanState::NotStarted => {},
            LifespanState::StartFailed if self.mode == LifespanMode::On => {
                return Err(LifespanError::AlreadyFailed);
            },
            _ => return Ok(()),
        }

        if self.mode == LifespanMode::Off {
            tracing::debug!("Lifespan is off, application startup skipped");
            self.state = LifespanState::Started;
            return Ok(());
        }

        self.state = LifespanState::Starting;
        tracing::info!("Waiting for application startup.");

        match self.open_session(app, state) {
            Ok(Some(session)) => {
                self.session = Some(session);
                self.supported = true;
                self.state = LifespanState::Started;
                metrics::counter!("vellox.lifespan.startup").increment(1);
                tracing::info!("Application startup complete.");
                Ok(())
            },
            Ok(None) => {
                tracing::info!("ASGI 'lifespan' protocol appears unsupported.");
                if self.mode == LifespanMode::On {
                    self.state = LifespanState::StartFailed;
                    let error = LifespanError::Unsupported;
                    report_fault(&error);
                    return Err(error);
                }
                self.state = LifespanState::Started;
                Ok(())
            },
            Err(error) => {
                self.state = LifespanState::StartFailed;
                report_fault(&error);
                if self.mode == LifespanMode::On {
                    return Err(error);
                }
                Ok(())
            },
        }
    }

    /// Run the shutdown handshake if a startup handshake completed.
    ///
    /// Never fails: shutdown faults are logged and leave the controller in
    /// [`LifespanState::StopFailed`].
    pub fn stop(&mut self) {
        if self.state != LifespanState::Started {
            return;
        }

        let Some(mut session) = self.session.take() else {
            // Off or unsupported: the application was never told it started.
            self.state = LifespanState::Stopped;
            return;
        };

        self.state = LifespanState::Stopping;
        tracing::info!("Waiting for application shutdown.");

        match self.close_session(&mut session) {
            Ok(()) => {
                self.state = LifespanState::Stopped;
                metrics::counter!("vellox.lifespan.shutdown").increment(1);
                tracing::info!("Application shutdown complete.");
            },
            Err(error) => {
                self.state = LifespanState::StopFailed;
                report_fault(&error);
            },
        }
    }

    fn open_session(
        &self,
        app: &SharedApplication,
        state: &AppState,
    ) -> Result<Option<LifespanSession>, LifespanError> {
        let bridge = Bridge::new()?;
        let scope = Scope::Lifespan(LifespanScope::new(state.clone()));
        let mut conversation = bridge.spawn(app, scope)?;

        // A closed inbound side shows up as the application exiting.
        let _ = conversation.push(Message::LifespanStartup);

        let reply = bridge.block_on(within(
            self.timeout,
            Phase::Startup,
            await_reply(&mut conversation, Phase::Startup),
        ))???;

        Ok(match reply {
            Reply::Complete => Some(LifespanSession {
                conversation,
                bridge,
            }),
            Reply::Exited => None,
        })
    }

    fn close_session(&self, session: &mut LifespanSession) -> Result<(), LifespanError> {
        let LifespanSession {
            conversation,
            bridge,
        } = session;

        let _ = conversation.push(Message::LifespanShutdown);

        bridge.block_on(drive_shutdown(conversation, self.timeout))?
    }
}

async fn drive_shutdown(conversation: &mut Conversation, timeout: Option<Duration>) -> Result<(), LifespanError> {
    let reply = within(timeout, Phase::Shutdown, await_reply(conversation, Phase::Shutdown)).await??;
    if matches!(reply, Reply::Exited) {
        tracing::warn!("Application exited without confirming shutdown");
        return Ok(());
    }

    conversation.close();
    match within(timeout, Phase::Shutdown, conversation.finish()).await {
        Ok(Ok(())) => {},
        Ok(Err(fault)) => {
            tracing::debug!(error = %fault, "Application fault after shutdown completed");
        },
        Err(_) => tracing::debug!("Application still running after shutdown completed"),
    }
    Ok(())
}

fn report_fault(error: &LifespanError) {
    metrics::counter!("vellox.lifespan.fault").increment(1);
    tracing::error!(error = %error, "{}", LIFESPAN_FAULT_MESSAGE);
}

async fn await_reply(conversation: &mut Conversation, phase: Phase) -> Result<Reply, LifespanError> {
    match conversation.next().await {
        Step::Message(message) => match (phase, message) {
            (Phase::Startup, Message::LifespanStartupComplete)
            | (Phase::Shutdown, Message::LifespanShutdownComplete) => Ok(Reply::Complete),
            (Phase::Startup, Message::LifespanStartupFailed { message }) => {
                Err(LifespanError::StartupFailed(message))
            },
            (Phase::Shutdown, Message::LifespanShutdownFailed { message }) => {
                Err(LifespanError::ShutdownFailed(message))
            },
            (_, other) => Err(LifespanError::UnexpectedMessage {
                phase: phase.name(),
                received: other.kind(),
            }),
        },
        Step::Exited(Ok(())) => Ok(Reply::Exited),
        Step::Exited(Err(fault)) => Err(fault.into()),
    }
}

async fn within<F: Future>(
    timeout: Option<Duration>,
    phase: Phase,
    future: F,
) -> Result<F::Output, LifespanError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| LifespanError::Timeout(phase.name())),
        None => Ok(future.await),
    }
}
