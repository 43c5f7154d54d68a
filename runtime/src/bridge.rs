//! Run cooperative application logic from inside a plain blocking call.
//!
//! A [`Bridge`] owns a single-threaded tokio runtime. The application is
//! spawned onto it as one task and only makes progress while the owner is
//! inside [`Bridge::block_on`]; between calls the task stays parked, which is
//! what lets the lifespan conversation span the separate `start` and `stop`
//! calls. The only suspension points are channel receives.
//!
//! # Flow
//!
//! ```text
//! caller ── block_on ──► Conversation::next() ──► Step::Message(..)
//!                               │                  Step::Exited(outcome)
//!                               ▼
//!                        application task
//! ```
//!
//! A bridge must not be driven from inside another runtime's async context;
//! async hosts hand the call to a blocking pool first.

use crate::error::{ApplicationFault, BridgeError};
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use vellox_core::{AppResult, Channel, ChannelClosed, Message, Scope, SharedApplication, channel};

/// Execution context for one conversation.
#[derive(Debug)]
pub struct Bridge {
    runtime: Option<Runtime>,
}

impl Bridge {
    /// Build a fresh execution context.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if the runtime cannot be created.
    pub fn new() -> Result<Self, BridgeError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn runtime(&self) -> Result<&Runtime, BridgeError> {
        self.runtime.as_ref().ok_or(BridgeError::ShutDown)
    }

    /// Start `app` for the conversation described by `scope`.
    ///
    /// The application does not run until the caller blocks on the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ShutDown`] if the runtime was already released.
    pub fn spawn(&self, app: &SharedApplication, scope: Scope) -> Result<Conversation, BridgeError> {
        let runtime = self.runtime()?;
        let (channel, receive, send) = channel();

        // Apps may touch the runtime while building their future.
        let _guard = runtime.enter();
        let task = runtime.spawn(app.call(scope, receive, send));

        Ok(Conversation {
            channel,
            task: Some(task),
            outcome: None,
        })
    }

    /// Block the current thread until `future` completes, driving the
    /// application task alongside it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ShutDown`] if the runtime was already released.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, BridgeError> {
        Ok(self.runtime()?.block_on(future))
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Never blocks, so a bridge may be dropped from any context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// What the application did next.
#[derive(Debug)]
pub enum Step {
    /// The application sent a message
    Message(Message),
    /// The application finished; all of its messages were already yielded
    Exited(Result<(), ApplicationFault>),
}

/// Adapter side of one running conversation.
#[derive(Debug)]
pub struct Conversation {
    channel: Channel,
    task: Option<JoinHandle<AppResult>>,
    outcome: Option<Result<(), ApplicationFault>>,
}

impl Conversation {
    /// Queue a message for the application.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelClosed`] if the application no longer listens.
    pub fn push(&self, message: Message) -> Result<(), ChannelClosed> {
        self.channel.push(message)
    }

    /// Stop delivering inbound messages; pending receives fail.
    pub fn close(&mut self) {
        self.channel.close();
    }

    /// Whether the application task is still running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for the next message or for the application to finish.
    ///
    /// Messages queued before the application finished are always yielded
    /// before [`Step::Exited`].
    pub async fn next(&mut self) -> Step {
        if let Some(task) = self.task.as_mut() {
            let joined = tokio::select! {
                biased;
                Some(message) = self.channel.recv() => return Step::Message(message),
                joined = task => joined,
            };
            self.task = None;
            self.outcome = Some(match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(error)) => Err(ApplicationFault::Raised(error)),
                Err(join_error) => Err(ApplicationFault::from(join_error)),
            });
        }

        if let Some(message) = self.channel.try_recv() {
            return Step::Message(message);
        }
        Step::Exited(self.outcome.take().unwrap_or(Ok(())))
    }

    /// Let the application run to its end, discarding anything it still sends.
    ///
    /// # Errors
    ///
    /// Returns the [`ApplicationFault`] if the application ends abnormally.
    pub async fn finish(&mut self) -> Result<(), ApplicationFault> {
        loop {
            match self.next().await {
                Step::Message(message) => {
                    tracing::trace!(kind = message.kind(), "Ignoring message after conversation completed");
                },
                Step::Exited(outcome) => return outcome,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vellox_core::{AppState, LifespanScope, application_fn};

    fn lifespan_scope() -> Scope {
        Scope::Lifespan(LifespanScope::new(AppState::new()))
    }

    #[test]
    fn test_messages_then_exit() {
        let app: SharedApplication = Arc::new(application_fn(|_scope, _receive, send| async move {
            send.send(Message::LifespanStartupComplete)?;
            send.send(Message::LifespanShutdownComplete)?;
            Ok(())
        }));

        let bridge = Bridge::new().unwrap();
        let mut conversation = bridge.spawn(&app, lifespan_scope()).unwrap();

        bridge
            .block_on(async {
                assert!(matches!(
                    conversation.next().await,
                    Step::Message(Message::LifespanStartupComplete)
                ));
                assert!(matches!(
                    conversation.next().await,
                    Step::Message(Message::LifespanShutdownComplete)
                ));
                assert!(matches!(conversation.next().await, Step::Exited(Ok(()))));
            })
            .unwrap();
        assert!(!conversation.is_running());
    }

    #[test]
    fn test_application_error_is_reported() {
        let app: SharedApplication = Arc::new(application_fn(|_scope, _receive, _send| async move {
            anyhow::bail!("startup exploded")
        }));

        let bridge = Bridge::new().unwrap();
        let mut conversation = bridge.spawn(&app, lifespan_scope()).unwrap();

        let step = bridge.block_on(conversation.next()).unwrap();
        match step {
            Step::Exited(Err(ApplicationFault::Raised(error))) => {
                assert_eq!(error.to_string(), "startup exploded");
            },
            other => unreachable!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_application_panic_is_caught() {
        #[allow(clippy::panic)]
        fn explode() -> AppResult {
            panic!("handler panicked")
        }

        let app: SharedApplication =
            Arc::new(application_fn(|_scope, _receive, _send| async move { explode() }));

        let bridge = Bridge::new().unwrap();
        let mut conversation = bridge.spawn(&app, lifespan_scope()).unwrap();

        let step = bridge.block_on(conversation.next()).unwrap();
        assert!(matches!(
            step,
            Step::Exited(Err(ApplicationFault::Panicked(ref message))) if message == "handler panicked"
        ));
    }

    #[test]
    fn test_task_stays_parked_between_calls() {
        let app: SharedApplication = Arc::new(application_fn(|_scope, mut receive, send| async move {
            loop {
                match receive.recv().await? {
                    Message::LifespanStartup => send.send(Message::LifespanStartupComplete)?,
                    Message::LifespanShutdown => {
                        send.send(Message::LifespanShutdownComplete)?;
                        return Ok(());
                    },
                    _ => {},
                }
            }
        }));

        let bridge = Bridge::new().unwrap();
        let mut conversation = bridge.spawn(&app, lifespan_scope()).unwrap();

        conversation.push(Message::LifespanStartup).unwrap();
        let first = bridge.block_on(conversation.next()).unwrap();
        assert!(matches!(first, Step::Message(Message::LifespanStartupComplete)));
        assert!(conversation.is_running());

        conversation.push(Message::LifespanShutdown).unwrap();
        let second = bridge.block_on(conversation.next()).unwrap();
        assert!(matches!(second, Step::Message(Message::LifespanShutdownComplete)));
        assert!(bridge.block_on(conversation.finish()).unwrap().is_ok());
    }

    #[test]
    fn test_close_fails_pending_receive() {
        let app: SharedApplication = Arc::new(application_fn(|_scope, mut receive, _send| async move {
            receive.recv().await?;
            Ok(())
        }));

        let bridge = Bridge::new().unwrap();
        let mut conversation = bridge.spawn(&app, lifespan_scope()).unwrap();
        conversation.close();

        let outcome = bridge.block_on(conversation.finish()).unwrap();
        assert!(matches!(outcome, Err(ApplicationFault::Raised(_))));
    }
}
