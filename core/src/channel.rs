//! In-process message channel between the adapter and a managed application.
//!
//! One call to [`channel`] creates both directions of a single conversation:
//!
//! ```text
//!            push()                       recv().await
//!  Channel ───────────► inbound queue ───────────────► Receive
//!  (adapter)                                           (application)
//!            recv()                       send()
//!  Channel ◄─────────── outbound queue ◄─────────────── Sender
//! ```
//!
//! Both queues are unbounded; only a handful of messages are ever in flight,
//! so sending never blocks. Ordering within each direction is FIFO.

use crate::message::Message;
use thiserror::Error;
use tokio::sync::mpsc;

/// The other side of the channel has gone away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Message channel closed")]
pub struct ChannelClosed;

/// Create a fresh channel pair for one conversation.
#[must_use]
pub fn channel() -> (Channel, Receive, Sender) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    (
        Channel {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        },
        Receive { rx: inbound_rx },
        Sender { tx: outbound_tx },
    )
}

/// Adapter side: pushes inbound messages, reads outbound ones.
#[derive(Debug)]
pub struct Channel {
    inbound: Option<mpsc::UnboundedSender<Message>>,
    outbound: mpsc::UnboundedReceiver<Message>,
}

impl Channel {
    /// Queue a message for the application.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelClosed`] if the application dropped its [`Receive`]
    /// or the channel was closed.
    pub fn push(&self, message: Message) -> Result<(), ChannelClosed> {
        self.inbound
            .as_ref()
            .ok_or(ChannelClosed)?
            .send(message)
            .map_err(|_| ChannelClosed)
    }

    /// Close the inbound direction. Queued messages are still delivered,
    /// after which [`Receive::recv`] fails.
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Wait for the next message from the application.
    ///
    /// Returns `None` once every [`Sender`] is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Message> {
        self.outbound.recv().await
    }

    /// Take the next message from the application if one is queued.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.outbound.try_recv().ok()
    }
}

/// Application side: awaits inbound messages.
#[derive(Debug)]
pub struct Receive {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Receive {
    /// Wait for the next message from the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelClosed`] if the adapter side is gone and nothing is queued.
    pub async fn recv(&mut self) -> Result<Message, ChannelClosed> {
        self.rx.recv().await.ok_or(ChannelClosed)
    }
}

/// Application side: sends outbound messages.
#[derive(Debug, Clone)]
pub struct Sender {
    tx: mpsc::UnboundedSender<Message>,
}

impl Sender {
    /// Queue a message for the adapter. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelClosed`] if the adapter side is gone.
    pub fn send(&self, message: Message) -> Result<(), ChannelClosed> {
        self.tx.send(message).map_err(|_| ChannelClosed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[test]
    fn test_messages_arrive_in_order() {
        let (mut adapter, mut receive, send) = channel();

        adapter.push(Message::LifespanStartup).unwrap();
        adapter.push(Message::LifespanShutdown).unwrap();
        send.send(Message::response_chunk(b"a".to_vec())).unwrap();
        send.send(Message::response_body(b"b".to_vec())).unwrap();

        block_on(async {
            assert_eq!(receive.recv().await.unwrap(), Message::LifespanStartup);
            assert_eq!(receive.recv().await.unwrap(), Message::LifespanShutdown);
            assert_eq!(
                adapter.recv().await.unwrap(),
                Message::response_chunk(b"a".to_vec())
            );
        });
        assert_eq!(adapter.try_recv(), Some(Message::response_body(b"b".to_vec())));
        assert_eq!(adapter.try_recv(), None);
    }

    #[test]
    fn test_receive_fails_after_adapter_dropped() {
        let (adapter, mut receive, _send) = channel();
        adapter.push(Message::HttpDisconnect).unwrap();
        drop(adapter);

        block_on(async {
            assert_eq!(receive.recv().await.unwrap(), Message::HttpDisconnect);
            assert_eq!(receive.recv().await, Err(ChannelClosed));
        });
    }

    #[test]
    fn test_adapter_sees_end_when_senders_dropped() {
        let (mut adapter, _receive, send) = channel();
        let cloned = send.clone();
        drop(send);
        cloned.send(Message::LifespanStartupComplete).unwrap();
        drop(cloned);

        block_on(async {
            assert_eq!(adapter.recv().await, Some(Message::LifespanStartupComplete));
            assert_eq!(adapter.recv().await, None);
        });
    }

    #[test]
    fn test_close_drains_then_fails() {
        let (mut adapter, mut receive, _send) = channel();
        adapter.push(Message::HttpDisconnect).unwrap();
        adapter.close();

        assert_eq!(adapter.push(Message::HttpDisconnect), Err(ChannelClosed));
        block_on(async {
            assert_eq!(receive.recv().await.unwrap(), Message::HttpDisconnect);
            assert_eq!(receive.recv().await, Err(ChannelClosed));
        });
    }

    #[test]
    fn test_send_fails_after_adapter_dropped() {
        let (adapter, _receive, send) = channel();
        drop(adapter);
        assert_eq!(send.send(Message::HttpDisconnect), Err(ChannelClosed));
    }
}
