//! Mailbox from the HTTP handlers to the background worker.
//!
//! Bounded, many producers, one consumer. Handlers only ever perform a
//! single bounded send; the worker is the only reader.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandId {
    Kill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub id: CommandId,
}

impl CommandMessage {
    pub fn kill() -> Self {
        Self { id: CommandId::Kill }
    }
}

/// Creates the command channel. `capacity` is clamped to at least one slot
/// so a single `kill` is never lost while the worker is busy.
pub fn channel(capacity: usize, send_timeout: Duration) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx, send_timeout }, CommandReceiver { rx })
}

/// Producer side, cloned into the web server state.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<CommandMessage>,
    send_timeout: Duration,
}

impl CommandSender {
    /// Queues `message`, waiting at most the send timeout for a free slot.
    ///
    /// Fails with [`Error::ShuttingDown`] if the worker is gone or the
    /// channel stayed full, which only happens once a shutdown is already queued.
    pub async fn send(&self, message: CommandMessage) -> Result<()> {
        match tokio::time::timeout(self.send_timeout, self.tx.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_closed)) => Err(Error::ShuttingDown),
            Err(_elapsed) => {
                tracing::warn!("Command channel still full after {:?}", self.send_timeout);
                Err(Error::ShuttingDown)
            }
        }
    }
}

/// Consumer side, owned by the background worker.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<CommandMessage>,
}

impl CommandReceiver {
    /// Next command, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<CommandMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_serializes_with_lowercase_id() {
        let json = serde_json::to_string(&CommandMessage::kill()).unwrap();
        assert_eq!(json, r#"{"id":"kill"}"#);
    }

    #[tokio::test]
    async fn zero_capacity_still_buffers_one_command() {
        let (tx, mut rx) = channel(0, Duration::from_millis(50));
        tx.send(CommandMessage::kill()).await.unwrap();
        assert_eq!(rx.recv().await, Some(CommandMessage::kill()));
    }

    #[tokio::test]
    async fn full_channel_send_is_bounded() {
        let (tx, _rx) = channel(1, Duration::from_millis(20));
        tx.send(CommandMessage::kill()).await.unwrap();

        let err = tx.send(CommandMessage::kill()).await.unwrap_err();
        assert!(matches!(err, Error::ShuttingDown));
    }

    #[tokio::test]
    async fn send_fails_once_worker_is_gone() {
        let (tx, rx) = channel(1, Duration::from_millis(20));
        drop(rx);
        assert!(matches!(
            tx.send(CommandMessage::kill()).await,
            Err(Error::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn recv_ends_when_all_senders_dropped() {
        let (tx, mut rx) = channel(1, Duration::from_millis(20));
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
