use std::sync::Arc;
use std::time::Duration;

use crate::command::{CommandId, CommandReceiver};
use crate::lifecycle::Lifecycle;
use crate::traits::AdapterManager;

/// Why the background worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// A `kill` command was consumed.
    Killed,
    /// Every command sender was dropped.
    ChannelClosed,
    /// The lifecycle was shut down from elsewhere (e.g. a signal).
    Cancelled,
    /// The adapter's event loop ended on its own.
    AdapterStopped,
}

/// 后台工作者：驱动网卡事件循环，并消费命令通道。
///
/// Always leaves the lifecycle in `ShuttingDown` when it returns, so the web
/// server starts draining no matter why the worker stopped. The adapter loop
/// gets `stop_grace` to notice the cancellation before it is abandoned.
pub async fn run_worker(
    adapter: Arc<dyn AdapterManager>,
    mut commands: CommandReceiver,
    lifecycle: Lifecycle,
    stop_grace: Duration,
) -> WorkerExit {
    tracing::info!("📡 Background worker started");

    let mut events = adapter.run(lifecycle.token());

    let exit = loop {
        tokio::select! {
            // Commands first: a queued kill must win over a concurrent cancellation.
            biased;

            command = commands.recv() => match command {
                Some(message) => match message.id {
                    CommandId::Kill => {
                        tracing::info!("💀 Worker received kill command");
                        break WorkerExit::Killed;
                    }
                },
                None => {
                    tracing::warn!("Command channel closed, stopping worker");
                    break WorkerExit::ChannelClosed;
                }
            },

            _ = lifecycle.cancelled() => {
                tracing::info!("Worker cancelled");
                break WorkerExit::Cancelled;
            }

            result = &mut events => {
                match result {
                    Ok(()) => tracing::warn!("Adapter event loop finished unexpectedly"),
                    Err(e) => tracing::error!("❌ Adapter event loop failed: {}", e),
                }
                break WorkerExit::AdapterStopped;
            }
        }
    };

    lifecycle.begin_shutdown();
    // Let the adapter loop observe the cancellation and clean up.
    if exit != WorkerExit::AdapterStopped {
        match tokio::time::timeout(stop_grace, events).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Adapter event loop returned an error during shutdown: {}", e)
            }
            Err(_) => tracing::warn!(
                "Adapter event loop ignored shutdown for {:?}, abandoning it",
                stop_grace
            ),
        }
    }

    tracing::info!(?exit, "Background worker stopped");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockAdapter;
    use crate::command::{self, CommandMessage};
    use crate::lifecycle::LifecycleState;
    use crate::structs::{Connection, Credentials, Network, StatusResult};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    const GRACE: Duration = Duration::from_secs(1);

    /// Event loop that never looks at its shutdown token.
    struct StuckAdapter;

    #[async_trait]
    impl AdapterManager for StuckAdapter {
        async fn status(&self) -> crate::Result<StatusResult> {
            Ok(StatusResult::new())
        }

        async fn disconnect(&self) {}

        async fn connect_network(&self, _credentials: &Credentials) -> crate::Result<Connection> {
            Err(crate::Error::Adapter("unsupported".to_string()))
        }

        async fn scan_networks(&self) -> crate::Result<Vec<Network>> {
            Ok(Vec::new())
        }

        async fn run(&self, _shutdown: CancellationToken) -> crate::Result<()> {
            std::future::pending().await
        }
    }

    fn setup(
        cycle: Duration,
    ) -> (
        Arc<MockAdapter>,
        command::CommandSender,
        CommandReceiver,
        Lifecycle,
    ) {
        let adapter = Arc::new(MockAdapter::new().with_cycle(cycle));
        let (tx, rx) = command::channel(1, Duration::from_millis(100));
        (adapter, tx, rx, Lifecycle::new())
    }

    #[tokio::test]
    async fn kill_sent_mid_cycle_is_observed_once() {
        let (adapter, tx, rx, lifecycle) = setup(Duration::from_millis(5));
        let worker = tokio::spawn(run_worker(adapter.clone(), rx, lifecycle.clone(), GRACE));

        // Let the adapter loop spin a few cycles first.
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(CommandMessage::kill()).await.unwrap();

        assert_eq!(worker.await.unwrap(), WorkerExit::Killed);
        assert_eq!(lifecycle.state(), LifecycleState::ShuttingDown);
        assert!(adapter.calls().cycles > 0);

        // The receiver is gone with the worker; nothing can be delivered twice.
        assert!(tx.send(CommandMessage::kill()).await.is_err());
    }

    #[tokio::test]
    async fn kill_queued_before_start_is_not_lost() {
        let (adapter, tx, rx, lifecycle) = setup(Duration::from_secs(60));
        tx.send(CommandMessage::kill()).await.unwrap();

        let exit = run_worker(adapter, rx, lifecycle, GRACE).await;
        assert_eq!(exit, WorkerExit::Killed);
    }

    #[tokio::test]
    async fn dropped_senders_stop_the_worker() {
        let (adapter, tx, rx, lifecycle) = setup(Duration::from_secs(60));
        drop(tx);

        let exit = run_worker(adapter, rx, lifecycle.clone(), GRACE).await;
        assert_eq!(exit, WorkerExit::ChannelClosed);
        assert_eq!(lifecycle.state(), LifecycleState::ShuttingDown);
    }

    #[tokio::test]
    async fn external_shutdown_cancels_the_worker() {
        let (adapter, _tx, rx, lifecycle) = setup(Duration::from_secs(60));
        lifecycle.begin_shutdown();

        let exit = run_worker(adapter, rx, lifecycle, GRACE).await;
        assert_eq!(exit, WorkerExit::Cancelled);
    }

    #[tokio::test]
    async fn kill_is_not_held_up_by_a_stuck_adapter_loop() {
        let (tx, rx) = command::channel(1, Duration::from_millis(100));
        let lifecycle = Lifecycle::new();
        tx.send(CommandMessage::kill()).await.unwrap();

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            run_worker(Arc::new(StuckAdapter), rx, lifecycle.clone(), Duration::from_millis(50)),
        )
        .await
        .expect("worker waited on the adapter loop forever");

        assert_eq!(exit, WorkerExit::Killed);
        assert_eq!(lifecycle.state(), LifecycleState::ShuttingDown);
    }
}
