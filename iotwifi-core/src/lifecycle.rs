use tokio_util::sync::CancellationToken;

/// Process-wide run state shared by the worker, the web server and the adapter loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    ShuttingDown,
}

/// Two-state lifecycle backed by a [`CancellationToken`].
///
/// The transition is one-way: once shutting down, always shutting down.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        if self.token.is_cancelled() {
            LifecycleState::ShuttingDown
        } else {
            LifecycleState::Running
        }
    }

    pub fn begin_shutdown(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("🛑 Lifecycle: Running -> ShuttingDown");
        }
        self.token.cancel();
    }

    /// Resolves once the lifecycle is shutting down.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Token handed to the adapter's event loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
