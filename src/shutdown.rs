//! Graceful shutdown coordination (spec §4.6.3 "Cancellation: SIGINT
//! cancels all worker tasks cooperatively"). Thin wrapper around
//! `agent::cancellation::handle_sigint`: spawns the SIGINT listener and
//! exposes a handle the orchestrator's main loop can await or race against.

use tokio::task::JoinHandle;

use crate::agent::cancellation;

pub struct ShutdownCoordinator {
    grace_seconds: u64,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self { grace_seconds: 30 }
    }

    pub fn with_grace_seconds(mut self, grace_seconds: u64) -> Self {
        self.grace_seconds = grace_seconds;
        self
    }

    /// Spawn the SIGINT listener. Returns a handle that resolves once
    /// every in-flight agent turn has either finished or the grace period
    /// has elapsed, whichever comes first.
    pub fn install(&self) -> JoinHandle<()> {
        let grace_seconds = self.grace_seconds;
        tokio::spawn(async move {
            cancellation::handle_sigint(grace_seconds).await;
            tracing::info!("graceful shutdown window elapsed");
        })
    }

    /// Number of in-flight agent turns still registered (spec §4.3.4).
    pub fn active_turns() -> usize {
        cancellation::Registry::global().active_count()
    }
}
