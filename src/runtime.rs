//! Background tasks: the cycle timer and the filesystem watch loop.
//!
//! Both run until the shared [`CancellationToken`] fires. Shutdown is
//! ordered: cancel, join both tasks, then one final flush, so no transaction
//! is left half-applied behind an exiting process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::AppState;
use crate::indexer::watcher;

pub struct Runtime {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Spawn the cycle timer and (when folders are configured) the watcher.
    pub fn start(state: Arc<AppState>) -> Result<Self> {
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        let interval_secs = state.config.server.cycle_interval_secs;
        if interval_secs > 0 {
            let engine = Arc::clone(&state.engine);
            let token = cancel.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
                // the first tick fires immediately; skip it
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            let report = engine.cycle().await;
                            info!(
                                decayed = report.decayed_memories,
                                replayed = report.replayed_transitions,
                                "cycle ran"
                            );
                        }
                    }
                }
            }));
        }

        if !state.config.indexer.folders.is_empty() {
            let handle = watcher::spawn_watcher(
                Arc::clone(&state.indexer),
                &state.config.indexer,
                cancel.clone(),
            )?;
            tasks.push(handle);
        }

        Ok(Self { cancel, tasks })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel background work, wait for it to wind down, and flush.
    pub async fn shutdown(self, state: &AppState) {
        info!("shutting down");
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "background task panicked");
            }
        }
        if let Err(err) = state.flush() {
            warn!(error = %err, "final flush failed");
        }
    }
}
