//! Filesystem watching with debounce.
//!
//! Change events for the configured folders are coalesced by the debouncer,
//! then applied one path at a time: deletes drop the path's chunks, anything
//! else re-indexes the path. Bursts (editor save storms, git checkouts)
//! collapse into one pass per touched path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_full::notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::FileIndexer;
use crate::config::IndexerConfig;

#[derive(Debug)]
enum Change {
    Touched(PathBuf),
    Removed(PathBuf),
}

/// Start watching the configured folders. Returns the task driving re-index
/// work; it exits when `cancel` fires, dropping the watcher with it.
pub fn spawn_watcher(
    indexer: Arc<FileIndexer>,
    config: &IndexerConfig,
    cancel: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let (tx, mut rx) = mpsc::channel::<Change>(256);

    let mut debouncer = new_debouncer(
        Duration::from_millis(config.debounce_ms),
        None,
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    let removed = matches!(event.kind, EventKind::Remove(_));
                    for path in &event.paths {
                        let change = if removed {
                            Change::Removed(path.clone())
                        } else {
                            Change::Touched(path.clone())
                        };
                        // full channel means a scan is already behind; drop
                        if tx.try_send(change).is_err() {
                            debug!("watch channel full, dropping change event");
                        }
                    }
                }
            }
            Err(errors) => {
                for err in errors {
                    warn!(error = %err, "watch error");
                }
            }
        },
    )
    .context("failed to create filesystem debouncer")?;

    for folder in &config.folders {
        let root = crate::config::expand_tilde(&folder.path);
        if !root.exists() {
            warn!(path = %root.display(), "cannot watch missing folder");
            continue;
        }
        let mode = if folder.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer
            .watch(&root, mode)
            .with_context(|| format!("failed to watch {}", root.display()))?;
        info!(path = %root.display(), "watching folder");
    }

    let handle = tokio::spawn(async move {
        // the debouncer lives inside this task; dropping it stops the watch
        let _debouncer = debouncer;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("watcher shutting down");
                    break;
                }
                change = rx.recv() => {
                    let Some(change) = change else { break };
                    apply_change(&indexer, change).await;
                }
            }
        }
    });
    Ok(handle)
}

async fn apply_change(indexer: &FileIndexer, change: Change) {
    match change {
        Change::Touched(path) => {
            if !path.is_file() || !indexer.should_index(&path) {
                return;
            }
            if let Err(err) = indexer.index_file(&path).await {
                warn!(path = %path.display(), error = %err, "re-index after change failed");
            }
        }
        Change::Removed(path) => match indexer.remove_file(&path) {
            Ok(removed) if removed > 0 => {
                debug!(path = %path.display(), chunks = removed, "removed deleted file");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to drop deleted file");
            }
        },
    }
}
