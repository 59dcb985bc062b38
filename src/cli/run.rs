use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use noesis::app::AppState;
use noesis::events::EngineEvent;
use noesis::runtime::Runtime;

/// Run as a long-lived daemon: cycle timer, folder watcher, and event log,
/// until Ctrl-C.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let runtime = Runtime::start(Arc::clone(&state))?;
    let cancel = runtime.cancellation_token();

    // mirror engine events into the log so the daemon is observable
    let mut events = state.events.subscribe();
    let event_cancel = cancel.clone();
    let event_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = event_cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(EngineEvent::MemoryStored { id, memory_type }) => {
                        info!(%id, %memory_type, "memory stored");
                    }
                    Ok(EngineEvent::ThoughtGenerated { confidence, ai_enhanced, strategy }) => {
                        info!(confidence, ai_enhanced, %strategy, "thought generated");
                    }
                    Ok(EngineEvent::CycleCompleted { decayed, replayed }) => {
                        info!(decayed, replayed, "cycle completed");
                    }
                    Ok(EngineEvent::FileIndexed { path, chunks }) => {
                        info!(%path, chunks, "file indexed");
                    }
                    // lagged receivers just miss old events
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    println!("noesis running (Ctrl-C to stop)");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown(&state).await;
    let _ = event_task.await;
    Ok(())
}
