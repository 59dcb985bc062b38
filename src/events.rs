//! Bounded event bus for shell-facing notifications.
//!
//! Built on [`tokio::sync::broadcast`]: publishing never blocks, and a slow
//! or absent subscriber only loses its own backlog. Components publish
//! fire-and-forget; the CLI daemon subscribes to log activity.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    MemoryStored {
        id: String,
        memory_type: String,
    },
    ThoughtGenerated {
        confidence: f64,
        ai_enhanced: bool,
        strategy: String,
    },
    CycleCompleted {
        decayed: usize,
        replayed: usize,
    },
    FileIndexed {
        path: String,
        chunks: usize,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Dropped silently when nobody is listening.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
