//! Finite state and action spaces for the strategy learner.
//!
//! The state space is deliberately tiny (80 keys) so every (state, action)
//! pair gets revisited often enough for tabular Q-learning to converge on a
//! single machine's worth of interactions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Response strategy chosen per think.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Answer from recalled memories alone.
    MemoryOnly,
    /// Blend recalled memories with an AI provider completion.
    BlendAi,
    /// Re-run recall with a larger k before answering.
    WidenRecall,
    /// Re-run recall with a smaller k, keeping only the strongest matches.
    NarrowRecall,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::MemoryOnly,
        Strategy::BlendAi,
        Strategy::WidenRecall,
        Strategy::NarrowRecall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::MemoryOnly => "memory_only",
            Strategy::BlendAi => "blend_ai",
            Strategy::WidenRecall => "widen_recall",
            Strategy::NarrowRecall => "narrow_recall",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory_only" => Ok(Strategy::MemoryOnly),
            "blend_ai" => Ok(Strategy::BlendAi),
            "widen_recall" => Ok(Strategy::WidenRecall),
            "narrow_recall" => Ok(Strategy::NarrowRecall),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// Discretized recall context: confidence quintile, recall-volume bucket,
/// and time-of-day quadrant. Encodes as `c{n}.r{n}.h{n}` for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub confidence_bucket: u8,
    pub recall_bucket: u8,
    pub hour_bucket: u8,
}

impl StateKey {
    /// Bucket a raw recall context. `confidence` is clamped to [0, 1].
    pub fn from_context(confidence: f64, recall_count: usize, hour: u32) -> Self {
        let confidence_bucket = ((confidence.clamp(0.0, 1.0) * 5.0) as u8).min(4);
        let recall_bucket = match recall_count {
            0 => 0,
            1..=2 => 1,
            3..=5 => 2,
            _ => 3,
        };
        let hour_bucket = ((hour % 24) / 6) as u8;
        Self {
            confidence_bucket,
            recall_bucket,
            hour_bucket,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "c{}.r{}.h{}",
            self.confidence_bucket, self.recall_bucket, self.hour_bucket
        )
    }

    pub fn decode(s: &str) -> Option<Self> {
        let mut parts = s.split('.');
        let confidence_bucket = parts.next()?.strip_prefix('c')?.parse().ok()?;
        let recall_bucket = parts.next()?.strip_prefix('r')?.parse().ok()?;
        let hour_bucket = parts.next()?.strip_prefix('h')?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            confidence_bucket,
            recall_bucket,
            hour_bucket,
        })
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
