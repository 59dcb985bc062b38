//! Core memory records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of knowledge a memory holds. The type never affects search
/// ranking; it exists for filtering and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Facts and general knowledge.
    Semantic,
    /// Specific events, including every think interaction.
    Episodic,
    /// How-to knowledge.
    Procedural,
    /// Short-lived scratch state.
    Working,
    /// Knowledge about the system's own behavior.
    Meta,
    /// Cause-effect relationships.
    Causal,
    /// Goals and intentions.
    Goal,
    /// Affect-laden associations.
    Emotional,
}

impl MemoryType {
    pub const ALL: [MemoryType; 8] = [
        MemoryType::Semantic,
        MemoryType::Episodic,
        MemoryType::Procedural,
        MemoryType::Working,
        MemoryType::Meta,
        MemoryType::Causal,
        MemoryType::Goal,
        MemoryType::Emotional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Semantic => "semantic",
            MemoryType::Episodic => "episodic",
            MemoryType::Procedural => "procedural",
            MemoryType::Working => "working",
            MemoryType::Meta => "meta",
            MemoryType::Causal => "causal",
            MemoryType::Goal => "goal",
            MemoryType::Emotional => "emotional",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "semantic" => Ok(MemoryType::Semantic),
            "episodic" => Ok(MemoryType::Episodic),
            "procedural" => Ok(MemoryType::Procedural),
            "working" => Ok(MemoryType::Working),
            "meta" => Ok(MemoryType::Meta),
            "causal" => Ok(MemoryType::Causal),
            "goal" => Ok(MemoryType::Goal),
            "emotional" => Ok(MemoryType::Emotional),
            other => Err(format!("unknown memory type: {other}")),
        }
    }
}

/// A stored memory. Timestamps are unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    pub memory_type: MemoryType,
    /// Salience in [0, 1]; drives eviction and stale decay.
    pub importance: f64,
    pub created_at: i64,
    pub last_accessed: i64,
    pub access_count: u32,
}

/// One search hit: the memory plus its query similarity.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub memory: Memory,
    pub similarity: f32,
}

/// A generated response from the think pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Thought {
    pub response: String,
    /// Confidence in [0, 1], derived from recall similarity.
    pub confidence: f64,
    /// Ids of the memories that informed the response.
    pub memory_ids: Vec<String>,
    /// False whenever the response came from memory alone.
    pub ai_enhanced: bool,
    pub strategy: String,
    pub created_at: i64,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_round_trips_through_strings() {
        for ty in MemoryType::ALL {
            let parsed: MemoryType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
        assert!("telepathic".parse::<MemoryType>().is_err());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Episodic".parse::<MemoryType>().unwrap(), MemoryType::Episodic);
        assert_eq!("GOAL".parse::<MemoryType>().unwrap(), MemoryType::Goal);
    }
}
