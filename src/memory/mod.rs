//! Memory subsystem: records ([`types`]), vector math ([`vector`]), and the
//! concurrent store ([`store`]).

pub mod store;
pub mod types;
pub mod vector;

pub use store::MemoryStore;
pub use types::{Memory, MemoryType, SearchResult, Thought};
