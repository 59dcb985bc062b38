//! One-shot CLI command handlers.
//!
//! Each handler drives an [`AppState`](noesis::app::AppState) built by main,
//! prints a human-readable report, and leaves persistence to the caller.

pub mod files;
pub mod interact;
pub mod run;
pub mod stats;
