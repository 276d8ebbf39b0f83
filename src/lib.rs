//! Live basketball score engine.
//!
//! Derives authoritative game scores from an append-only log of stat events,
//! keeps viewers synchronized over a push channel with a polling fallback, and
//! detects per-player achievement milestones from before/after stat snapshots.

pub mod config;
pub mod error;
pub mod live;
pub mod milestone;
pub mod model;
pub mod score;
pub mod store;
