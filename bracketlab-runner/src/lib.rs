//! BracketLab Runner — session orchestration around the lifecycle engine.
//!
//! This crate builds on `bracketlab-core` to provide:
//! - TOML session configs with content-addressed replay ids
//! - CSV bar loading with void-bar and ordering validation
//! - Deterministic synthetic bars for offline smoke runs
//! - Parallel batch replay over a rayon pool
//! - Outcome summaries and one-live-bracket-per-symbol filtering

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod report;
pub mod synthetic;

pub use batch::ReplayBatch;
pub use config::{ConfigError, ReplayConfig, ReplayId, SetupSpec};
pub use data_loader::{load_bars_csv, load_bars_dir, LoadError};
pub use report::{dedupe_overlapping, ExitBreakdown, ReplayOutcome, ReplaySummary, SessionReport};
pub use synthetic::synthetic_bars;
