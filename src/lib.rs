//! # u-consolidate
//!
//! Hub-route consolidation engine: eliminates whole routes that converge on
//! a shared hub by relocating their stops onto the surviving routes, subject
//! to capacity, directional and detour constraints, and records every
//! decision in an audit ledger.
//!
//! ## Modules
//!
//! - [`models`] — Input contract and working route state
//! - [`distance`] — Distance oracle trait and dense stop-name matrix
//! - [`config`] — Thresholds, search limits and strategy
//! - [`merge`] — Insertion planner, order corrector and subset search
//! - [`ledger`] — Merge audit trail, summaries and statistics
//! - [`evaluation`] — Invariant checks of merge results
//! - [`error`] — Crate error type

pub mod config;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod ledger;
pub mod merge;
pub mod models;
