//! Merge ledger: the audit trail of a consolidation run.
//!
//! Purely observational. The planner and the search produce its records
//! but never read it back.

mod record;
mod summary;

pub use record::{
    FinalRoute, IgnoredStop, InitialRoute, MergeLedger, MergeOperation, RouteRemoval,
    StopAssignment,
};
pub use summary::MergeStatistics;
