//! Merge-decision engine.
//!
//! - [`try_merge_route`] — all-or-nothing relocation of one route's stops
//! - [`verify_and_correct_order`] — restores canonical stop order after inserts
//! - [`merge_routes`] — subset search (or greedy scan) keeping the state with
//!   the most eliminated routes
//! - [`merge_route_groups`] — independent runs over several hub groups

mod context;
mod greedy;
mod groups;
mod order;
mod planner;
mod search;

pub use context::MergeContext;
pub use groups::{merge_route_groups, RouteGroupsOutcome};
pub use order::{verify_and_correct_order, CanonicalOrder};
pub use planner::{try_merge_route, MergeAttempt};
pub use search::{merge_routes, MergeOutcome};
