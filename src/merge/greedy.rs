//! Greedy removal scan.
//!
//! # Algorithm
//!
//! Scans the surviving routes in order and commits the first one the planner
//! can eliminate, then restarts the scan on the new state. Stops when a full
//! pass eliminates nothing.
//!
//! # Complexity
//!
//! O(N²) planner calls. Used when the subset search is too expensive; it
//! may remove fewer routes than the exhaustive search would.

use log::{debug, info};

use super::search::Trial;
use super::{try_merge_route, MergeContext};
use crate::error::Result;
use crate::models::{RouteId, RouteState};

pub(crate) fn greedy_merge(original: &RouteState, ctx: &MergeContext<'_>) -> Result<Trial> {
    let mut trial = Trial::unchanged(original.clone());

    'scan: loop {
        let ids: Vec<RouteId> = trial.state.route_ids().cloned().collect();
        for id in &ids {
            if let Some(attempt) = try_merge_route(id, &trial.state, ctx)? {
                debug!("greedy: eliminated {id}");
                let (state, removal) = attempt.into_parts();
                trial.state = state;
                trial.removals.push(removal);
                continue 'scan;
            }
        }
        break;
    }

    info!(
        "greedy scan removed {} of {} routes",
        trial.removed(),
        original.num_routes()
    );
    Ok(trial)
}
