//! Insertion planner: relocates every stop of one route or none.
//!
//! # Algorithm
//!
//! Stops of the candidate route are visited in route order. A stop whose
//! demand on this route is at or below the ignore threshold (and which is
//! not a faculty stop) is dropped and its demand counted against the
//! ignored-demand budget. Every other stop goes to the cheapest admissible
//! position over all surviving routes:
//!
//! - the receiving route has spare capacity for the stop's demand;
//! - the stop is nearer the hub than the stop it follows, by at least the
//!   minimum-closer margin (routes run inbound);
//! - if a stop follows the insertion point, the new stop's hub distance lies
//!   between the two neighbours';
//! - the detour `d(cur, s) + d(s, next) - d(cur, next)` is below the detour
//!   threshold, `next` being the hub after the last stop.
//!
//! A route that already visits the stop absorbs its demand without a
//! second visit. Ties go to the first placement found, scanning routes in
//! state order and positions left to right.
//!
//! # Complexity
//!
//! O(s × n) oracle lookups per candidate, s = candidate stops, n = stops
//! on surviving routes.

use indexmap::IndexSet;
use log::debug;

use super::{verify_and_correct_order, MergeContext};
use crate::error::{Error, Result};
use crate::ledger::{IgnoredStop, RouteRemoval, StopAssignment};
use crate::models::{RouteId, RouteState};

/// A successful elimination of one route, not yet committed.
#[derive(Debug, Clone)]
pub struct MergeAttempt {
    /// State with the candidate removed and its stops placed.
    pub state: RouteState,
    /// Reassignments and dropped stops, in candidate stop order.
    pub removal: RouteRemoval,
}

impl MergeAttempt {
    /// Demand of the candidate's dropped stops.
    pub fn ignored_demand(&self) -> f64 {
        self.removal.ignored_demand()
    }

    pub fn into_parts(self) -> (RouteState, RouteRemoval) {
        (self.state, self.removal)
    }
}

/// Where a stop goes on a surviving route.
#[derive(Debug, Clone, PartialEq)]
struct Placement {
    route_id: RouteId,
    position: usize,
    detour: f64,
    joins: bool,
}

/// Attempts to eliminate `candidate` by relocating its stops into the other
/// routes of `state`.
///
/// `state` is never modified. Returns `Ok(None)` when some stop has no
/// admissible placement or the dropped demand exceeds the budget, and an
/// error only when a distance lookup fails or `candidate` is unknown.
///
/// # Examples
///
/// ```
/// use indexmap::{IndexMap, IndexSet};
/// use u_consolidate::config::MergeConfig;
/// use u_consolidate::distance::DistanceMatrix;
/// use u_consolidate::merge::{try_merge_route, CanonicalOrder, MergeContext};
/// use u_consolidate::models::MergeInput;
///
/// let mut routes = IndexMap::new();
/// routes.insert("A".to_string(), vec!["far".to_string(), "near".to_string()]);
/// routes.insert("B".to_string(), vec!["mid".to_string()]);
/// let input = MergeInput::new(routes, "H").with_route_stop_demands(IndexMap::from([
///     ("A".to_string(), IndexMap::from([("far".to_string(), 5.0), ("near".to_string(), 5.0)])),
///     ("B".to_string(), IndexMap::from([("mid".to_string(), 5.0)])),
/// ]));
///
/// // stops on a line, hub at 0
/// let at = [("far", 6.0), ("mid", 3.0), ("near", 1.0), ("H", 0.0)];
/// let mut dm = DistanceMatrix::new(at.iter().map(|(s, _)| *s));
/// for (a, x) in at {
///     for (b, y) in at {
///         dm.set(a, b, f64::abs(x - y)).unwrap();
///     }
/// }
///
/// let state = input.initial_state().unwrap();
/// let canonical = CanonicalOrder::from_routes(&input.routes);
/// let config = MergeConfig::default().with_detour_threshold(10.0);
/// let faculty = IndexSet::new();
/// let ctx = MergeContext::new(&dm, "H", &faculty, &canonical, &config);
///
/// // "far" cannot precede "mid" on an inbound route, so A cannot be absorbed
/// assert!(try_merge_route("A", &state, &ctx).unwrap().is_none());
///
/// // B's single stop fits between "far" and "near"
/// let attempt = try_merge_route("B", &state, &ctx).unwrap().expect("absorbed");
/// assert_eq!(attempt.state.route("A").unwrap(), ["far", "mid", "near"]);
/// assert!(!attempt.state.contains_route("B"));
/// ```
pub fn try_merge_route(
    candidate: &str,
    state: &RouteState,
    ctx: &MergeContext<'_>,
) -> Result<Option<MergeAttempt>> {
    let Some(stops) = state.route(candidate) else {
        return Err(Error::invalid_input(format!("unknown route `{candidate}`")));
    };
    let config = ctx.config();

    let mut trial = state.clone();
    let mut assigned = Vec::new();
    let mut ignored = Vec::new();
    let mut ignored_demand = 0.0;
    let mut touched: IndexSet<RouteId> = IndexSet::new();

    for stop in stops {
        let demand = state.stop_demand(candidate, stop);

        if demand <= config.ignore_threshold && !ctx.is_faculty(stop) {
            ignored_demand += demand;
            if ignored_demand > config.max_ignored_demand {
                debug!(
                    "route {candidate}: ignored demand {ignored_demand} exceeds budget {}",
                    config.max_ignored_demand
                );
                return Ok(None);
            }
            ignored.push(IgnoredStop {
                stop: stop.clone(),
                demand,
            });
            continue;
        }

        let Some(placement) = best_placement(candidate, stop, demand, &trial, ctx)? else {
            debug!("route {candidate}: no admissible placement for {stop} (demand {demand})");
            return Ok(None);
        };

        if placement.joins {
            trial.join_stop(&placement.route_id, stop, demand);
        } else {
            trial.insert_stop(&placement.route_id, placement.position, stop, demand);
        }
        debug!(
            "route {candidate}: {stop} -> {} at {} (detour {:.3})",
            placement.route_id, placement.position, placement.detour
        );
        assigned.push(StopAssignment {
            stop: stop.clone(),
            to_route: placement.route_id.clone(),
            demand,
            position: placement.position,
            joined_existing: placement.joins,
        });
        touched.insert(placement.route_id);
    }

    trial.remove_route(candidate);
    for route_id in &touched {
        if let Some(current) = trial.route(route_id) {
            let corrected = verify_and_correct_order(route_id, current, ctx.canonical());
            trial.set_stops(route_id, corrected);
        }
    }

    Ok(Some(MergeAttempt {
        state: trial,
        removal: RouteRemoval {
            route_id: candidate.to_string(),
            stops_assigned: assigned,
            stops_ignored: ignored,
        },
    }))
}

/// Finds the cheapest admissible placement of `stop` on any route other
/// than `candidate`.
fn best_placement(
    candidate: &str,
    stop: &str,
    demand: f64,
    state: &RouteState,
    ctx: &MergeContext<'_>,
) -> Result<Option<Placement>> {
    let config = ctx.config();
    let hub = ctx.hub();
    let stop_to_hub = ctx.hub_distance(stop)?;
    let mut best: Option<Placement> = None;

    for (route_id, stops) in state.routes() {
        if route_id == candidate {
            continue;
        }
        if state.total_demand(route_id) + demand > config.capacity_limit {
            continue;
        }

        if let Some(position) = stops.iter().position(|s| s == stop) {
            if best.as_ref().is_none_or(|b| 0.0 < b.detour) {
                best = Some(Placement {
                    route_id: route_id.clone(),
                    position,
                    detour: 0.0,
                    joins: true,
                });
            }
            continue;
        }

        for (i, current) in stops.iter().enumerate() {
            let current_to_hub = ctx.hub_distance(current)?;
            if stop_to_hub >= current_to_hub
                || current_to_hub - stop_to_hub < config.min_closer_margin
            {
                continue;
            }

            let next = match stops.get(i + 1) {
                Some(next) => {
                    if stop_to_hub < ctx.hub_distance(next)? {
                        continue;
                    }
                    next.as_str()
                }
                None => hub,
            };

            let detour = ctx.distance(current, stop)? + ctx.distance(stop, next)?
                - ctx.distance(current, next)?;

            if detour < config.detour_threshold && best.as_ref().is_none_or(|b| detour < b.detour) {
                best = Some(Placement {
                    route_id: route_id.clone(),
                    position: i + 1,
                    detour,
                    joins: false,
                });
            }
        }
    }

    Ok(best)
}
