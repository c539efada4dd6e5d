//! Independent consolidation of several hub groups.

use indexmap::{IndexMap, IndexSet};
use log::info;
use rayon::prelude::*;

use super::{merge_routes, MergeOutcome};
use crate::config::MergeConfig;
use crate::distance::DistanceOracle;
use crate::error::{Error, Result};
use crate::ledger::MergeStatistics;
use crate::models::{MergeInput, RouteId, StopId};

/// Outcome of [`merge_route_groups`].
#[derive(Debug, Clone)]
pub struct RouteGroupsOutcome {
    /// One outcome per group, in input order.
    pub outcomes: Vec<MergeOutcome>,
    /// Surviving routes of every group, sorted by route id.
    pub combined_routes: IndexMap<RouteId, Vec<StopId>>,
    pub statistics: MergeStatistics,
}

/// Runs [`merge_routes`] on each group and combines the survivors.
///
/// Groups never exchange stops. Route ids must be unique across groups.
/// With `config.parallel` the groups run on the rayon pool; the result does
/// not depend on it.
pub fn merge_route_groups(
    groups: &[MergeInput],
    oracle: &dyn DistanceOracle,
    config: &MergeConfig,
) -> Result<RouteGroupsOutcome> {
    let mut seen: IndexSet<&str> = IndexSet::new();
    for id in groups.iter().flat_map(|g| g.routes.keys()) {
        if !seen.insert(id.as_str()) {
            return Err(Error::invalid_input(format!(
                "route `{id}` appears in more than one group"
            )));
        }
    }

    let outcomes: Vec<MergeOutcome> = if config.parallel {
        groups
            .par_iter()
            .map(|g| merge_routes(g, oracle, config))
            .collect::<Result<_>>()?
    } else {
        groups
            .iter()
            .map(|g| merge_routes(g, oracle, config))
            .collect::<Result<_>>()?
    };

    let mut combined_routes: IndexMap<RouteId, Vec<StopId>> = outcomes
        .iter()
        .flat_map(|o| o.final_routes.iter().map(|(id, s)| (id.clone(), s.clone())))
        .collect();
    combined_routes.sort_keys();

    let ledgers: Vec<_> = outcomes.iter().map(|o| o.ledger.clone()).collect();
    let statistics = MergeStatistics::from_ledgers(&ledgers);
    info!(
        "{} groups: {} of {} routes removed",
        groups.len(),
        statistics.removed_routes,
        statistics.initial_routes
    );

    Ok(RouteGroupsOutcome {
        outcomes,
        combined_routes,
        statistics,
    })
}
