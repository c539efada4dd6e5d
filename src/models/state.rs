//! Working state under optimization.

use indexmap::IndexMap;

use super::{RouteId, StopId};

/// Routes, their per-stop demand ledger, and derived route totals.
///
/// The three travel together: every trial clones the whole state, mutates
/// the clone, and the caller keeps it only if the trial succeeds. A route's
/// total always equals the sum of its ledger entries; the only mutators
/// change both in the same step.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use u_consolidate::models::RouteState;
///
/// let mut routes = IndexMap::new();
/// routes.insert("A".to_string(), vec!["p".to_string(), "q".to_string()]);
/// let mut demands = IndexMap::new();
/// demands.insert(
///     "A".to_string(),
///     IndexMap::from([("p".to_string(), 3.0), ("q".to_string(), 2.0)]),
/// );
///
/// let state = RouteState::from_parts(routes, demands);
/// assert_eq!(state.total_demand("A"), 5.0);
/// assert_eq!(state.stop_demand("A", "q"), 2.0);
/// assert_eq!(state.stop_demand("A", "zzz"), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RouteState {
    routes: IndexMap<RouteId, Vec<StopId>>,
    totals: IndexMap<RouteId, f64>,
    demands: IndexMap<RouteId, IndexMap<StopId, f64>>,
}

impl RouteState {
    /// Creates a state from routes and their per-stop demand ledger.
    ///
    /// Routes absent from `demands` get an empty ledger; ledger entries for
    /// routes absent from `routes` are dropped. Totals are summed from the
    /// ledger.
    pub fn from_parts(
        routes: IndexMap<RouteId, Vec<StopId>>,
        mut demands: IndexMap<RouteId, IndexMap<StopId, f64>>,
    ) -> Self {
        let demands: IndexMap<RouteId, IndexMap<StopId, f64>> = routes
            .keys()
            .map(|id| (id.clone(), demands.swap_remove(id).unwrap_or_default()))
            .collect();
        let totals = demands
            .iter()
            .map(|(id, ledger)| (id.clone(), ledger.values().sum::<f64>()))
            .collect();
        Self {
            routes,
            totals,
            demands,
        }
    }

    /// Creates a state with no routes.
    pub fn empty() -> Self {
        Self::from_parts(IndexMap::new(), IndexMap::new())
    }

    /// Routes in insertion order.
    pub fn routes(&self) -> &IndexMap<RouteId, Vec<StopId>> {
        &self.routes
    }

    /// Stop sequence of a route.
    pub fn route(&self, route_id: &str) -> Option<&[StopId]> {
        self.routes.get(route_id).map(Vec::as_slice)
    }

    pub fn route_ids(&self) -> impl Iterator<Item = &RouteId> {
        self.routes.keys()
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains_route(&self, route_id: &str) -> bool {
        self.routes.contains_key(route_id)
    }

    /// Per-route demand ledger.
    pub fn demands(&self) -> &IndexMap<RouteId, IndexMap<StopId, f64>> {
        &self.demands
    }

    /// Per-stop demand served by one route.
    pub fn stop_demands(&self, route_id: &str) -> Option<&IndexMap<StopId, f64>> {
        self.demands.get(route_id)
    }

    /// Demand this route serves at `stop` (zero if it serves none).
    pub fn stop_demand(&self, route_id: &str, stop: &str) -> f64 {
        self.demands
            .get(route_id)
            .and_then(|ledger| ledger.get(stop))
            .copied()
            .unwrap_or(0.0)
    }

    /// Total demand of a route (zero for unknown routes).
    pub fn total_demand(&self, route_id: &str) -> f64 {
        self.totals.get(route_id).copied().unwrap_or(0.0)
    }

    /// Route totals in route order.
    pub fn totals(&self) -> &IndexMap<RouteId, f64> {
        &self.totals
    }

    /// Demand summed over every route.
    pub fn overall_demand(&self) -> f64 {
        self.totals.values().sum()
    }

    /// Inserts `stop` at `position` in a route and credits it `demand`.
    ///
    /// Returns `false` (and changes nothing) if the route does not exist or
    /// the position is past the end.
    pub fn insert_stop(&mut self, route_id: &str, position: usize, stop: &str, demand: f64) -> bool {
        match self.routes.get_mut(route_id) {
            Some(stops) if position <= stops.len() => stops.insert(position, stop.to_string()),
            _ => return false,
        }
        self.credit(route_id, stop, demand);
        true
    }

    /// Credits `demand` to a stop the route already visits.
    pub fn join_stop(&mut self, route_id: &str, stop: &str, demand: f64) -> bool {
        let visits = self
            .routes
            .get(route_id)
            .is_some_and(|stops| stops.iter().any(|s| s == stop));
        if visits {
            self.credit(route_id, stop, demand);
        }
        visits
    }

    fn credit(&mut self, route_id: &str, stop: &str, demand: f64) {
        *self
            .demands
            .entry(route_id.to_string())
            .or_default()
            .entry(stop.to_string())
            .or_insert(0.0) += demand;
        *self.totals.entry(route_id.to_string()).or_insert(0.0) += demand;
    }

    /// Replaces the stop sequence of a route. The ledger is untouched.
    pub fn set_stops(&mut self, route_id: &str, stops: Vec<StopId>) {
        if let Some(current) = self.routes.get_mut(route_id) {
            *current = stops;
        }
    }

    /// Deletes a route, keeping the order of the remaining routes.
    ///
    /// Returns its stops and ledger.
    pub fn remove_route(&mut self, route_id: &str) -> Option<(Vec<StopId>, IndexMap<StopId, f64>)> {
        let stops = self.routes.shift_remove(route_id)?;
        self.totals.shift_remove(route_id);
        let ledger = self.demands.shift_remove(route_id).unwrap_or_default();
        Some((stops, ledger))
    }

    /// Splits the state into routes and ledger.
    pub fn into_parts(
        self,
    ) -> (
        IndexMap<RouteId, Vec<StopId>>,
        IndexMap<RouteId, IndexMap<StopId, f64>>,
    ) {
        (self.routes, self.demands)
    }
}

impl Default for RouteState {
    fn default() -> Self {
        Self::empty()
    }
}
