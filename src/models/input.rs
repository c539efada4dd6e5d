//! Caller-supplied consolidation input.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::{RouteId, RouteState, StopId};
use crate::error::{Error, Result};

/// Everything the engine needs besides the distance oracle and config.
///
/// `route_stop_demands` is the demand each route specifically serves at
/// each of its stops. When it is absent, every stop's aggregate demand
/// from `stop_demands` is split evenly across the routes that visit it.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use u_consolidate::models::MergeInput;
///
/// let mut routes = IndexMap::new();
/// routes.insert("A".to_string(), vec!["p".to_string(), "s".to_string()]);
/// routes.insert("B".to_string(), vec!["s".to_string()]);
///
/// let input = MergeInput::new(routes, "College")
///     .with_stop_demands(IndexMap::from([("p".to_string(), 3.0), ("s".to_string(), 8.0)]));
///
/// let ledger = input.resolved_route_stop_demands();
/// assert_eq!(ledger["A"]["s"], 4.0);
/// assert_eq!(ledger["B"]["s"], 4.0);
/// assert_eq!(ledger["A"]["p"], 3.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeInput {
    /// Ordered stop sequence per route, in route enumeration order.
    pub routes: IndexMap<RouteId, Vec<StopId>>,
    /// Aggregate demand per stop; only used to synthesize a missing ledger.
    #[serde(default)]
    pub stop_demands: IndexMap<StopId, f64>,
    #[serde(default)]
    pub route_stop_demands: Option<IndexMap<RouteId, IndexMap<StopId, f64>>>,
    #[serde(alias = "college_stop")]
    pub hub: StopId,
    /// Privileged stops that are never dropped, whatever their demand.
    #[serde(default)]
    pub faculty_stops: IndexSet<StopId>,
}

impl MergeInput {
    pub fn new(routes: IndexMap<RouteId, Vec<StopId>>, hub: impl Into<StopId>) -> Self {
        Self {
            routes,
            hub: hub.into(),
            ..Self::default()
        }
    }

    pub fn with_stop_demands(mut self, stop_demands: IndexMap<StopId, f64>) -> Self {
        self.stop_demands = stop_demands;
        self
    }

    pub fn with_route_stop_demands(
        mut self,
        route_stop_demands: IndexMap<RouteId, IndexMap<StopId, f64>>,
    ) -> Self {
        self.route_stop_demands = Some(route_stop_demands);
        self
    }

    pub fn with_faculty_stops<I, S>(mut self, stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StopId>,
    {
        self.faculty_stops = stops.into_iter().map(Into::into).collect();
        self
    }

    /// Parses and validates an input from JSON.
    ///
    /// The hub may be given as `hub` or `college_stop`.
    pub fn from_json(json: &str) -> Result<Self> {
        let input: Self = serde_json::from_str(json)?;
        input.validate()?;
        Ok(input)
    }

    pub fn is_faculty(&self, stop: &str) -> bool {
        self.faculty_stops.contains(stop)
    }

    /// Checks the input contract.
    ///
    /// Rejects an empty hub name, a route listing the hub or a stop twice,
    /// negative or non-finite demand, and ledger entries for stops the route
    /// does not visit.
    pub fn validate(&self) -> Result<()> {
        if self.hub.is_empty() {
            return Err(Error::invalid_input("hub name is empty"));
        }
        for (route_id, stops) in &self.routes {
            let mut seen = IndexSet::with_capacity(stops.len());
            for stop in stops {
                if *stop == self.hub {
                    return Err(Error::invalid_input(format!(
                        "route `{route_id}` lists the hub `{stop}`"
                    )));
                }
                if !seen.insert(stop.as_str()) {
                    return Err(Error::invalid_input(format!(
                        "route `{route_id}` visits `{stop}` more than once"
                    )));
                }
            }
        }
        for (stop, &demand) in &self.stop_demands {
            check_demand(stop, demand)?;
        }
        if let Some(ledger) = &self.route_stop_demands {
            for (route_id, demands) in ledger {
                let Some(stops) = self.routes.get(route_id) else {
                    continue;
                };
                for (stop, &demand) in demands {
                    check_demand(stop, demand)?;
                    if !stops.contains(stop) {
                        return Err(Error::invalid_input(format!(
                            "route `{route_id}` has demand at `{stop}` but does not visit it"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The per-route demand ledger, synthesized if it was not supplied.
    ///
    /// A supplied ledger is restricted to the input routes, in route order.
    pub fn resolved_route_stop_demands(&self) -> IndexMap<RouteId, IndexMap<StopId, f64>> {
        if let Some(ledger) = &self.route_stop_demands {
            return self
                .routes
                .keys()
                .map(|id| (id.clone(), ledger.get(id).cloned().unwrap_or_default()))
                .collect();
        }

        let mut visiting: IndexMap<&str, usize> = IndexMap::new();
        for stops in self.routes.values() {
            for stop in stops {
                *visiting.entry(stop.as_str()).or_insert(0) += 1;
            }
        }

        self.routes
            .iter()
            .map(|(id, stops)| {
                let ledger = stops
                    .iter()
                    .map(|stop| {
                        let demand = match self.stop_demands.get(stop) {
                            Some(&total) => total / visiting[stop.as_str()] as f64,
                            None => 0.0,
                        };
                        (stop.clone(), demand)
                    })
                    .collect();
                (id.clone(), ledger)
            })
            .collect()
    }

    /// Validates the input and builds the initial working state.
    pub fn initial_state(&self) -> Result<RouteState> {
        self.validate()?;
        Ok(RouteState::from_parts(
            self.routes.clone(),
            self.resolved_route_stop_demands(),
        ))
    }
}

fn check_demand(stop: &str, demand: f64) -> Result<()> {
    if demand.is_finite() && demand >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "demand at `{stop}` must be finite and non-negative, got {demand}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> IndexMap<RouteId, Vec<StopId>> {
        let mut routes = IndexMap::new();
        routes.insert("A".to_string(), vec!["p".to_string(), "q".to_string()]);
        routes.insert("B".to_string(), vec!["r".to_string(), "q".to_string()]);
        routes
    }

    #[test]
    fn test_synthesized_ledger_splits_shared_stops() {
        let input = MergeInput::new(routes(), "H").with_stop_demands(IndexMap::from([
            ("p".to_string(), 2.0),
            ("q".to_string(), 6.0),
        ]));
        let ledger = input.resolved_route_stop_demands();
        assert_eq!(ledger["A"]["p"], 2.0);
        assert_eq!(ledger["A"]["q"], 3.0);
        assert_eq!(ledger["B"]["q"], 3.0);
        assert_eq!(ledger["B"]["r"], 0.0); // no aggregate demand
    }

    #[test]
    fn test_supplied_ledger_restricted_to_routes() {
        let supplied = IndexMap::from([
            ("B".to_string(), IndexMap::from([("r".to_string(), 5.0)])),
            ("X".to_string(), IndexMap::from([("x".to_string(), 1.0)])),
        ]);
        let input = MergeInput::new(routes(), "H").with_route_stop_demands(supplied);
        let ledger = input.resolved_route_stop_demands();
        assert_eq!(ledger.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(ledger["A"].is_empty());
        assert_eq!(ledger["B"]["r"], 5.0);
    }

    #[test]
    fn test_validate_rejects_hub_in_route() {
        let mut r = routes();
        r.insert("C".to_string(), vec!["H".to_string()]);
        let err = MergeInput::new(r, "H").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_stop() {
        let mut r = routes();
        r.insert("C".to_string(), vec!["s".to_string(), "s".to_string()]);
        assert!(MergeInput::new(r, "H").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_demand() {
        let input = MergeInput::new(routes(), "H")
            .with_stop_demands(IndexMap::from([("p".to_string(), -1.0)]));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_demand_off_route() {
        let supplied =
            IndexMap::from([("A".to_string(), IndexMap::from([("r".to_string(), 1.0)]))]);
        let input = MergeInput::new(routes(), "H").with_route_stop_demands(supplied);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_hub() {
        assert!(MergeInput::new(routes(), "").validate().is_err());
    }

    #[test]
    fn test_from_json_with_college_alias() {
        let input = MergeInput::from_json(
            r#"{
                "routes": {"Route 1": ["p", "q"], "Route 2": ["r"]},
                "stop_demands": {"p": 1, "q": 2, "r": 3},
                "college_stop": "College",
                "faculty_stops": ["q"]
            }"#,
        )
        .expect("valid input");
        assert_eq!(input.hub, "College");
        assert!(input.is_faculty("q"));
        assert!(!input.is_faculty("p"));
        assert!(input.route_stop_demands.is_none());
        let state = input.initial_state().expect("valid");
        assert_eq!(state.total_demand("Route 1"), 3.0);
        assert_eq!(state.route_ids().next().map(String::as_str), Some("Route 1"));
    }
}
