//! Merge result validator.

use crate::config::MergeConfig;
use crate::distance::DistanceOracle;
use crate::error::Result;
use crate::merge::MergeOutcome;
use crate::models::{RouteId, RouteState, StopId};

const TOLERANCE: f64 = 1e-9;

/// A type of invariant broken by a merge result.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationType {
    /// Route demand above the capacity limit.
    CapacityExceeded {
        route_id: RouteId,
        load: f64,
        capacity: f64,
    },
    /// A stop farther from the hub than the stop before it.
    DirectionViolated {
        route_id: RouteId,
        /// Index of the offending stop.
        position: usize,
        previous: StopId,
        stop: StopId,
    },
    /// Final demand differs from initial demand minus ignored demand.
    DemandNotConserved { expected: f64, actual: f64 },
    /// A route total that disagrees with its per-stop ledger.
    TotalMismatch {
        route_id: RouteId,
        total: f64,
        ledger_sum: f64,
    },
    /// An eliminated route dropped more demand than the budget allows.
    IgnoredBudgetExceeded {
        route_id: RouteId,
        ignored: f64,
        budget: f64,
    },
}

/// An invariant violation found by [`MergeValidator`].
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: ViolationType,
}

impl Violation {
    pub fn new(kind: ViolationType) -> Self {
        Self { kind }
    }
}

/// Checks merge states and outcomes against the engine's invariants.
///
/// Every route is checked, including routes the run never touched, so an
/// input that was already over capacity is reported as well.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use u_consolidate::config::MergeConfig;
/// use u_consolidate::distance::DistanceMatrix;
/// use u_consolidate::evaluation::MergeValidator;
/// use u_consolidate::models::RouteState;
///
/// let mut dm = DistanceMatrix::new(["near", "far", "H"]);
/// dm.set("near", "H", 1.0).unwrap();
/// dm.set("far", "H", 5.0).unwrap();
///
/// let mut routes = IndexMap::new();
/// routes.insert("A".to_string(), vec!["near".to_string(), "far".to_string()]);
/// let state = RouteState::from_parts(routes, IndexMap::new());
///
/// let config = MergeConfig::default();
/// let validator = MergeValidator::new(&dm, "H", &config);
/// let violations = validator.check_state(&state).unwrap();
/// assert_eq!(violations.len(), 1);
/// ```
pub struct MergeValidator<'a> {
    oracle: &'a dyn DistanceOracle,
    hub: &'a str,
    config: &'a MergeConfig,
}

impl<'a> MergeValidator<'a> {
    pub fn new(oracle: &'a dyn DistanceOracle, hub: &'a str, config: &'a MergeConfig) -> Self {
        Self {
            oracle,
            hub,
            config,
        }
    }

    /// Checks capacity, direction and total consistency of every route.
    pub fn check_state(&self, state: &RouteState) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for (route_id, stops) in state.routes() {
            let total = state.total_demand(route_id);
            if total > self.config.capacity_limit + TOLERANCE {
                violations.push(Violation::new(ViolationType::CapacityExceeded {
                    route_id: route_id.clone(),
                    load: total,
                    capacity: self.config.capacity_limit,
                }));
            }

            let ledger_sum: f64 = state
                .stop_demands(route_id)
                .map(|ledger| ledger.values().sum::<f64>())
                .unwrap_or(0.0);
            if (total - ledger_sum).abs() > TOLERANCE {
                violations.push(Violation::new(ViolationType::TotalMismatch {
                    route_id: route_id.clone(),
                    total,
                    ledger_sum,
                }));
            }

            let mut prev: Option<(&StopId, f64)> = None;
            for (position, stop) in stops.iter().enumerate() {
                let d = self.oracle.hub_distance(stop, self.hub)?;
                if let Some((previous, prev_d)) = prev {
                    if d > prev_d + TOLERANCE {
                        violations.push(Violation::new(ViolationType::DirectionViolated {
                            route_id: route_id.clone(),
                            position,
                            previous: previous.clone(),
                            stop: stop.clone(),
                        }));
                    }
                }
                prev = Some((stop, d));
            }
        }

        Ok(violations)
    }

    /// Checks the final state of a run and its ledger.
    pub fn check_outcome(&self, outcome: &MergeOutcome) -> Result<Vec<Violation>> {
        let mut violations = self.check_state(&outcome.final_state())?;
        let ledger = &outcome.ledger;

        for removal in &ledger.removed_routes {
            let ignored = removal.ignored_demand();
            if ignored > self.config.max_ignored_demand + TOLERANCE {
                violations.push(Violation::new(ViolationType::IgnoredBudgetExceeded {
                    route_id: removal.route_id.clone(),
                    ignored,
                    budget: self.config.max_ignored_demand,
                }));
            }
        }

        let expected = ledger.initial_demand() - ledger.ignored_demand();
        let actual: f64 = outcome
            .final_demands
            .values()
            .flat_map(|ledger| ledger.values())
            .sum();
        if (expected - actual).abs() > TOLERANCE * expected.abs().max(1.0) {
            violations.push(Violation::new(ViolationType::DemandNotConserved {
                expected,
                actual,
            }));
        }

        for (route_id, record) in &ledger.final_routes {
            let ledger_sum: f64 = outcome
                .final_demands
                .get(route_id)
                .map(|l| l.values().sum::<f64>())
                .unwrap_or(0.0);
            if (record.total_demand - ledger_sum).abs() > TOLERANCE {
                violations.push(Violation::new(ViolationType::TotalMismatch {
                    route_id: route_id.clone(),
                    total: record.total_demand,
                    ledger_sum,
                }));
            }
        }

        Ok(violations)
    }
}
