//! Ledger record types.

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::{RouteId, RouteState, StopId};

/// One stop of an eliminated route placed on a surviving route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopAssignment {
    pub stop: StopId,
    pub to_route: RouteId,
    /// Demand moved with the stop.
    pub demand: f64,
    /// Index of the stop in the receiving route right after placement.
    pub position: usize,
    /// The receiving route already visited this stop; only demand moved.
    #[serde(default)]
    pub joined_existing: bool,
}

/// A low-demand stop dropped while eliminating its route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredStop {
    pub stop: StopId,
    pub demand: f64,
}

/// An eliminated route with every reassignment it caused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRemoval {
    pub route_id: RouteId,
    pub stops_assigned: Vec<StopAssignment>,
    #[serde(default)]
    pub stops_ignored: Vec<IgnoredStop>,
}

impl RouteRemoval {
    /// Demand dropped rather than reassigned.
    pub fn ignored_demand(&self) -> f64 {
        self.stops_ignored.iter().map(|s| s.demand).sum()
    }

    /// Demand moved onto surviving routes.
    pub fn assigned_demand(&self) -> f64 {
        self.stops_assigned.iter().map(|s| s.demand).sum()
    }
}

/// A single accepted stop insertion, in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOperation {
    pub from_route: RouteId,
    pub to_route: RouteId,
    pub stop: StopId,
    pub demand: f64,
    pub insert_position: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialRoute {
    pub stops: Vec<StopId>,
    pub total_demand: f64,
    pub stop_demands: IndexMap<StopId, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRoute {
    pub stops: Vec<StopId>,
    pub total_demand: f64,
}

/// Audit trail of one consolidation run.
///
/// Serializes to a tree of strings, numbers, sequences and mappings.
///
/// # Examples
///
/// ```
/// use u_consolidate::ledger::MergeLedger;
/// use u_consolidate::models::RouteState;
///
/// let mut ledger = MergeLedger::new();
/// ledger.record_initial_state(&RouteState::empty());
/// ledger.record_final_state(&RouteState::empty());
///
/// let tree = ledger.to_value().unwrap();
/// assert!(tree["removed_routes"].as_array().unwrap().is_empty());
/// assert!(tree["timestamp"].is_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeLedger {
    pub timestamp: String,
    pub initial_routes: IndexMap<RouteId, InitialRoute>,
    pub removed_routes: Vec<RouteRemoval>,
    pub merge_operations: Vec<MergeOperation>,
    pub final_routes: IndexMap<RouteId, FinalRoute>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl MergeLedger {
    /// Creates an empty ledger stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: now(),
            initial_routes: IndexMap::new(),
            removed_routes: Vec::new(),
            merge_operations: Vec::new(),
            final_routes: IndexMap::new(),
        }
    }

    /// Records every route with its ledger-derived total demand.
    pub fn record_initial_state(&mut self, state: &RouteState) {
        self.initial_routes = state
            .routes()
            .iter()
            .map(|(id, stops)| {
                let stop_demands = state.stop_demands(id).cloned().unwrap_or_default();
                let record = InitialRoute {
                    stops: stops.clone(),
                    total_demand: stop_demands.values().sum(),
                    stop_demands,
                };
                (id.clone(), record)
            })
            .collect();
    }

    /// Records an eliminated route and appends one timestamped operation per
    /// reassigned stop.
    pub fn record_removal(&mut self, removal: RouteRemoval) {
        let stamp = now();
        self.merge_operations
            .extend(removal.stops_assigned.iter().map(|a| MergeOperation {
                from_route: removal.route_id.clone(),
                to_route: a.to_route.clone(),
                stop: a.stop.clone(),
                demand: a.demand,
                insert_position: a.position,
                timestamp: stamp.clone(),
            }));
        self.removed_routes.push(removal);
    }

    pub fn record_final_state(&mut self, state: &RouteState) {
        self.final_routes = state
            .routes()
            .iter()
            .map(|(id, stops)| {
                let total_demand = state
                    .stop_demands(id)
                    .map(|ledger| ledger.values().sum::<f64>())
                    .unwrap_or(0.0);
                let record = FinalRoute {
                    stops: stops.clone(),
                    total_demand,
                };
                (id.clone(), record)
            })
            .collect();
    }

    pub fn num_initial_routes(&self) -> usize {
        self.initial_routes.len()
    }

    pub fn num_removed_routes(&self) -> usize {
        self.removed_routes.len()
    }

    pub fn num_final_routes(&self) -> usize {
        self.final_routes.len()
    }

    pub fn num_merge_operations(&self) -> usize {
        self.merge_operations.len()
    }

    pub fn initial_demand(&self) -> f64 {
        self.initial_routes.values().map(|r| r.total_demand).sum()
    }

    pub fn final_demand(&self) -> f64 {
        self.final_routes.values().map(|r| r.total_demand).sum()
    }

    /// Demand dropped across all eliminated routes.
    pub fn ignored_demand(&self) -> f64 {
        self.removed_routes.iter().map(RouteRemoval::ignored_demand).sum()
    }

    /// Compares two ledgers with every timestamp masked out.
    pub fn same_content(&self, other: &Self) -> bool {
        self.without_timestamps() == other.without_timestamps()
    }

    fn without_timestamps(&self) -> Self {
        let mut masked = self.clone();
        masked.timestamp.clear();
        for op in &mut masked.merge_operations {
            op.timestamp.clear();
        }
        masked
    }

    /// The ledger as a JSON value tree.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for MergeLedger {
    fn default() -> Self {
        Self::new()
    }
}
