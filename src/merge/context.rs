//! Shared, read-only inputs of a consolidation run.

use indexmap::IndexSet;

use super::CanonicalOrder;
use crate::config::MergeConfig;
use crate::distance::DistanceOracle;
use crate::error::Result;
use crate::models::StopId;

/// Everything a merge attempt reads but never mutates.
///
/// Borrowed by every trial; `Sync`, so trials may run on several threads.
#[derive(Clone, Copy)]
pub struct MergeContext<'a> {
    oracle: &'a dyn DistanceOracle,
    hub: &'a str,
    faculty_stops: &'a IndexSet<StopId>,
    canonical: &'a CanonicalOrder,
    config: &'a MergeConfig,
}

impl<'a> MergeContext<'a> {
    pub fn new(
        oracle: &'a dyn DistanceOracle,
        hub: &'a str,
        faculty_stops: &'a IndexSet<StopId>,
        canonical: &'a CanonicalOrder,
        config: &'a MergeConfig,
    ) -> Self {
        Self {
            oracle,
            hub,
            faculty_stops,
            canonical,
            config,
        }
    }

    pub fn hub(&self) -> &'a str {
        self.hub
    }

    pub fn config(&self) -> &'a MergeConfig {
        self.config
    }

    pub fn canonical(&self) -> &'a CanonicalOrder {
        self.canonical
    }

    pub fn is_faculty(&self, stop: &str) -> bool {
        self.faculty_stops.contains(stop)
    }

    pub fn distance(&self, from: &str, to: &str) -> Result<f64> {
        self.oracle.distance(from, to)
    }

    pub fn hub_distance(&self, stop: &str) -> Result<f64> {
        self.oracle.hub_distance(stop, self.hub)
    }
}
