//! Human-readable merge summaries and cross-group statistics.

use std::fmt;

use super::MergeLedger;

impl fmt::Display for MergeLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== MERGE OPERATION SUMMARY ===")?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;

        writeln!(f, "\nINITIAL ROUTES:")?;
        let mut initial: Vec<_> = self.initial_routes.iter().collect();
        initial.sort_by(|a, b| a.0.cmp(b.0));
        for (route_id, route) in initial {
            writeln!(f, "{route_id}:")?;
            writeln!(f, "  Total Demand: {}", route.total_demand)?;
            writeln!(f, "  Stops:")?;
            for (stop, demand) in &route.stop_demands {
                writeln!(f, "    - {stop} (demand: {demand})")?;
            }
        }

        if !self.removed_routes.is_empty() {
            writeln!(f, "\nREMOVED ROUTES:")?;
            for removal in &self.removed_routes {
                writeln!(f, "- {} was merged into:", removal.route_id)?;
                for a in &removal.stops_assigned {
                    writeln!(
                        f,
                        "  * {} -> {} (pos: {}, demand: {})",
                        a.stop, a.to_route, a.position, a.demand
                    )?;
                }
                for ignored in &removal.stops_ignored {
                    writeln!(
                        f,
                        "  * {} dropped (demand: {})",
                        ignored.stop, ignored.demand
                    )?;
                }
            }
        }

        writeln!(f, "\nFINAL MERGED ROUTES:")?;
        let mut finals: Vec<_> = self.final_routes.iter().collect();
        finals.sort_by(|a, b| a.0.cmp(b.0));
        for (route_id, route) in finals {
            writeln!(f, "{route_id}:")?;
            writeln!(f, "  Total Demand: {}", route.total_demand)?;
            writeln!(f, "  Stop Sequence:")?;
            for (i, stop) in route.stops.iter().enumerate() {
                writeln!(f, "  {}. {stop}", i + 1)?;
            }
        }

        writeln!(f, "\nSTATISTICS:")?;
        writeln!(f, "Initial route count: {}", self.num_initial_routes())?;
        writeln!(f, "Routes removed: {}", self.num_removed_routes())?;
        writeln!(f, "Final route count: {}", self.num_final_routes())?;
        write!(f, "Total merge operations: {}", self.num_merge_operations())
    }
}

/// Route counts aggregated over several consolidation runs.
///
/// # Examples
///
/// ```
/// use u_consolidate::ledger::{MergeLedger, MergeStatistics};
///
/// let stats = MergeStatistics::from_ledgers(&[MergeLedger::new()]);
/// assert_eq!(stats.initial_routes, 0);
/// assert_eq!(stats.reduction_percent(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStatistics {
    pub initial_routes: usize,
    pub removed_routes: usize,
    pub final_routes: usize,
    pub merge_operations: usize,
}

impl MergeStatistics {
    pub fn from_ledgers(ledgers: &[MergeLedger]) -> Self {
        ledgers.iter().fold(Self::default(), |acc, ledger| Self {
            initial_routes: acc.initial_routes + ledger.num_initial_routes(),
            removed_routes: acc.removed_routes + ledger.num_removed_routes(),
            final_routes: acc.final_routes + ledger.num_final_routes(),
            merge_operations: acc.merge_operations + ledger.num_merge_operations(),
        })
    }

    /// Share of initial routes that were eliminated, in percent.
    pub fn reduction_percent(&self) -> f64 {
        if self.initial_routes == 0 {
            return 0.0;
        }
        self.removed_routes as f64 / self.initial_routes as f64 * 100.0
    }
}

impl fmt::Display for MergeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== OVERALL STATISTICS ====")?;
        writeln!(f, "Total initial routes processed: {}", self.initial_routes)?;
        writeln!(f, "Total routes removed: {}", self.removed_routes)?;
        writeln!(f, "Total final routes: {}", self.final_routes)?;
        writeln!(f, "Total merge operations: {}", self.merge_operations)?;
        write!(
            f,
            "Route reduction: {} ({:.2}%)",
            self.removed_routes,
            self.reduction_percent()
        )
    }
}
