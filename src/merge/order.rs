//! Canonical stop order restoration.

use indexmap::IndexMap;
use log::warn;

use crate::models::{RouteId, StopId};

/// Stop order of every route as first observed, before any merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalOrder {
    ranks: IndexMap<RouteId, IndexMap<StopId, usize>>,
}

impl CanonicalOrder {
    /// Captures the order of each route's stops.
    pub fn from_routes(routes: &IndexMap<RouteId, Vec<StopId>>) -> Self {
        let ranks = routes
            .iter()
            .map(|(id, stops)| {
                let rank = stops
                    .iter()
                    .enumerate()
                    .map(|(i, stop)| (stop.clone(), i))
                    .collect();
                (id.clone(), rank)
            })
            .collect();
        Self { ranks }
    }

    /// Canonical sequence of a route.
    pub fn sequence(&self, route_id: &str) -> Option<Vec<&str>> {
        self.ranks
            .get(route_id)
            .map(|rank| rank.keys().map(String::as_str).collect())
    }

    fn rank(&self, route_id: &str) -> Option<&IndexMap<StopId, usize>> {
        self.ranks.get(route_id)
    }
}

/// Returns `stops` with the route's canonical stops in canonical relative
/// order.
///
/// Stops that belong to the route's canonical sequence are sorted by their
/// canonical position and written back into the slots they occupied; stops
/// foreign to it (inserted from eliminated routes) stay where they are.
/// Nothing is ever added or removed. A route with no canonical sequence is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use u_consolidate::merge::{verify_and_correct_order, CanonicalOrder};
///
/// let mut routes = IndexMap::new();
/// routes.insert("A".to_string(), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
/// let canonical = CanonicalOrder::from_routes(&routes);
///
/// let scrambled: Vec<String> = ["c", "x", "a", "b"].iter().map(|s| s.to_string()).collect();
/// let fixed = verify_and_correct_order("A", &scrambled, &canonical);
/// assert_eq!(fixed, vec!["a", "x", "b", "c"]);
/// ```
pub fn verify_and_correct_order(
    route_id: &str,
    stops: &[StopId],
    canonical: &CanonicalOrder,
) -> Vec<StopId> {
    let Some(rank) = canonical.rank(route_id) else {
        return stops.to_vec();
    };

    let slots: Vec<usize> = stops
        .iter()
        .enumerate()
        .filter(|(_, stop)| rank.contains_key(stop.as_str()))
        .map(|(i, _)| i)
        .collect();
    let mut known: Vec<&StopId> = slots.iter().map(|&i| &stops[i]).collect();
    known.sort_by_key(|stop| rank[stop.as_str()]);

    let mut corrected = stops.to_vec();
    for (&slot, stop) in slots.iter().zip(known) {
        corrected[slot] = stop.clone();
    }

    if corrected != stops {
        warn!("route {route_id}: restored canonical order {stops:?} -> {corrected:?}");
    }
    corrected
}
