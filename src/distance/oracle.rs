//! Distance oracle trait.

use std::collections::HashMap;
use std::hash::BuildHasher;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Answers stop-to-stop distance queries.
///
/// Distances are non-negative and may be asymmetric. A missing pair is a
/// contract violation reported as [`Error::LookupFailure`].
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use u_consolidate::distance::DistanceOracle;
///
/// let mut nested: HashMap<String, HashMap<String, f64>> = HashMap::new();
/// nested.entry("a".into()).or_default().insert("hub".into(), 4.0);
///
/// assert_eq!(nested.distance("a", "hub").unwrap(), 4.0);
/// assert!(nested.distance("hub", "a").is_err());
/// ```
pub trait DistanceOracle: Send + Sync {
    /// Travel distance from `from` to `to`.
    fn distance(&self, from: &str, to: &str) -> Result<f64>;

    /// Distance from `stop` to the hub.
    fn hub_distance(&self, stop: &str, hub: &str) -> Result<f64> {
        self.distance(stop, hub)
    }
}

impl<S: BuildHasher + Send + Sync> DistanceOracle for HashMap<String, HashMap<String, f64, S>, S> {
    fn distance(&self, from: &str, to: &str) -> Result<f64> {
        self.get(from)
            .and_then(|row| row.get(to))
            .copied()
            .ok_or_else(|| Error::lookup_failure(from, to))
    }
}

impl<S: BuildHasher + Send + Sync> DistanceOracle for IndexMap<String, IndexMap<String, f64, S>, S> {
    fn distance(&self, from: &str, to: &str) -> Result<f64> {
        self.get(from)
            .and_then(|row| row.get(to))
            .copied()
            .ok_or_else(|| Error::lookup_failure(from, to))
    }
}

impl<T: DistanceOracle + ?Sized> DistanceOracle for &T {
    fn distance(&self, from: &str, to: &str) -> Result<f64> {
        (**self).distance(from, to)
    }
}
