//! Dense stop-keyed distance matrix.

use indexmap::IndexMap;

use super::DistanceOracle;
use crate::error::{Error, Result};

/// A dense n×n distance matrix stored in row-major order, addressed by
/// stop name.
///
/// Entries that were never set are absent and answer queries with
/// [`Error::LookupFailure`]. The diagonal is zero.
///
/// # Examples
///
/// ```
/// use u_consolidate::distance::{DistanceMatrix, DistanceOracle};
///
/// let mut dm = DistanceMatrix::new(["p", "q", "College"]);
/// dm.set("p", "College", 4.0).unwrap();
/// dm.set("q", "College", 2.0).unwrap();
/// assert_eq!(dm.distance("p", "College").unwrap(), 4.0);
/// assert_eq!(dm.distance("p", "p").unwrap(), 0.0);
/// assert!(dm.distance("College", "p").is_err());
/// assert_eq!(dm.size(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    index: IndexMap<String, usize>,
    data: Vec<Option<f64>>,
    size: usize,
}

impl DistanceMatrix {
    /// Creates a matrix over the given stops with only the diagonal set.
    ///
    /// Repeated names share one row.
    pub fn new<I, S>(stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = IndexMap::new();
        for stop in stops {
            let next = index.len();
            index.entry(stop.into()).or_insert(next);
        }
        let size = index.len();
        let mut data = vec![None; size * size];
        for i in 0..size {
            data[i * size + i] = Some(0.0);
        }
        Self { index, data, size }
    }

    /// Builds a matrix from a nested `from -> to -> distance` mapping.
    ///
    /// Every stop named as an origin or a destination gets a row.
    pub fn from_nested(nested: &IndexMap<String, IndexMap<String, f64>>) -> Result<Self> {
        let names = nested
            .iter()
            .flat_map(|(from, row)| std::iter::once(from).chain(row.keys()))
            .cloned()
            .collect::<Vec<_>>();
        let mut dm = Self::new(names);
        for (from, row) in nested {
            for (to, &distance) in row {
                dm.set(from, to, distance)?;
            }
        }
        Ok(dm)
    }

    /// Parses a nested JSON object `{"from": {"to": distance}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let nested: IndexMap<String, IndexMap<String, f64>> = serde_json::from_str(json)?;
        Self::from_nested(&nested)
    }

    /// Sets the distance from `from` to `to`.
    ///
    /// Fails if either stop is unknown or the distance is negative or not finite.
    pub fn set(&mut self, from: &str, to: &str, distance: f64) -> Result<()> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::invalid_input(format!(
                "distance from `{from}` to `{to}` must be finite and non-negative, got {distance}"
            )));
        }
        let (i, j) = match (self.index.get(from), self.index.get(to)) {
            (Some(&i), Some(&j)) => (i, j),
            _ => return Err(Error::lookup_failure(from, to)),
        };
        self.data[i * self.size + j] = Some(distance);
        Ok(())
    }

    /// Sets both directions at once.
    pub fn set_symmetric(&mut self, a: &str, b: &str, distance: f64) -> Result<()> {
        self.set(a, b, distance)?;
        self.set(b, a, distance)
    }

    /// Returns the stored distance, if any.
    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        let i = *self.index.get(from)?;
        let j = *self.index.get(to)?;
        self.data[i * self.size + j]
    }

    /// Number of stops in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stop names in row order.
    pub fn stops(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn contains(&self, stop: &str) -> bool {
        self.index.contains_key(stop)
    }

    /// Returns `true` if every stop pair has a distance in both directions.
    pub fn is_complete(&self) -> bool {
        self.data.iter().all(Option::is_some)
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    ///
    /// A pair set in only one direction counts as asymmetric.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                match (self.data[i * self.size + j], self.data[j * self.size + i]) {
                    (Some(a), Some(b)) if (a - b).abs() <= tol => {}
                    (None, None) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// Converts back into a nested mapping, skipping absent entries.
    pub fn to_nested(&self) -> IndexMap<String, IndexMap<String, f64>> {
        self.index
            .iter()
            .map(|(from, &i)| {
                let row = self
                    .index
                    .iter()
                    .filter_map(|(to, &j)| {
                        self.data[i * self.size + j].map(|d| (to.clone(), d))
                    })
                    .collect();
                (from.clone(), row)
            })
            .collect()
    }
}

impl DistanceOracle for DistanceMatrix {
    fn distance(&self, from: &str, to: &str) -> Result<f64> {
        self.get(from, to)
            .ok_or_else(|| Error::lookup_failure(from, to))
    }
}
