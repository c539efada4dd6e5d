//! Distance oracle and its in-memory materialization.
//!
//! The engine never computes distances itself; it queries a
//! [`DistanceOracle`] for every stop pair it compares, including each stop
//! paired with the hub.

mod matrix;
mod oracle;

pub use matrix::DistanceMatrix;
pub use oracle::DistanceOracle;
