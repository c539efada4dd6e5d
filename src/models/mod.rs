//! Route model: the caller-supplied input and the working state mutated by
//! accepted merges.
//!
//! Stops and routes are identified by name. A route never lists the hub;
//! the hub is the implicit terminus after its last stop.

mod input;
mod state;

pub use input::MergeInput;
pub use state::RouteState;

/// Name of a stop.
pub type StopId = String;

/// Name of a route.
pub type RouteId = String;
