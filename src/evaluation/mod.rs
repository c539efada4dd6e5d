//! Post-hoc checks of merge results.
//!
//! - [`MergeValidator`] — capacity, direction, demand conservation and
//!   ledger consistency of a state or a finished run

mod validator;

pub use validator::{MergeValidator, Violation, ViolationType};
