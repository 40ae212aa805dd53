//! Output quality validation.
//!
//! Runs after the last cleaning step and re-checks the invariants of the
//! cleaned table, turning anything unexpected into data-quality warnings.

mod validator;

pub use validator::OutputValidator;
