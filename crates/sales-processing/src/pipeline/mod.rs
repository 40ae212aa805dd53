//! Pipeline module.
//!
//! This module provides the cleaning pipeline, its progress reporting and the
//! CSV input/output around it.

mod builder;
pub mod io;
pub mod progress;

pub use builder::{CleaningOutcome, Pipeline, PipelineBuilder, clean_file};
pub use io::{read_orders_csv, write_csv_atomic};
pub use progress::{CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
