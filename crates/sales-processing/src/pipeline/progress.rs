//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline is single-threaded; progress updates exist so the CLI (or any
//! embedding application) can log stage transitions as they happen.
//!
//! # Example
//!
//! ```rust,ignore
//! use sales_processing::Pipeline;
//!
//! let outcome = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Ordered stages of the cleaning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Header normalization, renames, junk removal, required-column check
    SchemaNormalization,
    /// Date parsing and numeric coercion
    TypeCoercion,
    /// Whitespace stripping and per-column case rules
    ValueNormalization,
    /// Removal of repeated line items
    Deduplication,
    /// Country default and fulfillment label merge
    MissingValues,
    /// Near-duplicate category merge
    CategoryRelabeling,
    /// Courier status reconciliation and status drop list
    StatusReconciliation,
    /// Shipping region canonicalization
    RegionValidation,
    /// Postal code and promotion flag repairs
    FormatFixups,
    /// Writing the cleaned table
    Persistence,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// Stages that transform the table, in execution order.
    pub const TRANSFORMS: [CleaningStage; 9] = [
        Self::SchemaNormalization,
        Self::TypeCoercion,
        Self::ValueNormalization,
        Self::Deduplication,
        Self::MissingValues,
        Self::CategoryRelabeling,
        Self::StatusReconciliation,
        Self::RegionValidation,
        Self::FormatFixups,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SchemaNormalization => "Normalizing Schema",
            Self::TypeCoercion => "Coercing Types",
            Self::ValueNormalization => "Normalizing Values",
            Self::Deduplication => "Removing Duplicates",
            Self::MissingValues => "Reconciling Missing Values",
            Self::CategoryRelabeling => "Relabeling Categories",
            Self::StatusReconciliation => "Reconciling Status",
            Self::RegionValidation => "Validating Regions",
            Self::FormatFixups => "Fixing Formats",
            Self::Persistence => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// 1-based position in the run, `None` for terminal states.
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Self::Persistence => Some(10),
            Self::Complete | Self::Failed => None,
            stage => Self::TRANSFORMS.iter().position(|s| s == stage).map(|i| i + 1),
        }
    }

    /// Fraction of the run completed when this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => stage.ordinal().map_or(0.0, |n| (n - 1) as f32 / 10.0),
        }
    }
}

/// Progress update emitted at stage boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: CleaningStage,
    /// Overall progress (0.0 - 1.0)
    pub progress: f32,
    pub message: String,
    /// Row count at the time of the update, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl ProgressUpdate {
    /// Progress update for a stage; `stage_progress` is 0.0 at start, 1.0 at end.
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + stage_progress.clamp(0.0, 1.0) / 10.0;
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            rows: None,
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(CleaningStage::Complete, 0.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CleaningStage::Failed, 0.0, message)
    }
}

/// Receiver for progress updates.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_stage_ordinals_follow_execution_order() {
        let ordinals: Vec<usize> = CleaningStage::TRANSFORMS
            .iter()
            .filter_map(|s| s.ordinal())
            .collect();
        assert_eq!(ordinals, (1..=9).collect::<Vec<_>>());
        assert_eq!(CleaningStage::Persistence.ordinal(), Some(10));
        assert_eq!(CleaningStage::Complete.ordinal(), None);
    }

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::Deduplication, 1.0, "done");
        assert_eq!(update.stage, CleaningStage::Deduplication);
        assert!((update.progress - 0.4).abs() < 1e-6);
        assert!(update.rows.is_none());
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done!").with_rows(12);
        assert_eq!(update.stage, CleaningStage::Complete);
        assert_eq!(update.progress, 1.0);
        assert_eq!(update.rows, Some(12));
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(CleaningStage::TypeCoercion, 0.0, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&CleaningStage::RegionValidation).unwrap();
        assert_eq!(json, "\"region_validation\"");
        let json = serde_json::to_string(&CleaningStage::StatusReconciliation).unwrap();
        assert_eq!(json, "\"status_reconciliation\"");
    }

    #[test]
    fn test_display_names() {
        assert_eq!(CleaningStage::Deduplication.display_name(), "Removing Duplicates");
        assert_eq!(CleaningStage::Failed.display_name(), "Failed");
    }
}
