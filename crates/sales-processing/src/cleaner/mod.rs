//! Cleaning steps for the order line table.
//!
//! Each stage of the pipeline is a separate [`CleaningStep`] that takes a
//! table and returns a table, so stages can be tested in isolation. The
//! ordered list used by the pipeline comes from [`default_steps`]:
//!
//! 1. [`SchemaNormalizer`] - header normalization, renames, junk removal
//! 2. [`TypeCoercer`] - date parsing and numeric coercion
//! 3. [`ValueNormalizer`] - whitespace stripping and case rules
//! 4. [`Deduplicator`] - last occurrence of each line item wins
//! 5. [`MissingValueReconciler`] - country default, fulfillment merge
//! 6. [`CategoryRelabeler`] - near-duplicate category merge
//! 7. [`StatusReconciler`] - courier status precedence and drop list
//! 8. [`RegionCanonicalizer`] - shipping region validation
//! 9. [`FormatFixer`] - postal code artifact and promotion flag

mod converters;
mod dedup;
mod fixups;
mod reconcile;
mod regions;
mod sanitizers;
mod schema;
mod status;
mod type_coercer;

pub use dedup::Deduplicator;
pub use fixups::FormatFixer;
pub use reconcile::{CategoryRelabeler, MissingValueReconciler};
pub use regions::RegionCanonicalizer;
pub use sanitizers::ValueNormalizer;
pub use schema::{SchemaNormalizer, normalize_header};
pub use status::StatusReconciler;
pub use type_coercer::TypeCoercer;

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{CleaningAction, DataQualityWarning};
use polars::prelude::*;
use tracing::{debug, warn};

/// A single named transform in the cleaning pipeline.
pub trait CleaningStep: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Stage this step implements.
    fn stage(&self) -> CleaningStage;

    /// Transform the table. Fatal problems are returned as errors;
    /// non-fatal findings go into the context.
    fn apply(&self, df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame>;
}

/// Shared state threaded through the steps of one run.
pub struct StepContext<'a> {
    pub config: &'a CleaningConfig,
    pub actions: Vec<CleaningAction>,
    pub warnings: Vec<DataQualityWarning>,
}

impl<'a> StepContext<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self {
            config,
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an action. Actions that touched nothing are skipped.
    pub fn record(&mut self, action: CleaningAction) {
        if action.affected == 0 {
            return;
        }
        debug!(
            "{} [{}]: {} ({})",
            action.action_type.display_name(),
            action.target,
            action.description,
            action.affected
        );
        self.actions.push(action);
    }

    pub fn warn(&mut self, warning: DataQualityWarning) {
        warn!("Data quality: {}", warning);
        self.warnings.push(warning);
    }
}

/// The nine transform steps in execution order.
pub fn default_steps() -> Vec<Box<dyn CleaningStep>> {
    vec![
        Box::new(SchemaNormalizer),
        Box::new(TypeCoercer),
        Box::new(ValueNormalizer),
        Box::new(Deduplicator),
        Box::new(MissingValueReconciler),
        Box::new(CategoryRelabeler),
        Box::new(StatusReconciler),
        Box::new(RegionCanonicalizer),
        Box::new(FormatFixer),
    ]
}
