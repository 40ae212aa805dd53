//! Stage 4: line item deduplication.

use super::{CleaningStep, StepContext};
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction};
use crate::utils::require_column;
use polars::prelude::*;

/// Removes rows sharing the deduplication key, keeping the last occurrence.
///
/// Surviving rows keep their relative order. Null key cells compare equal.
pub struct Deduplicator;

impl CleaningStep for Deduplicator {
    fn name(&self) -> &'static str {
        "deduplicator"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::Deduplication
    }

    fn apply(&self, df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;
        for column in &config.dedup_key {
            require_column(&df, column)?;
        }

        let deduped = df.unique_stable(
            Some(config.dedup_key.as_slice()),
            UniqueKeepStrategy::Last,
            None,
        )?;
        let removed = df.height() - deduped.height();

        ctx.record(CleaningAction::new(
            ActionType::DuplicatesRemoved,
            "dataset",
            format!("Removed repeated ({}) line items", config.dedup_key.join(", ")),
            removed,
        ));
        Ok(deduped)
    }
}
