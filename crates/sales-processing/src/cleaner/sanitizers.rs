//! Stage 3: whitespace and case normalization of text columns.

use super::{CleaningStep, StepContext};
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CaseRule, CleaningAction};
use crate::utils::map_text_column;
use polars::prelude::*;

/// Trim a cell and apply the column's case rule. Blank cells become null.
pub(crate) fn normalize_value(value: Option<&str>, rule: CaseRule) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(rule.apply(trimmed))
    }
}

/// Strips whitespace and applies the per-column case rule to every
/// categorical and identifier column.
pub struct ValueNormalizer;

impl CleaningStep for ValueNormalizer {
    fn name(&self) -> &'static str {
        "value_normalizer"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::ValueNormalization
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;

        for column in config.text_columns() {
            let rule = config.case_rule(column);
            let changed = map_text_column(&mut df, column, |value| normalize_value(value, rule))?;

            let description = match rule {
                CaseRule::Upper => "Trimmed and upper-cased values",
                CaseRule::Lower => "Trimmed and lower-cased values",
            };
            ctx.record(CleaningAction::new(
                ActionType::ValueNormalized,
                column,
                description,
                changed,
            ));
        }

        Ok(df)
    }
}
