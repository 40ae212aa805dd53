//! Stage 9: formatting artifacts left by upstream tooling.

use super::{CleaningStep, StepContext};
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{map_text_column, text_values};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// Trailing `.0` left when a postal code was stored as a float.
static FLOAT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.0$").unwrap());

pub(crate) fn strip_float_suffix(code: &str) -> String {
    FLOAT_SUFFIX.replace(code, "").into_owned()
}

/// Strips the postal code float artifact and collapses the promotion
/// identifiers into a boolean "had any promotion" flag.
pub struct FormatFixer;

impl CleaningStep for FormatFixer {
    fn name(&self) -> &'static str {
        "format_fixer"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::FormatFixups
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;

        let fixed = map_text_column(&mut df, &config.postal_code_column, |value| {
            value.map(strip_float_suffix)
        })?;
        ctx.record(CleaningAction::new(
            ActionType::FormatFixed,
            config.postal_code_column.as_str(),
            "Stripped trailing '.0' from postal codes",
            fixed,
        ));

        let column = config.promotion_column.as_str();
        let flags: Vec<bool> = text_values(&df, column)?
            .iter()
            .map(Option::is_some)
            .collect();
        let promoted = flags.iter().filter(|f| **f).count();
        df.replace(column, Series::new(column.into(), flags))?;
        ctx.record(CleaningAction::new(
            ActionType::TypeCoerced,
            column,
            format!("Collapsed promotion identifiers to a flag ({} promoted)", promoted),
            df.height(),
        ));

        Ok(df)
    }
}
