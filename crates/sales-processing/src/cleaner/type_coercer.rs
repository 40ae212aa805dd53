//! Stage 2: explicit type coercion of the all-text raw table.

use super::converters::{date_to_epoch_days, parse_amount, parse_count, parse_date};
use super::{CleaningStep, StepContext};
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction, ColumnKind};
use crate::utils::{column_names, text_values};
use polars::prelude::*;
use tracing::debug;

/// Parses the date column and the numeric columns.
///
/// Categorical and identifier columns stay text; their normalization happens
/// in the next stage.
pub struct TypeCoercer;

impl TypeCoercer {
    fn coerce_date(df: &mut DataFrame, ctx: &mut StepContext<'_>, column: &str) -> Result<()> {
        let format = ctx.config.date_format.clone();

        let days = text_values(df, column)?
            .iter()
            .enumerate()
            .map(|(row, value)| parse_date(value.as_deref(), &format, row).map(date_to_epoch_days))
            .collect::<Result<Vec<i32>>>()?;

        let series = Series::new(column.into(), days).cast(&DataType::Date)?;
        let rows = series.len();
        df.replace(column, series)?;

        ctx.record(CleaningAction::new(
            ActionType::TypeCoerced,
            column,
            format!("Parsed dates with format '{}'", format),
            rows,
        ));
        Ok(())
    }

    fn coerce_counts(df: &mut DataFrame, ctx: &mut StepContext<'_>, column: &str) -> Result<()> {
        let counts = text_values(df, column)?
            .iter()
            .enumerate()
            .map(|(row, value)| parse_count(column, value.as_deref(), row))
            .collect::<Result<Vec<i64>>>()?;

        let rows = counts.len();
        df.replace(column, Series::new(column.into(), counts))?;

        ctx.record(CleaningAction::new(
            ActionType::TypeCoerced,
            column,
            "Converted to non-negative integer",
            rows,
        ));
        Ok(())
    }

    fn coerce_amounts(df: &mut DataFrame, ctx: &mut StepContext<'_>, column: &str) -> Result<()> {
        let amounts = text_values(df, column)?
            .iter()
            .enumerate()
            .map(|(row, value)| parse_amount(column, value.as_deref(), row))
            .collect::<Result<Vec<Option<f64>>>>()?;

        let rows = amounts.iter().filter(|v| v.is_some()).count();
        df.replace(column, Series::new(column.into(), amounts))?;

        ctx.record(CleaningAction::new(
            ActionType::TypeCoerced,
            column,
            "Converted to float",
            rows,
        ));
        Ok(())
    }
}

impl CleaningStep for TypeCoercer {
    fn name(&self) -> &'static str {
        "type_coercer"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::TypeCoercion
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;

        for column in column_names(&df) {
            let kind = config.column_kind(&column);
            debug!("Column '{}' is {:?}", column, kind);
            match kind {
                ColumnKind::Date => Self::coerce_date(&mut df, ctx, &column)?,
                ColumnKind::Integer => Self::coerce_counts(&mut df, ctx, &column)?,
                ColumnKind::Float => Self::coerce_amounts(&mut df, ctx, &column)?,
                ColumnKind::Categorical | ColumnKind::Identifier | ColumnKind::Passthrough => {}
            }
        }

        Ok(df)
    }
}
