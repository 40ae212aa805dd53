//! Stages 5 and 6: missing-value reconciliation and category relabeling.

use super::{CleaningStep, StepContext};
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{drop_column, has_column, map_text_column};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Replace every value found in `merges` by its target label.
pub(crate) fn relabel(
    df: &mut DataFrame,
    column: &str,
    merges: &BTreeMap<String, String>,
) -> Result<usize> {
    if merges.is_empty() {
        return Ok(0);
    }
    map_text_column(df, column, |value| {
        value.map(|v| merges.get(v).cloned().unwrap_or_else(|| v.to_string()))
    })
}

/// Fills the shipping country, merges fulfillment labels and drops columns
/// whose information now lives elsewhere.
pub struct MissingValueReconciler;

impl CleaningStep for MissingValueReconciler {
    fn name(&self) -> &'static str {
        "missing_value_reconciler"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::MissingValues
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;

        let country = config.default_ship_country.as_str();
        let filled = map_text_column(&mut df, &config.ship_country_column, |value| {
            Some(value.unwrap_or(country).to_string())
        })?;
        ctx.record(CleaningAction::new(
            ActionType::ValueFilled,
            config.ship_country_column.as_str(),
            format!("Filled missing country with '{}'", country),
            filled,
        ));

        let merged = relabel(&mut df, &config.fulfillment_column, &config.fulfillment_merges)?;
        ctx.record(CleaningAction::new(
            ActionType::ValueRelabeled,
            config.fulfillment_column.as_str(),
            "Merged fulfillment labels",
            merged,
        ));

        for column in &config.redundant_columns {
            if has_column(&df, column) {
                drop_column(&mut df, column)?;
                ctx.record(CleaningAction::new(
                    ActionType::ColumnRemoved,
                    column.as_str(),
                    "Dropped redundant column",
                    1,
                ));
            } else {
                debug!("Redundant column '{}' already absent", column);
            }
        }

        Ok(df)
    }
}

/// Merges near-duplicate product categories.
pub struct CategoryRelabeler;

impl CleaningStep for CategoryRelabeler {
    fn name(&self) -> &'static str {
        "category_relabeler"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::CategoryRelabeling
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;
        let merged = relabel(&mut df, &config.category_column, &config.category_merges)?;
        ctx.record(CleaningAction::new(
            ActionType::ValueRelabeled,
            config.category_column.as_str(),
            "Merged near-duplicate categories",
            merged,
        ));
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use crate::utils::column_names;
    use crate::utils::test_support::{frame, texts};
    use pretty_assertions::assert_eq;

    fn s(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_country_default_and_fulfillment_merge() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let df = frame(&[
            ("ship_country", &[None, Some("IN")]),
            ("fulfillment", &[Some("merchant"), Some("amazon")]),
            ("fulfilled_by", &[Some("easy ship"), None]),
        ]);

        let df = MissingValueReconciler.apply(df, &mut ctx).unwrap();

        assert_eq!(texts(&df, "ship_country"), vec![s("IN"), s("IN")]);
        assert_eq!(texts(&df, "fulfillment"), vec![s("easy ship"), s("amazon")]);
        assert_eq!(
            column_names(&df),
            vec!["ship_country".to_string(), "fulfillment".to_string()]
        );
        assert_eq!(ctx.actions.len(), 3);
    }

    #[test]
    fn test_absent_redundant_column_is_skipped() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let df = frame(&[
            ("ship_country", &[Some("IN")]),
            ("fulfillment", &[Some("amazon")]),
        ]);

        let df = MissingValueReconciler.apply(df, &mut ctx).unwrap();
        assert_eq!(df.width(), 2);
        assert!(ctx.actions.is_empty());
    }

    #[test]
    fn test_category_merges() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let df = frame(&[("category", &[Some("dupatta"), Some("saree"), Some("kurta"), None])]);

        let df = CategoryRelabeler.apply(df, &mut ctx).unwrap();

        assert_eq!(
            texts(&df, "category"),
            vec![s("ethnic dress"), s("ethnic dress"), s("kurta"), None]
        );
        assert_eq!(ctx.actions[0].affected, 2);
    }
}
