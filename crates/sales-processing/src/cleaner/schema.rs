//! Stage 1: header normalization.

use super::{CleaningStep, StepContext};
use crate::error::{CleaningError, Result};
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{column_names, drop_column, has_column};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

static HEADER_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]").unwrap());

/// Trim, lower-case, and replace whitespace and hyphens with underscores.
pub fn normalize_header(raw: &str) -> String {
    HEADER_SEPARATOR
        .replace_all(&raw.trim().to_lowercase(), "_")
        .into_owned()
}

/// Normalizes headers, applies explicit renames, drops junk columns and
/// verifies that every configured column is present.
pub struct SchemaNormalizer;

impl CleaningStep for SchemaNormalizer {
    fn name(&self) -> &'static str {
        "schema_normalizer"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::SchemaNormalization
    }

    fn apply(&self, df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;
        let original = column_names(&df);

        let renamed: Vec<String> = original
            .iter()
            .map(|raw| {
                let normalized = normalize_header(raw);
                config
                    .column_renames
                    .get(&normalized)
                    .cloned()
                    .unwrap_or(normalized)
            })
            .collect();

        let mut seen = HashSet::new();
        if let Some(duplicate) = renamed.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(CleaningError::DuplicateColumn(duplicate.clone()));
        }

        let changed = original
            .iter()
            .zip(&renamed)
            .filter(|(before, after)| before != after)
            .count();

        let columns: Vec<Column> = df
            .get_columns()
            .iter()
            .zip(&renamed)
            .map(|(col, name)| {
                let mut series = col.as_materialized_series().clone();
                series.rename(name.as_str().into());
                series.into()
            })
            .collect();
        let mut df = DataFrame::new(columns)?;

        ctx.record(CleaningAction::new(
            ActionType::ColumnRenamed,
            "dataset",
            "Normalized column headers",
            changed,
        ));

        for junk in &config.junk_columns {
            if has_column(&df, junk) {
                drop_column(&mut df, junk)?;
                ctx.record(CleaningAction::new(
                    ActionType::ColumnRemoved,
                    junk.as_str(),
                    "Dropped junk column",
                    1,
                ));
            } else {
                debug!("Junk column '{}' not present", junk);
            }
        }

        for required in config.required_columns() {
            if !has_column(&df, required) {
                return Err(CleaningError::ColumnNotFound(required.to_string()));
            }
        }

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use crate::utils::test_support::frame;
    use pretty_assertions::assert_eq;

    /// Raw headers of the order export, minus the index column.
    const RAW_HEADERS: [&str; 23] = [
        "Order ID",
        "Date",
        "Status",
        "Fulfilment",
        "Sales Channel ",
        "ship-service-level",
        "Style",
        "SKU",
        "Category",
        "Size",
        "ASIN",
        "Courier Status",
        "Qty",
        "currency",
        "Amount",
        "ship-city",
        "ship-state",
        "ship-postal-code",
        "ship-country",
        "promotion-ids",
        "B2B",
        "fulfilled-by",
        "Unnamed: 22",
    ];

    fn raw_frame(headers: &[&str]) -> DataFrame {
        let cell: &[Option<&str>] = &[Some("x")];
        let columns: Vec<(&str, &[Option<&str>])> = headers.iter().map(|h| (*h, cell)).collect();
        frame(&columns)
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Sales Channel "), "sales_channel");
        assert_eq!(normalize_header("ship-service-level"), "ship_service_level");
        assert_eq!(normalize_header("Unnamed: 22"), "unnamed:_22");
        assert_eq!(normalize_header(" Order ID"), "order_id");
    }

    #[test]
    fn test_full_header_set() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let df = SchemaNormalizer.apply(raw_frame(&RAW_HEADERS), &mut ctx).unwrap();

        let names = column_names(&df);
        assert!(names.contains(&"quantity".to_string()));
        assert!(names.contains(&"fulfillment".to_string()));
        assert!(names.contains(&"b2b".to_string()));
        assert!(!names.contains(&"qty".to_string()));
        assert!(!names.contains(&"unnamed:_22".to_string()));
        assert_eq!(names.len(), 22);
    }

    #[test]
    fn test_missing_junk_column_is_fine() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let headers = &RAW_HEADERS[..22];
        let df = SchemaNormalizer.apply(raw_frame(headers), &mut ctx).unwrap();
        assert_eq!(df.width(), 22);
    }

    #[test]
    fn test_missing_required_column() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let headers: Vec<&str> = RAW_HEADERS.iter().copied().filter(|h| *h != "ASIN").collect();

        let err = SchemaNormalizer.apply(raw_frame(&headers), &mut ctx).unwrap_err();
        assert!(matches!(err, CleaningError::ColumnNotFound(ref c) if c == "asin"));
    }

    #[test]
    fn test_duplicate_after_normalization() {
        let config = CleaningConfig::default();
        let mut ctx = StepContext::new(&config);
        let err = SchemaNormalizer
            .apply(raw_frame(&["Ship State", "ship-state"]), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, CleaningError::DuplicateColumn(ref c) if c == "ship_state"));
    }
}
