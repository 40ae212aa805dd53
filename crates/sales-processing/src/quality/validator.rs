use crate::config::CleaningConfig;
use crate::error::Result;
use crate::types::{DataQualityWarning, WarningKind};
use crate::utils::{has_column, text_values};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Checks the cleaned table against the guarantees the pipeline makes.
///
/// Unknown statuses and categories are expected in foreign datasets and are
/// reported as such. Everything else should be unreachable with a consistent
/// configuration and is reported as [`WarningKind::InvariantViolation`].
pub struct OutputValidator;

impl OutputValidator {
    /// Returns the warnings raised by the final table. `reported` holds the
    /// warnings already emitted by the cleaning steps, which are not repeated.
    pub fn validate(
        df: &DataFrame,
        config: &CleaningConfig,
        reported: &[DataQualityWarning],
    ) -> Result<Vec<DataQualityWarning>> {
        let mut warnings = Vec::new();

        warnings.extend(Self::check_statuses(df, config)?);
        warnings.extend(Self::check_categories(df, config)?);
        warnings.extend(Self::check_regions(df, config, reported)?);
        warnings.extend(Self::check_dedup_key(df, config)?);
        warnings.extend(Self::check_case_rules(df, config)?);

        Ok(warnings)
    }

    /// Count the values of `column` rejected by `is_unexpected`.
    fn count_values<F>(df: &DataFrame, column: &str, is_unexpected: F) -> Result<BTreeMap<String, usize>>
    where
        F: Fn(&str) -> bool,
    {
        let mut counts = BTreeMap::new();
        if !has_column(df, column) {
            return Ok(counts);
        }
        for value in text_values(df, column)?.into_iter().flatten() {
            if is_unexpected(&value) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn check_statuses(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<DataQualityWarning>> {
        let rules = &config.status_rules;
        let column = rules.status_column.as_str();
        let known: HashSet<&str> = rules.known_statuses.iter().map(String::as_str).collect();
        let dropped: HashSet<&str> = rules.drop_list.iter().map(String::as_str).collect();

        let counts = Self::count_values(df, column, |v| !known.contains(v))?;
        Ok(counts
            .into_iter()
            .map(|(value, rows)| {
                let kind = if dropped.contains(value.as_str()) {
                    WarningKind::InvariantViolation
                } else {
                    WarningKind::UnknownStatus
                };
                DataQualityWarning::new(kind, column, value, rows)
            })
            .collect())
    }

    fn check_categories(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<DataQualityWarning>> {
        let column = config.category_column.as_str();
        let known: HashSet<&str> = config.known_categories.iter().map(String::as_str).collect();
        let counts = Self::count_values(df, column, |v| !known.contains(v))?;
        Ok(DataQualityWarning::from_counts(WarningKind::UnknownCategory, column, counts))
    }

    fn check_regions(
        df: &DataFrame,
        config: &CleaningConfig,
        reported: &[DataQualityWarning],
    ) -> Result<Vec<DataQualityWarning>> {
        let rules = &config.regions;
        let column = rules.column.as_str();
        let already: HashSet<&str> = reported
            .iter()
            .filter(|w| w.kind == WarningKind::UnmatchedRegion)
            .map(|w| w.value.as_str())
            .collect();

        let counts = Self::count_values(df, column, |v| !rules.is_valid(v) && !already.contains(v))?;
        Ok(DataQualityWarning::from_counts(WarningKind::InvariantViolation, column, counts))
    }

    /// Keys still shared by several rows. Nulls group together, as they do
    /// during deduplication.
    fn check_dedup_key(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<DataQualityWarning>> {
        if config.dedup_key.iter().any(|c| !has_column(df, c)) {
            return Ok(Vec::new());
        }
        let keys: Vec<Expr> = config.dedup_key.iter().map(|c| col(c.as_str())).collect();
        let repeated = df
            .clone()
            .lazy()
            .group_by(keys)
            .agg([len().alias("repeated_rows")])
            .filter(col("repeated_rows").gt(lit(1)))
            .sort(config.dedup_key.clone(), SortMultipleOptions::default())
            .collect()?;

        let key_columns = config
            .dedup_key
            .iter()
            .map(|c| text_values(&repeated, c))
            .collect::<Result<Vec<_>>>()?;
        let rows = repeated
            .column("repeated_rows")?
            .as_materialized_series()
            .cast(&DataType::Int64)?;

        let label = config.dedup_key.join("|");
        Ok(rows
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, count)| {
                let value = key_columns
                    .iter()
                    .map(|values| values[row].as_deref().unwrap_or("null"))
                    .collect::<Vec<_>>()
                    .join("|");
                DataQualityWarning::new(
                    WarningKind::InvariantViolation,
                    &label,
                    value,
                    count.unwrap_or(0) as usize,
                )
            })
            .collect())
    }

    fn check_case_rules(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<DataQualityWarning>> {
        let mut warnings = Vec::new();
        for column in config.text_columns() {
            let is_text = df
                .column(column)
                .map(|c| c.dtype() == &DataType::String)
                .unwrap_or(false);
            if !is_text {
                continue;
            }
            let rule = config.case_rule(column);
            let counts = Self::count_values(df, column, |v| rule.apply(v) != v)?;
            warnings.extend(DataQualityWarning::from_counts(
                WarningKind::InvariantViolation,
                column,
                counts,
            ));
        }
        Ok(warnings)
    }
}
