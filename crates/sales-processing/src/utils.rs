//! Shared DataFrame helpers used across the cleaning steps.
//!
//! The raw table is read with every column as text, so most steps operate on
//! `Vec<Option<String>>` views of a column and write the result back.

use crate::error::{CleaningError, Result};
use polars::prelude::*;

/// Column names in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Look up a column, failing with [`CleaningError::ColumnNotFound`].
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))
}

/// Materialize a column as optional strings, casting non-text columns.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = require_column(df, name)?;
    series_text_values(series)
}

pub fn series_text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let as_text = series.cast(&DataType::String)?;
    let str_series = as_text.str()?;
    Ok(str_series
        .into_iter()
        .map(|opt_val| opt_val.map(str::to_string))
        .collect())
}

/// Replace (or append) a text column.
pub fn put_text_column(df: &mut DataFrame, name: &str, values: Vec<Option<String>>) -> Result<()> {
    let series = Series::new(name.into(), values);
    if has_column(df, name) {
        df.replace(name, series)?;
    } else {
        df.with_column(series)?;
    }
    Ok(())
}

/// Rewrite every cell of a text column, returning the number of cells changed.
pub fn map_text_column<F>(df: &mut DataFrame, name: &str, mut f: F) -> Result<usize>
where
    F: FnMut(Option<&str>) -> Option<String>,
{
    let values = text_values(df, name)?;
    let mut changed = 0;
    let mapped: Vec<Option<String>> = values
        .iter()
        .map(|value| {
            let new_value = f(value.as_deref());
            if new_value != *value {
                changed += 1;
            }
            new_value
        })
        .collect();

    if changed > 0 {
        put_text_column(df, name, mapped)?;
    }
    Ok(changed)
}

/// Drop a column in place, failing if it is absent.
pub fn drop_column(df: &mut DataFrame, name: &str) -> Result<()> {
    df.drop_in_place(name)
        .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))?;
    Ok(())
}

/// Keep rows where `keep` is true, preserving row order.
pub fn filter_rows(df: &DataFrame, keep: Vec<bool>) -> Result<DataFrame> {
    let mask_series = Series::new("keep".into(), keep);
    let mask = mask_series.bool()?;
    Ok(df.filter(mask)?)
}

/// 1-based line number in the source CSV for a 0-based data row.
#[inline]
pub fn csv_line(row: usize) -> usize {
    row + 2
}
