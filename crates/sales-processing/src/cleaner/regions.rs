//! Stage 8: shipping region canonicalization.

use super::{CleaningStep, StepContext};
use crate::config::RegionRules;
use crate::error::{CleaningError, Result};
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction, DataQualityWarning, WarningKind};
use crate::utils::{has_column, map_text_column};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Result of matching one region label.
#[derive(Debug, PartialEq, Eq)]
enum RegionMatch {
    Canonical(String),
    Corrected(String),
    Unmatched,
}

struct RegionMatcher {
    canonical: BTreeSet<String>,
    corrections: BTreeMap<String, String>,
    unknown_label: String,
}

impl RegionMatcher {
    fn new(rules: &RegionRules) -> Self {
        Self {
            canonical: rules.canonical_sorted().into_iter().collect(),
            corrections: rules
                .corrections
                .iter()
                .map(|(from, to)| (from.to_lowercase(), to.to_lowercase()))
                .collect(),
            unknown_label: rules.unknown_label.to_lowercase(),
        }
    }

    fn resolve(&self, value: &str) -> RegionMatch {
        let lower = value.trim().to_lowercase();
        if self.canonical.contains(&lower) || lower == self.unknown_label {
            RegionMatch::Canonical(lower)
        } else if let Some(corrected) = self.corrections.get(&lower) {
            RegionMatch::Corrected(corrected.clone())
        } else {
            RegionMatch::Unmatched
        }
    }
}

/// Renames the raw region column and validates every value against the
/// canonical list, applying the correction table where needed.
///
/// Values still unmatched afterwards pass through unchanged and are reported
/// as warnings. Nulls in the address columns become the unknown label.
pub struct RegionCanonicalizer;

impl CleaningStep for RegionCanonicalizer {
    fn name(&self) -> &'static str {
        "region_canonicalizer"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::RegionValidation
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;
        let rules = &config.regions;
        let column = rules.column.as_str();

        if rules.source_column != rules.column && has_column(&df, &rules.source_column) {
            df.rename(&rules.source_column, column.into())?;
            ctx.record(CleaningAction::new(
                ActionType::ColumnRenamed,
                column,
                format!("Renamed from '{}'", rules.source_column),
                1,
            ));
        } else if !has_column(&df, column) {
            return Err(CleaningError::ColumnNotFound(rules.source_column.clone()));
        }

        let matcher = RegionMatcher::new(rules);
        let mut corrected = 0;
        let mut unmatched: BTreeMap<String, usize> = BTreeMap::new();

        map_text_column(&mut df, column, |value| {
            let value = value?;
            match matcher.resolve(value) {
                RegionMatch::Canonical(label) => Some(label),
                RegionMatch::Corrected(label) => {
                    corrected += 1;
                    Some(label)
                }
                RegionMatch::Unmatched => {
                    *unmatched.entry(value.to_string()).or_default() += 1;
                    Some(value.to_string())
                }
            }
        })?;

        ctx.record(CleaningAction::new(
            ActionType::ValueRelabeled,
            column,
            "Corrected region spellings and abbreviations",
            corrected,
        ));
        for warning in DataQualityWarning::from_counts(WarningKind::UnmatchedRegion, column, unmatched) {
            ctx.warn(warning);
        }

        let unknown = rules.unknown_label.as_str();
        for fill_column in &rules.fill_columns {
            let filled = map_text_column(&mut df, fill_column, |value| {
                Some(value.unwrap_or(unknown).to_string())
            })?;
            ctx.record(CleaningAction::new(
                ActionType::ValueFilled,
                fill_column.as_str(),
                format!("Filled missing values with '{}'", unknown),
                filled,
            ));
        }

        Ok(df)
    }
}
