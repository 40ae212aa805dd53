use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Case normalization applied to a text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRule {
    /// Catalog identifiers, currency, country and size codes.
    Upper,
    /// Every other categorical or identifier column.
    Lower,
}

impl CaseRule {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Upper => value.to_uppercase(),
            Self::Lower => value.to_lowercase(),
        }
    }
}

/// Semantic kind assigned to each column during type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Closed-domain label (status, category, region, ...).
    Categorical,
    /// Free-text identifier (order id, sku, city, ...).
    Identifier,
    /// Non-negative whole number.
    Integer,
    /// Floating point amount.
    Float,
    /// Calendar date.
    Date,
    /// Column not covered by the configuration, passed through as text.
    Passthrough,
}

// ============================================================================
// Data-quality warnings
// ============================================================================

/// Category of a non-fatal data-quality finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A region label matched neither the canonical list nor a correction.
    UnmatchedRegion,
    /// A status outside the expected post-reconciliation vocabulary.
    UnknownStatus,
    /// A category outside the expected vocabulary.
    UnknownCategory,
    /// An output invariant that should hold did not.
    InvariantViolation,
}

/// A value that was passed through unchanged but deserves attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub kind: WarningKind,
    pub column: String,
    pub value: String,
    /// Number of rows carrying `value`.
    pub rows: usize,
}

impl DataQualityWarning {
    pub fn new(
        kind: WarningKind,
        column: impl Into<String>,
        value: impl Into<String>,
        rows: usize,
    ) -> Self {
        Self {
            kind,
            column: column.into(),
            value: value.into(),
            rows,
        }
    }

    /// Build one warning per distinct value, ordered by value.
    pub fn from_counts(
        kind: WarningKind,
        column: &str,
        counts: BTreeMap<String, usize>,
    ) -> Vec<Self> {
        counts
            .into_iter()
            .map(|(value, rows)| Self::new(kind, column, value, rows))
            .collect()
    }
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            WarningKind::UnmatchedRegion => "unmatched region",
            WarningKind::UnknownStatus => "unknown status",
            WarningKind::UnknownCategory => "unknown category",
            WarningKind::InvariantViolation => "invariant violation",
        };
        write!(
            f,
            "{} in '{}': '{}' ({} rows)",
            kind, self.column, self.value, self.rows
        )
    }
}

// ============================================================================
// Cleaning actions (audit trail)
// ============================================================================

/// Types of actions taken while cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A column was renamed.
    ColumnRenamed,
    /// A column was removed from the dataset.
    ColumnRemoved,
    /// A column's type was coerced.
    TypeCoerced,
    /// Text values were stripped and case-normalized.
    ValueNormalized,
    /// Duplicate line items were removed.
    DuplicatesRemoved,
    /// Missing values were filled.
    ValueFilled,
    /// Labels were replaced through a mapping table.
    ValueRelabeled,
    /// Rows were removed by a filter.
    RowsRemoved,
    /// A formatting artifact was repaired.
    FormatFixed,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRenamed => "Column Renamed",
            Self::ColumnRemoved => "Column Removed",
            Self::TypeCoerced => "Type Coerced",
            Self::ValueNormalized => "Value Normalized",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::ValueFilled => "Value Filled",
            Self::ValueRelabeled => "Value Relabeled",
            Self::RowsRemoved => "Rows Removed",
            Self::FormatFixed => "Format Fixed",
        }
    }
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name or "dataset".
    pub target: String,
    pub description: String,
    /// Number of cells or rows affected.
    pub affected: usize,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
        affected: usize,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            affected,
        }
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// Row counts observed around a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_after: usize,
}

impl StageStats {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Summary of one pipeline run, suitable for JSON output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub stages: Vec<StageStats>,
    pub actions: Vec<CleaningAction>,
    pub warnings: Vec<DataQualityWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl CleaningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Percentage of input rows removed by deduplication and filtering.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings of a single kind.
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &DataQualityWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

// ============================================================================
// Tests
// ============================================================================
