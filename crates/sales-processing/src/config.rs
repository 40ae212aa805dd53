//! Configuration for the order cleaning pipeline.
//!
//! Every mapping table the stages consult lives here rather than in the step
//! code, so corrections can be updated by shipping a new JSON file:
//!
//! ```rust,ignore
//! use sales_processing::config::CleaningConfig;
//!
//! // Reference tables
//! let config = CleaningConfig::default();
//!
//! // Tables supplied from disk (missing fields fall back to defaults)
//! let config = CleaningConfig::from_json_file("config/tables.json")?;
//!
//! // Programmatic overrides
//! let config = CleaningConfig::builder()
//!     .status_drop_list(["pending", "shipping"])
//!     .region_correction("bengaluru", "karnataka")
//!     .build()?;
//! ```

use crate::types::{CaseRule, ColumnKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The 36 Indian states and union territories accepted as shipping regions.
pub const CANONICAL_REGIONS: [&str; 36] = [
    "andaman and nicobar islands",
    "andhra pradesh",
    "arunachal pradesh",
    "assam",
    "bihar",
    "chandigarh",
    "chhattisgarh",
    "dadra and nagar haveli and daman and diu",
    "delhi",
    "goa",
    "gujarat",
    "haryana",
    "himachal pradesh",
    "jammu and kashmir",
    "jharkhand",
    "karnataka",
    "kerala",
    "ladakh",
    "lakshadweep",
    "madhya pradesh",
    "maharashtra",
    "manipur",
    "meghalaya",
    "mizoram",
    "nagaland",
    "odisha",
    "puducherry",
    "punjab",
    "rajasthan",
    "sikkim",
    "tamil nadu",
    "telangana",
    "tripura",
    "uttar pradesh",
    "uttarakhand",
    "west bengal",
];

fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn mapping<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

/// Rules for reconciling the primary order status with the courier status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRules {
    /// Primary status column.
    pub status_column: String,
    /// Courier sub-status column, dropped once reconciled.
    pub courier_column: String,
    /// Courier values that force the primary status to `cancelled_status`.
    pub courier_cancelled: Vec<String>,
    /// Courier value that promotes a pending order to shipped.
    pub courier_shipped: String,
    /// Primary status promoted when the courier reports shipment.
    pub pending_status: String,
    /// Label a promoted pending order receives.
    pub shipped_status: String,
    /// Intermediate cancellation label.
    pub cancelled_status: String,
    /// Return/rejection/loss sub-statuses folded into `cancelled_status`.
    pub status_merges: BTreeMap<String, String>,
    /// Label that replaces `cancelled_status` in the output.
    pub terminal_label: String,
    /// Statuses whose rows are removed after reconciliation.
    pub drop_list: Vec<String>,
    /// Closed vocabulary expected after reconciliation.
    pub known_statuses: Vec<String>,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            status_column: "status".to_string(),
            courier_column: "courier_status".to_string(),
            courier_cancelled: strings(["unshipped", "cancelled"]),
            courier_shipped: "shipped".to_string(),
            pending_status: "pending".to_string(),
            shipped_status: "shipped".to_string(),
            cancelled_status: "cancelled".to_string(),
            status_merges: mapping([
                ("shipped - returned to seller", "cancelled"),
                ("shipped - returning to seller", "cancelled"),
                ("shipped - rejected by buyer", "cancelled"),
                ("shipped - lost in transit", "cancelled"),
                ("shipped - damaged", "cancelled"),
            ]),
            terminal_label: "cancelled or returned".to_string(),
            drop_list: strings(["pending", "pending - waiting for pick up", "shipping"]),
            known_statuses: strings([
                "cancelled or returned",
                "shipped",
                "shipped - delivered to buyer",
                "shipped - out for delivery",
                "shipped - picked up",
            ]),
        }
    }
}

/// Reference data for validating shipping regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionRules {
    /// Raw region column name (after schema normalization).
    pub source_column: String,
    /// Output region column name.
    pub column: String,
    /// Canonical region labels, matched case-insensitively.
    pub canonical: Vec<String>,
    /// Abbreviations, misspellings and joined labels mapped to canonical labels.
    pub corrections: BTreeMap<String, String>,
    /// Label for regions that cannot be determined.
    pub unknown_label: String,
    /// Address columns whose nulls are filled with `unknown_label`.
    pub fill_columns: Vec<String>,
}

impl Default for RegionRules {
    fn default() -> Self {
        Self {
            source_column: "ship_state".to_string(),
            column: "ship_state_or_territory".to_string(),
            canonical: strings(CANONICAL_REGIONS),
            corrections: mapping([
                ("jammu & kashmir", "jammu and kashmir"),
                ("dadra and nagar", "dadra and nagar haveli and daman and diu"),
                ("andaman & nicobar", "andaman and nicobar islands"),
                ("rajshthan", "rajasthan"),
                ("nl", "nagaland"),
                ("new delhi", "delhi"),
                ("punjab/mohali/zirakpur", "punjab"),
                ("rj", "rajasthan"),
                ("orissa", "odisha"),
                ("pb", "punjab"),
                ("apo", "unknown"),
                ("ar", "arunachal pradesh"),
                ("pondicherry", "puducherry"),
                ("rajsthan", "rajasthan"),
            ]),
            unknown_label: "unknown".to_string(),
            fill_columns: strings(["ship_state_or_territory", "ship_city", "ship_postal_code"]),
        }
    }
}

impl RegionRules {
    /// Canonical labels, lower-cased and sorted alphabetically.
    pub fn canonical_sorted(&self) -> Vec<String> {
        let set: BTreeSet<String> = self.canonical.iter().map(|r| r.to_lowercase()).collect();
        set.into_iter().collect()
    }

    /// Whether `label` is canonical or the unknown label.
    pub fn is_valid(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        lower == self.unknown_label.to_lowercase()
            || self.canonical.iter().any(|r| r.to_lowercase() == lower)
    }
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] for programmatic overrides or
/// [`CleaningConfig::from_json_file`] for externally supplied tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// chrono format of the raw date column. Default: `%m-%d-%y`
    pub date_format: String,

    /// Name of the date column. Default: `date`
    pub date_column: String,

    /// Columns discarded during schema normalization when present.
    pub junk_columns: Vec<String>,

    /// Explicit renames applied after header normalization.
    pub column_renames: BTreeMap<String, String>,

    /// Closed-domain categorical columns.
    pub categorical_columns: Vec<String>,

    /// Free-text identifier columns.
    pub string_columns: Vec<String>,

    /// Columns parsed as non-negative integers.
    pub integer_columns: Vec<String>,

    /// Columns parsed as floats (nulls allowed).
    pub float_columns: Vec<String>,

    /// Text columns upper-cased; every other text column is lower-cased.
    pub uppercase_columns: Vec<String>,

    /// Columns identifying a line item. Last occurrence wins.
    pub dedup_key: Vec<String>,

    /// Country column and its fill value.
    pub ship_country_column: String,
    pub default_ship_country: String,

    /// Fulfillment column and label merges applied to it.
    pub fulfillment_column: String,
    pub fulfillment_merges: BTreeMap<String, String>,

    /// Columns dropped once their information has been merged elsewhere.
    pub redundant_columns: Vec<String>,

    /// Category column, its merges and the vocabulary expected afterwards.
    pub category_column: String,
    pub category_merges: BTreeMap<String, String>,
    pub known_categories: Vec<String>,

    pub status_rules: StatusRules,

    pub regions: RegionRules,

    /// Postal code column, stripped of a trailing `.0` artifact.
    pub postal_code_column: String,

    /// Multi-valued promotion column collapsed to a boolean flag.
    pub promotion_column: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            date_format: "%m-%d-%y".to_string(),
            date_column: "date".to_string(),
            junk_columns: strings(["unnamed:_22"]),
            column_renames: mapping([("qty", "quantity"), ("fulfilment", "fulfillment")]),
            categorical_columns: strings([
                "status",
                "fulfillment",
                "sales_channel",
                "ship_service_level",
                "category",
                "size",
                "courier_status",
                "currency",
                "ship_state",
                "ship_country",
                "fulfilled_by",
            ]),
            string_columns: strings([
                "order_id",
                "style",
                "sku",
                "asin",
                "ship_city",
                "promotion_ids",
                "ship_postal_code",
            ]),
            integer_columns: strings(["quantity"]),
            float_columns: strings(["amount"]),
            uppercase_columns: strings(["asin", "style", "size", "sku", "currency", "ship_country"]),
            dedup_key: strings(["order_id", "asin", "date"]),
            ship_country_column: "ship_country".to_string(),
            default_ship_country: "IN".to_string(),
            fulfillment_column: "fulfillment".to_string(),
            fulfillment_merges: mapping([("merchant", "easy ship")]),
            redundant_columns: strings(["fulfilled_by"]),
            category_column: "category".to_string(),
            category_merges: mapping([("dupatta", "ethnic dress"), ("saree", "ethnic dress")]),
            known_categories: strings([
                "blouse",
                "bottom",
                "ethnic dress",
                "kurta",
                "set",
                "top",
                "western dress",
            ]),
            status_rules: StatusRules::default(),
            regions: RegionRules::default(),
            postal_code_column: "ship_postal_code".to_string(),
            promotion_column: "promotion_ids".to_string(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Load mapping tables from a JSON file and validate them.
    ///
    /// Fields absent from the file keep their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: CleaningConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Every column that must exist once headers are normalized.
    pub fn required_columns(&self) -> Vec<&str> {
        std::iter::once(self.date_column.as_str())
            .chain(self.categorical_columns.iter().map(String::as_str))
            .chain(self.string_columns.iter().map(String::as_str))
            .chain(self.integer_columns.iter().map(String::as_str))
            .chain(self.float_columns.iter().map(String::as_str))
            .collect()
    }

    /// Text columns subject to value normalization, categorical first.
    pub fn text_columns(&self) -> impl Iterator<Item = &str> {
        self.categorical_columns
            .iter()
            .chain(self.string_columns.iter())
            .map(String::as_str)
    }

    /// Semantic kind of a (normalized) column name.
    pub fn column_kind(&self, column: &str) -> ColumnKind {
        let listed = |columns: &[String]| columns.iter().any(|c| c == column);
        if column == self.date_column {
            ColumnKind::Date
        } else if listed(&self.integer_columns) {
            ColumnKind::Integer
        } else if listed(&self.float_columns) {
            ColumnKind::Float
        } else if listed(&self.categorical_columns) {
            ColumnKind::Categorical
        } else if listed(&self.string_columns) {
            ColumnKind::Identifier
        } else {
            ColumnKind::Passthrough
        }
    }

    /// Case rule applied to a text column.
    pub fn case_rule(&self, column: &str) -> CaseRule {
        if self.uppercase_columns.iter().any(|c| c == column) {
            CaseRule::Upper
        } else {
            CaseRule::Lower
        }
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("date_format", &self.date_format),
            ("date_column", &self.date_column),
            ("category_column", &self.category_column),
            ("status_rules.terminal_label", &self.status_rules.terminal_label),
            ("regions.column", &self.regions.column),
            ("regions.unknown_label", &self.regions.unknown_label),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField(field.to_string()));
            }
        }

        if self.dedup_key.is_empty() {
            return Err(ConfigValidationError::EmptyDedupKey);
        }

        let text: BTreeSet<&str> = self.text_columns().collect();
        if let Some(column) = self
            .uppercase_columns
            .iter()
            .find(|c| !text.contains(c.as_str()))
        {
            return Err(ConfigValidationError::UnknownCaseColumn(column.clone()));
        }

        let mut seen = BTreeSet::new();
        for region in &self.regions.canonical {
            if !seen.insert(region.to_lowercase()) {
                return Err(ConfigValidationError::DuplicateRegion(region.clone()));
            }
        }

        for (from, to) in &self.regions.corrections {
            if !self.regions.is_valid(to) {
                return Err(ConfigValidationError::InvalidCorrection {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        let rules = &self.status_rules;
        if rules.drop_list.iter().any(|s| s == &rules.terminal_label) {
            return Err(ConfigValidationError::DropListContainsTerminal(
                rules.terminal_label.clone(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Configuration field '{0}' must not be empty")]
    EmptyField(String),

    #[error("Deduplication key must name at least one column")]
    EmptyDedupKey,

    #[error("Upper-case rule names '{0}', which is not a categorical or string column")]
    UnknownCaseColumn(String),

    #[error("Canonical region '{0}' is listed more than once")]
    DuplicateRegion(String),

    #[error("Region correction '{from}' -> '{to}' does not target a canonical region")]
    InvalidCorrection { from: String, to: String },

    #[error("Status drop list contains the terminal label '{0}'")]
    DropListContainsTerminal(String),
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    date_format: Option<String>,
    default_ship_country: Option<String>,
    category_merges: Option<BTreeMap<String, String>>,
    status_drop_list: Option<Vec<String>>,
    status_merges: Option<BTreeMap<String, String>>,
    canonical_regions: Option<Vec<String>>,
    region_corrections: BTreeMap<String, String>,
}

impl CleaningConfigBuilder {
    /// Set the chrono format used to parse the date column.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set the value used when the shipping country is missing.
    pub fn default_ship_country(mut self, country: impl Into<String>) -> Self {
        self.default_ship_country = Some(country.into());
        self
    }

    /// Replace the category merge table.
    pub fn category_merges(mut self, merges: BTreeMap<String, String>) -> Self {
        self.category_merges = Some(merges);
        self
    }

    /// Replace the list of statuses whose rows are dropped.
    pub fn status_drop_list<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status_drop_list = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the sub-status merge table.
    pub fn status_merges(mut self, merges: BTreeMap<String, String>) -> Self {
        self.status_merges = Some(merges);
        self
    }

    /// Replace the canonical region list.
    pub fn canonical_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical_regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    /// Add (or override) a single region correction.
    pub fn region_correction(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.region_corrections.insert(from.into(), to.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let mut config = CleaningConfig::default();

        if let Some(format) = self.date_format {
            config.date_format = format;
        }
        if let Some(country) = self.default_ship_country {
            config.default_ship_country = country;
        }
        if let Some(merges) = self.category_merges {
            config.category_merges = merges;
        }
        if let Some(drop_list) = self.status_drop_list {
            config.status_rules.drop_list = drop_list;
        }
        if let Some(merges) = self.status_merges {
            config.status_rules.status_merges = merges;
        }
        if let Some(regions) = self.canonical_regions {
            config.regions.canonical = regions;
        }
        config.regions.corrections.extend(self.region_corrections);

        config.validate()?;
        Ok(config)
    }
}
