//! Sales Order Cleaning Library
//!
//! A batch cleaning pipeline for e-commerce order exports, built with Rust
//! and Polars.
//!
//! # Overview
//!
//! One raw CSV goes in, one cleaned CSV comes out. In between, nine named
//! steps run in a fixed order:
//!
//! - **Schema normalization**: snake_case headers, explicit renames, junk column removal
//! - **Type coercion**: date parsing and numeric conversion, failing on bad cells
//! - **Value normalization**: whitespace stripping and per-column case rules
//! - **Deduplication**: the last occurrence of each `(order_id, asin, date)` wins
//! - **Reconciliation**: country default, fulfillment and category label merges
//! - **Status reconciliation**: courier status takes precedence, drop list applied
//! - **Region canonicalization**: 36 states and union territories plus `unknown`
//! - **Format fix-ups**: postal code artifacts and a boolean promotion flag
//!
//! Fatal problems are [`CleaningError`]s and nothing is written. Anything the
//! pipeline passes through but cannot vouch for becomes a
//! [`DataQualityWarning`] in the run summary.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sales_processing::{CleaningConfig, clean_file};
//!
//! let outcome = clean_file(
//!     "data/raw/amazon_sales.csv",
//!     "data/processed/amazon_sales_cleaned.csv",
//!     CleaningConfig::default(),
//! )?;
//!
//! println!("{} -> {} rows", outcome.summary.rows_before, outcome.summary.rows_after);
//! for warning in &outcome.summary.warnings {
//!     println!("warning: {}", warning);
//! }
//! ```
//!
//! # Configuration
//!
//! Every mapping table (status merges, drop list, region corrections, ...)
//! lives in [`CleaningConfig`] and can be loaded from JSON:
//!
//! ```rust,ignore
//! use sales_processing::{CleaningConfig, Pipeline};
//!
//! let config = CleaningConfig::from_json_file("config/tables.json")?;
//! let outcome = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{
    CategoryRelabeler, CleaningStep, Deduplicator, FormatFixer, MissingValueReconciler,
    RegionCanonicalizer, SchemaNormalizer, StatusReconciler, StepContext, TypeCoercer,
    ValueNormalizer, default_steps, normalize_header,
};
pub use config::{
    CANONICAL_REGIONS, CleaningConfig, CleaningConfigBuilder, ConfigValidationError, RegionRules,
    StatusRules,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use pipeline::{
    CleaningOutcome, CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder,
    ProgressReporter, ProgressUpdate, clean_file, read_orders_csv, write_csv_atomic,
};
pub use quality::OutputValidator;
pub use reporting::{CleaningReport, ReportGenerator, SalesSummary};
pub use types::{
    ActionType, CaseRule, CleaningAction, CleaningSummary, ColumnKind, DataQualityWarning,
    StageStats, WarningKind,
};
