//! Report generation module.
//!
//! [`SalesSummary`] aggregates the cleaned table into the figures the
//! downstream charts need. [`CleaningReport`] bundles it with the run
//! summary for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use sales_processing::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("data/raw/amazon_sales.csv", &outcome, &config)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new("data/processed");
//! generator.write_report_to_file(&report, "amazon_sales_cleaned")?;
//! ```

mod generator;
mod summary;

pub use generator::{CleaningReport, ReportGenerator};
pub use summary::{
    AmountStats, CANCELLATION_DIMENSIONS, CancellationRate, CategoryShare, ItemSales,
    RegionDemand, SalesSummary, TOP_SELLER_PERCENTILE,
};
