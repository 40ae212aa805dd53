use crate::config::CleaningConfig;
use crate::error::Result;
use crate::pipeline::CleaningOutcome;
use crate::reporting::summary::SalesSummary;
use crate::types::CleaningSummary;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Report for one pipeline run, used for `--json` output, `--emit-report`
/// files and programmatic access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the raw input file
    pub input_file: String,
    /// Path to the cleaned file, absent on dry runs
    pub output_file: Option<String>,
    /// Shape changes, actions and warnings of the run
    pub summary: CleaningSummary,
    /// Aggregates over the cleaned table
    pub sales: SalesSummary,
}

/// Builds and persists [`CleaningReport`]s.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build a report from a finished run.
    pub fn build_report(
        input_file: &str,
        outcome: &CleaningOutcome,
        config: &CleaningConfig,
    ) -> Result<CleaningReport> {
        Ok(CleaningReport {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.to_string(),
            output_file: outcome.summary.output_path.clone(),
            summary: outcome.summary.clone(),
            sales: SalesSummary::from_frame(&outcome.data, config)?,
        })
    }

    /// Write a report as pretty JSON.
    ///
    /// If `report_base_name` is "amazon_sales_cleaned", the file will be
    /// "amazon_sales_cleaned_report.json".
    pub fn write_report_to_file(
        &self,
        report: &CleaningReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
