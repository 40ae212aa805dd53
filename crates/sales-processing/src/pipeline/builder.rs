//! The cleaning pipeline and its builder.
//!
//! A [`Pipeline`] owns a validated [`CleaningConfig`] and the ordered list of
//! cleaning steps. It is a plain value with no process-wide state, so two
//! pipelines with different tables can run side by side.

use crate::cleaner::{CleaningStep, StepContext, default_steps};
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{Result, ResultExt};
use crate::pipeline::io::{read_orders_csv, write_csv_atomic};
use crate::pipeline::progress::{
    CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::quality::OutputValidator;
use crate::types::{CleaningSummary, StageStats};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Cleaned table plus the summary of how it was produced.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    pub summary: CleaningSummary,
}

/// The order cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use sales_processing::{CleaningConfig, Pipeline};
///
/// let outcome = Pipeline::builder()
///     .config(CleaningConfig::from_json_file("config/tables.json")?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run("data/raw/amazon_sales.csv", "data/processed/amazon_sales_cleaned.csv")?;
///
/// for warning in &outcome.summary.warnings {
///     println!("{}", warning);
/// }
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    steps: Vec<Box<dyn CleaningStep>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run stages 1-9 on an in-memory table. Nothing is written.
    pub fn process(&self, df: DataFrame) -> Result<CleaningOutcome> {
        self.finish(self.transform(df))
    }

    /// Read `input`, clean it, and write the result to `output`.
    ///
    /// The output file is only created when every stage succeeds.
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CleaningOutcome> {
        self.finish(self.run_internal(input.as_ref(), output.as_ref()))
    }

    fn run_internal(&self, input: &Path, output: &Path) -> Result<CleaningOutcome> {
        let start_time = Instant::now();
        let df = read_orders_csv(input)?;
        let mut outcome = self.transform(df)?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Persistence,
            0.0,
            format!("Writing {}", output.display()),
        ));
        write_csv_atomic(&mut outcome.data, output)?;
        self.report_progress(
            ProgressUpdate::new(CleaningStage::Persistence, 1.0, "Output written")
                .with_rows(outcome.data.height()),
        );

        outcome.summary.output_path = Some(output.display().to_string());
        outcome.summary.duration_ms = start_time.elapsed().as_millis() as u64;
        Ok(outcome)
    }

    fn finish(&self, result: Result<CleaningOutcome>) -> Result<CleaningOutcome> {
        match result {
            Ok(outcome) => {
                self.report_progress(
                    ProgressUpdate::complete("Pipeline completed successfully")
                        .with_rows(outcome.data.height()),
                );
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn transform(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline...");

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();

        let mut ctx = StepContext::new(&self.config);
        let mut df = df;

        for step in &self.steps {
            let stage = step.stage();
            let rows_before = df.height();
            info!(
                "Stage {}: {}...",
                stage.ordinal().unwrap_or_default(),
                stage.display_name()
            );
            self.report_progress(
                ProgressUpdate::new(stage, 0.0, format!("{}...", stage.display_name()))
                    .with_rows(rows_before),
            );

            df = step.apply(df, &mut ctx).context(stage.display_name())?;

            let stats = StageStats {
                stage: step.name().to_string(),
                rows_before,
                rows_after: df.height(),
                columns_after: df.width(),
            };
            if stats.rows_removed() > 0 {
                info!("  {} removed {} rows", step.name(), stats.rows_removed());
            }
            debug!("  shape after {}: {:?}", step.name(), df.shape());
            summary.stages.push(stats);

            self.report_progress(
                ProgressUpdate::new(stage, 1.0, format!("{} complete", stage.display_name()))
                    .with_rows(df.height()),
            );
        }

        let found = OutputValidator::validate(&df, &self.config, &ctx.warnings)?;
        for warning in found {
            ctx.warn(warning);
        }

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.actions = ctx.actions;
        summary.warnings = ctx.warnings;
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Cleaning finished: {} -> {} rows, {} warnings",
            summary.rows_before,
            summary.rows_after,
            summary.warnings.len()
        );

        Ok(CleaningOutcome { data: df, summary })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    /// Set the cleaning configuration. Defaults to [`CleaningConfig::default()`].
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving stage updates.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For reporters with their own state, use
    /// [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            steps: default_steps(),
            progress_reporter: self.progress_reporter,
        })
    }
}

/// Clean `input` into `output` using `config`.
pub fn clean_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: CleaningConfig,
) -> Result<CleaningOutcome> {
    Pipeline::builder().config(config).build()?.run(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_support::{frame, texts};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn order_rows() -> DataFrame {
        frame(&[
            ("Order ID", &[Some("171-1"), Some("171-2")]),
            ("Date", &[Some("04-30-22"), Some("04-30-22")]),
            ("Status", &[Some("Pending"), Some("Shipped")]),
            ("Fulfilment", &[Some("Merchant"), Some("Amazon")]),
            ("Sales Channel ", &[Some("Amazon.in"), Some("Amazon.in")]),
            ("ship-service-level", &[Some("Standard"), Some("Expedited")]),
            ("Style", &[Some("set389"), Some("jne3781")]),
            ("SKU", &[Some("set389-kr-np-s"), Some("jne3781-kr-xxxl")]),
            ("Category", &[Some("Dupatta"), Some("kurta")]),
            ("Size", &[Some("s"), Some("3xl")]),
            ("ASIN", &[Some("b09kxvbd7z"), Some("b09k3wfs32")]),
            ("Courier Status", &[Some("Shipped"), Some("Shipped")]),
            ("Qty", &[Some("1"), Some("1")]),
            ("currency", &[Some("INR"), Some("INR")]),
            ("Amount", &[Some("647.62"), Some("406.0")]),
            ("ship-city", &[Some("MUMBAI"), None]),
            ("ship-state", &[Some("RJ"), Some("Tamil Nadu")]),
            ("ship-postal-code", &[Some("400081.0"), None]),
            ("ship-country", &[Some("IN"), None]),
            ("promotion-ids", &[None, Some("Amazon PLCC Free-Financing")]),
            ("B2B", &[Some("False"), Some("False")]),
            ("fulfilled-by", &[Some("Easy Ship"), None]),
        ])
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.steps.len(), CleaningStage::TRANSFORMS.len());
        assert_eq!(pipeline.config(), &CleaningConfig::default());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = CleaningConfig {
            date_format: String::new(),
            ..CleaningConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_in_memory() {
        let outcome = Pipeline::builder()
            .build()
            .unwrap()
            .process(order_rows())
            .unwrap();

        let df = &outcome.data;
        assert_eq!(df.height(), 2);
        assert_eq!(
            texts(df, "status"),
            vec![Some("shipped".to_string()), Some("shipped".to_string())]
        );
        assert_eq!(
            texts(df, "category"),
            vec![Some("ethnic dress".to_string()), Some("kurta".to_string())]
        );
        assert_eq!(
            texts(df, "ship_state_or_territory"),
            vec![Some("rajasthan".to_string()), Some("tamil nadu".to_string())]
        );
        assert_eq!(
            texts(df, "fulfillment"),
            vec![Some("easy ship".to_string()), Some("amazon".to_string())]
        );
        assert_eq!(
            texts(df, "ship_city"),
            vec![Some("mumbai".to_string()), Some("unknown".to_string())]
        );
        assert_eq!(
            texts(df, "ship_country"),
            vec![Some("IN".to_string()), Some("IN".to_string())]
        );
        assert!(df.column("fulfilled_by").is_err());
        assert!(df.column("courier_status").is_err());

        let summary = &outcome.summary;
        assert_eq!(summary.stages.len(), 9);
        assert_eq!(summary.rows_before, 2);
        assert!(summary.output_path.is_none());
        assert!(!summary.has_warnings(), "{:?}", summary.warnings);
    }

    #[test]
    fn test_progress_reports_every_stage() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();
        let last_stage = Arc::new(Mutex::new(None));
        let last_stage_clone = last_stage.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                *last_stage_clone.lock().unwrap() = Some(update.stage);
            })
            .build()
            .unwrap();

        pipeline.process(order_rows()).unwrap();

        // start and end for each of the nine stages, then completion
        assert_eq!(call_count.load(Ordering::SeqCst), 19);
        assert_eq!(*last_stage.lock().unwrap(), Some(CleaningStage::Complete));
    }

    #[test]
    fn test_failure_is_reported() {
        let failed = Arc::new(AtomicUsize::new(0));
        let failed_clone = failed.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                if update.stage == CleaningStage::Failed {
                    failed_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        let df = frame(&[("Order ID", &[Some("171-1")])]);
        let err = pipeline.process(df).unwrap_err();

        assert!(err.is_schema_error());
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clean_file_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        let err = clean_file(dir.path().join("missing.csv"), &output, CleaningConfig::default())
            .unwrap_err();

        assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
        assert!(!output.exists());
    }
}
