//! Integration tests for the order cleaning pipeline.
//!
//! These tests run the full pipeline over a raw export fixture and inspect
//! the file it writes.

use pretty_assertions::assert_eq;
use polars::prelude::*;
use sales_processing::{
    ActionType, CleaningConfig, CleaningOutcome, CleaningStage, Pipeline, ReportGenerator,
    WarningKind, clean_file, read_orders_csv,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/amazon_sales_sample.csv")
}

fn fixture_text() -> String {
    fs::read_to_string(fixture_path()).expect("Failed to read fixture")
}

/// Write `content` as a raw export inside `dir`.
fn write_raw(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("raw.csv");
    fs::write(&path, content).expect("Failed to write raw file");
    path
}

/// Clean the fixture into a fresh directory and read the output back.
fn clean_fixture() -> (TempDir, CleaningOutcome, DataFrame) {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("processed/amazon_sales_cleaned.csv");
    let outcome = clean_file(fixture_path(), &output, CleaningConfig::default())
        .expect("Pipeline should succeed");
    let written = read_orders_csv(&output).expect("Output should be readable");
    (dir, outcome, written)
}

fn values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

/// Value of `column` on the single row whose order id is `order_id`.
fn cell(df: &DataFrame, order_id: &str, column: &str) -> Option<String> {
    let ids = values(df, "order_id");
    let matches: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| id.as_deref() == Some(order_id))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(matches.len(), 1, "expected exactly one row for {}", order_id);
    values(df, column)[matches[0]].clone()
}

fn has_order(df: &DataFrame, order_id: &str) -> bool {
    values(df, "order_id")
        .iter()
        .any(|id| id.as_deref() == Some(order_id))
}

// ============================================================================
// End-to-end Tests
// ============================================================================

#[test]
fn test_clean_fixture_shape() {
    let (_dir, outcome, written) = clean_fixture();

    assert_eq!(outcome.summary.rows_before, 13);
    assert_eq!(outcome.summary.rows_after, 10);
    assert_eq!(written.height(), 10);
    assert_eq!(outcome.summary.columns_before, 24);
    assert_eq!(written.width(), outcome.summary.columns_after);
    assert_eq!(outcome.summary.stages.len(), 9);
    assert!(outcome.summary.output_path.is_some());
    assert!(outcome.summary.warnings.is_empty());

    let columns: Vec<String> = written
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    for absent in ["unnamed:_22", "courier_status", "fulfilled_by", "ship_state", "qty"] {
        assert!(!columns.contains(&absent.to_string()), "{} should be gone", absent);
    }
    for present in ["ship_state_or_territory", "quantity", "fulfillment", "sales_channel"] {
        assert!(columns.contains(&present.to_string()), "{} should exist", present);
    }
}

#[test]
fn test_status_reconciliation() {
    let (_dir, _outcome, written) = clean_fixture();

    // pending order the courier already shipped
    assert_eq!(cell(&written, "403-9615377-8133951", "status").as_deref(), Some("shipped"));
    assert_eq!(
        cell(&written, "405-8078784-5731545", "status").as_deref(),
        Some("cancelled or returned")
    );
    assert_eq!(
        cell(&written, "408-5748499-6859555", "status").as_deref(),
        Some("cancelled or returned")
    );
    assert_eq!(
        cell(&written, "171-8103182-4289117", "status").as_deref(),
        Some("cancelled or returned")
    );

    // pending and shipping orders are on the drop list
    assert!(!has_order(&written, "407-1069790-7240320"));
    assert!(!has_order(&written, "406-3412992-5523554"));

    let known = CleaningConfig::default().status_rules.known_statuses;
    for status in values(&written, "status").into_iter().flatten() {
        assert!(known.contains(&status), "unexpected status {}", status);
    }
}

#[test]
fn test_relabeling() {
    let (_dir, _outcome, written) = clean_fixture();

    assert_eq!(
        cell(&written, "408-5748499-6859555", "category").as_deref(),
        Some("ethnic dress")
    );
    assert_eq!(
        cell(&written, "405-8078784-5731545", "fulfillment").as_deref(),
        Some("easy ship")
    );
    assert_eq!(
        cell(&written, "404-0687676-7273146", "fulfillment").as_deref(),
        Some("amazon")
    );
    // missing country defaults to IN
    assert_eq!(cell(&written, "408-5748499-6859555", "ship_country").as_deref(), Some("IN"));
}

#[test]
fn test_region_canonicalization() {
    let (_dir, _outcome, written) = clean_fixture();

    assert_eq!(
        cell(&written, "403-9615377-8133951", "ship_state_or_territory").as_deref(),
        Some("rajasthan")
    );
    assert_eq!(
        cell(&written, "402-4393761-0311520", "ship_state_or_territory").as_deref(),
        Some("puducherry")
    );
    assert_eq!(
        cell(&written, "405-1175468-1629354", "ship_state_or_territory").as_deref(),
        Some("unknown")
    );
    assert_eq!(cell(&written, "405-1175468-1629354", "ship_city").as_deref(), Some("unknown"));
    assert_eq!(
        cell(&written, "405-1175468-1629354", "ship_postal_code").as_deref(),
        Some("unknown")
    );

    let rules = CleaningConfig::default().regions;
    for region in values(&written, "ship_state_or_territory") {
        let region = region.expect("region column has no nulls");
        assert!(rules.is_valid(&region), "invalid region {}", region);
    }
}

#[test]
fn test_duplicates_keep_last_occurrence() {
    let (_dir, outcome, written) = clean_fixture();

    let amount: f64 = cell(&written, "404-1490984-4578765", "amount")
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(amount, 799.0);
    assert!(
        outcome
            .summary
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::DuplicatesRemoved && a.affected == 1)
    );
}

#[test]
fn test_case_rules_hold_in_output() {
    let (_dir, _outcome, written) = clean_fixture();
    let config = CleaningConfig::default();

    assert_eq!(cell(&written, "408-5748499-6859555", "size").as_deref(), Some("FREE"));
    assert_eq!(cell(&written, "405-8078784-5731545", "ship_city").as_deref(), Some("mumbai"));

    for column in config.text_columns() {
        // dropped columns and the boolean promotion flag carry no case rule
        if column == config.promotion_column || written.column(column).is_err() {
            continue;
        }
        let rule = config.case_rule(column);
        for value in values(&written, column).into_iter().flatten() {
            assert_eq!(rule.apply(&value), value, "case rule broken in {}", column);
        }
    }
}

#[test]
fn test_format_fixups_and_dates() {
    let (_dir, _outcome, written) = clean_fixture();

    assert_eq!(
        cell(&written, "405-8078784-5731545", "ship_postal_code").as_deref(),
        Some("400081")
    );
    assert_eq!(
        cell(&written, "171-9198151-1101146", "promotion_ids").as_deref(),
        Some("true")
    );
    assert_eq!(
        cell(&written, "405-8078784-5731545", "promotion_ids").as_deref(),
        Some("false")
    );
    assert_eq!(cell(&written, "405-8078784-5731545", "date").as_deref(), Some("2022-04-30"));
    assert_eq!(cell(&written, "402-4393761-0311520", "quantity").as_deref(), Some("2"));
    assert_eq!(cell(&written, "406-7807733-3785945", "amount"), None);
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    clean_file(fixture_path(), &first, CleaningConfig::default()).unwrap();
    clean_file(fixture_path(), &second, CleaningConfig::default()).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    let err = clean_file(dir.path().join("absent.csv"), &output, CleaningConfig::default())
        .unwrap_err();

    assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
    assert!(err.is_schema_error());
    assert!(!output.exists());
}

#[test]
fn test_missing_column_aborts() {
    let dir = TempDir::new().unwrap();
    let without_amount: String = fixture_text()
        .lines()
        .map(|line| {
            let mut fields: Vec<&str> = line.split(',').collect();
            fields.remove(15);
            fields.join(",")
        })
        .collect::<Vec<_>>()
        .join("\n");
    let input = write_raw(&dir, &without_amount);
    let output = dir.path().join("out.csv");

    let err = clean_file(&input, &output, CleaningConfig::default()).unwrap_err();

    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    assert!(err.to_string().contains("amount"));
    assert!(!output.exists());
}

#[test]
fn test_bad_date_leaves_existing_output_untouched() {
    let dir = TempDir::new().unwrap();
    let input = write_raw(&dir, &fixture_text().replacen("04-28-22", "2022/04/28", 1));
    let output = dir.path().join("out.csv");
    fs::write(&output, "previous run").unwrap();

    let err = clean_file(&input, &output, CleaningConfig::default()).unwrap_err();

    assert_eq!(err.error_code(), "DATE_PARSE_FAILED");
    let message = err.to_string();
    assert!(message.contains("line 13"), "{}", message);
    assert!(message.contains("2022/04/28"), "{}", message);
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous run");

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_negative_quantity_aborts() {
    let dir = TempDir::new().unwrap();
    let input = write_raw(
        &dir,
        &fixture_text().replacen("B09SDXFFQ1,Shipped,1,", "B09SDXFFQ1,Shipped,-1,", 1),
    );
    let output = dir.path().join("out.csv");

    let err = clean_file(&input, &output, CleaningConfig::default()).unwrap_err();

    assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
    assert!(!output.exists());
}

#[test]
fn test_oversized_quantity_aborts() {
    let dir = TempDir::new().unwrap();
    let input = write_raw(
        &dir,
        &fixture_text().replacen("B09SDXFFQ1,Shipped,1,", "B09SDXFFQ1,Shipped,1e20,", 1),
    );
    let output = dir.path().join("out.csv");

    let err = clean_file(&input, &output, CleaningConfig::default()).unwrap_err();

    assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
    assert!(err.to_string().contains("1e20"));
    assert!(!output.exists());
}

// ============================================================================
// Warnings and Configuration
// ============================================================================

#[test]
fn test_unmatched_region_is_warned_and_kept() {
    let dir = TempDir::new().unwrap();
    let input = write_raw(&dir, &fixture_text().replace("TELANGANA", "Telengana"));
    let output = dir.path().join("out.csv");

    let outcome = clean_file(&input, &output, CleaningConfig::default()).unwrap();

    let unmatched: Vec<_> = outcome
        .summary
        .warnings_of(WarningKind::UnmatchedRegion)
        .collect();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].value, "telengana");
    assert_eq!(unmatched[0].rows, 1);
    assert_eq!(
        outcome
            .summary
            .warnings_of(WarningKind::InvariantViolation)
            .count(),
        0
    );

    let written = read_orders_csv(&output).unwrap();
    assert_eq!(
        cell(&written, "406-7807733-3785945", "ship_state_or_territory").as_deref(),
        Some("telengana")
    );
}

#[test]
fn test_config_file_overrides_drop_list() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("tables.json");
    fs::write(&config_path, r#"{"status_rules": {"drop_list": ["shipping"]}}"#).unwrap();
    let config = CleaningConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.status_rules.terminal_label, "cancelled or returned");

    let outcome = clean_file(fixture_path(), dir.path().join("out.csv"), config).unwrap();

    assert_eq!(outcome.summary.rows_after, 11);
    let unknown: Vec<_> = outcome
        .summary
        .warnings_of(WarningKind::UnknownStatus)
        .collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].value, "pending");
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("tables.json");
    fs::write(&config_path, r#"{"dedup_key": []}"#).unwrap();

    let err = CleaningConfig::from_json_file(&config_path).unwrap_err();

    assert_eq!(err.error_code(), "INVALID_CONFIG");
}

// ============================================================================
// Progress and Reporting
// ============================================================================

#[test]
fn test_progress_reported_for_every_stage() {
    let dir = TempDir::new().unwrap();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);

    Pipeline::builder()
        .on_progress(move |update| sink.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .run(fixture_path(), dir.path().join("out.csv"))
        .unwrap();

    let stages = stages.lock().unwrap();
    assert_eq!(stages.len(), 21);
    assert_eq!(stages.first(), Some(&CleaningStage::SchemaNormalization));
    assert!(stages.contains(&CleaningStage::Persistence));
    assert_eq!(stages.last(), Some(&CleaningStage::Complete));
}

#[test]
fn test_report_over_cleaned_output() {
    let (dir, outcome, _written) = clean_fixture();
    let config = CleaningConfig::default();

    let report =
        ReportGenerator::build_report(&fixture_path().display().to_string(), &outcome, &config)
            .unwrap();

    assert_eq!(report.sales.total_orders, 10);
    assert!((report.sales.total_revenue - 4995.95).abs() < 1e-6);
    assert_eq!(
        report.output_file.as_deref().map(Path::new),
        Some(dir.path().join("processed/amazon_sales_cleaned.csv").as_path())
    );

    let generator = ReportGenerator::new(dir.path());
    let path = generator
        .write_report_to_file(&report, "amazon_sales_cleaned")
        .unwrap();
    assert!(path.ends_with("amazon_sales_cleaned_report.json"));
}
