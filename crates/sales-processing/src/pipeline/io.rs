//! Reading the raw export and persisting the cleaned table.

use crate::error::{CleaningError, Result, ResultExt};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read the raw order export with every column typed as text.
///
/// No schema inference is performed; type coercion is explicit and happens
/// in the pipeline.
pub fn read_orders_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CleaningError::InputNotFound(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Parsing {}", path.display()))?;

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Staging path next to `output`, so the final rename stays on one filesystem.
fn staging_path(output: &Path) -> PathBuf {
    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.csv".to_string());
    output.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}

/// Write `df` as CSV to `output`. Either the complete file appears or the
/// previous file (if any) is left untouched.
pub fn write_csv_atomic(df: &mut DataFrame, output: impl AsRef<Path>) -> Result<()> {
    let output = output.as_ref();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(output);
    let written = (|| -> Result<()> {
        let mut file = File::create(&staging)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = written {
        debug!("Removing partial output {}", staging.display());
        let _ = fs::remove_file(&staging);
        return Err(e.with_context(format!("Writing {}", output.display())));
    }

    fs::rename(&staging, output).map_err(|e| {
        let _ = fs::remove_file(&staging);
        CleaningError::Io(e).with_context(format!("Writing {}", output.display()))
    })?;

    info!("Cleaned dataset saved: {}", output.display());
    Ok(())
}
