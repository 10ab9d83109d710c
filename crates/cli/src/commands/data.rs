//! Whole-database export and import.
//!
//! # Usage
//!
//! ```bash
//! # Export every table as JSON to stdout
//! rh-cli data export
//!
//! # Human-readable export to a file
//! rh-cli data export -f text -o backup.txt
//!
//! # Replace all data with a JSON export
//! rh-cli data import -i backup.json
//! ```
//!
//! Import runs in one transaction: existing rows are deleted in reverse
//! dependency order, the dump's rows are inserted in order, and id
//! sequences are reset.

use std::path::Path;
use std::str::FromStr;

use rich_habits_server::db::dump::{self, DataDump, DumpError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::ConnectError;

#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid export file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Only JSON exports can be imported")]
    NotJson,
}

/// Output format for `data export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(format!("unknown format '{other}', expected json or text")),
        }
    }
}

/// Render a dump in `format`.
///
/// # Errors
///
/// Returns `DataError::Json` if serialization fails.
pub fn render(dump: &DataDump, format: ExportFormat) -> Result<String, DataError> {
    match format {
        ExportFormat::Json => {
            let mut out = serde_json::to_string_pretty(dump)?;
            out.push('\n');
            Ok(out)
        }
        ExportFormat::Text => Ok(dump.to_text()),
    }
}

/// Parse a JSON export, checking its table list.
///
/// # Errors
///
/// Returns `DataError::NotJson` for a text export, `DataError::Json` for
/// malformed input, or `DataError::Dump` for unknown or repeated tables.
pub fn parse(contents: &str) -> Result<DataDump, DataError> {
    if !contents.trim_start().starts_with('{') {
        return Err(DataError::NotJson);
    }
    let dump: DataDump = serde_json::from_str(contents)?;
    dump.validate()?;
    Ok(dump)
}

/// Export every table, writing to `output` or stdout.
///
/// # Errors
///
/// Returns an error if the connection, export or write fails.
pub async fn export(format: ExportFormat, output: Option<&Path>) -> Result<(), DataError> {
    let pool = super::connect().await?;

    tracing::info!("Exporting data...");
    let dump = dump::export(&pool).await?;
    let rendered = render(&dump, format)?;

    if let Some(path) = output {
        tokio::fs::write(path, rendered).await?;
        tracing::info!(path = %path.display(), "Export written");
    } else {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.flush().await?;
    }

    for (table, rows) in dump.row_counts() {
        tracing::info!(table, rows, "Exported");
    }
    Ok(())
}

/// Replace all data with the JSON export at `input`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// import transaction fails. Nothing is changed on failure.
pub async fn import(input: &Path) -> Result<(), DataError> {
    tracing::info!(path = %input.display(), "Loading export");
    let contents = tokio::fs::read_to_string(input).await?;
    let dump = parse(&contents)?;

    let pool = super::connect().await?;

    tracing::info!("Importing data...");
    let counts = dump::import(&pool, &dump).await?;
    for (table, rows) in counts {
        tracing::info!(table, rows, "Imported");
    }

    tracing::info!("Import complete!");
    Ok(())
}
