//! Error types for IFC property synchronization.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing STEP content.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors that can occur when loading an IFC model.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file was read but its content could not be parsed.
    #[error("failed to parse '{path}': {source}")]
    Parse { path: PathBuf, source: ParseError },
}

/// Errors that can occur when reading spreadsheet rows.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The workbook could not be opened or decoded.
    #[error("failed to open workbook '{path}': {source}")]
    Workbook {
        path: PathBuf,
        source: calamine::Error,
    },

    /// The workbook contains no worksheets.
    #[error("workbook '{path}' has no worksheets")]
    NoSheet { path: PathBuf },

    /// A CSV sheet could not be read.
    #[error("failed to read CSV '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Errors that can occur when writing the output model.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The output has no usable parent directory.
    #[error("output path '{path}' has no parent directory")]
    NoParent { path: PathBuf },

    /// Failed to create or fill the temporary output file.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to move the finished file into place.
    #[error("failed to persist '{path}': {source}")]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// Record-level failures, surfaced only under the strict policy.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No indexed component carries the record's name.
    #[error("row {row}: no component named '{name}'")]
    UnmatchedName { row: u32, name: String },

    /// The component exists but its GlobalId differs from the sheet.
    #[error("row {row}: component '{name}' has GlobalId {actual}, sheet expects {expected}")]
    IdentifierMismatch {
        row: u32,
        name: String,
        expected: String,
        actual: String,
    },

    /// The index points at a GlobalId no longer present in the model.
    #[error("row {row}: GlobalId {global_id} for '{name}' is not in the model")]
    DanglingEntity {
        row: u32,
        name: String,
        global_id: String,
    },
}

/// Errors raised by the header encoding fix.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The header lacks a required record.
    #[error("header record {0} is missing")]
    MissingRecord(&'static str),

    /// Some characters had no CP1251 mapping and were substituted.
    #[error("{count} header character(s) could not be represented in CP1251")]
    Unmappable { count: usize },
}

/// Errors that can occur when exporting reports.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}

/// Errors that abort a conversion run. No output is written when one occurs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Read(#[from] ReadError),

    /// The spreadsheet was readable but yielded no rows.
    #[error("no data rows in '{path}'")]
    EmptySheet { path: PathBuf },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Batch output must go to an existing directory.
    #[error("output path '{path}' must be a directory")]
    NotADirectory { path: PathBuf },
}
