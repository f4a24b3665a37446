//! Fixed compatibility constants and run options.

use serde::Serialize;

pub const PSET_NAME: &str = "Pset_PipeProperties";
pub const LENGTH_PROPERTY: &str = "PipeLength";
pub const DIAMETER_PROPERTY: &str = "PipeDiameter";

/// Metres in the sheet, millimetres in the model.
pub const LENGTH_SCALE: f64 = 1000.0;

/// Assemblies whose name contains this (case-insensitively) are pipes.
pub const PIPE_TOKEN: &str = "PIPE";

pub const HEADER_ENCODING_MARKER: &str = "CP1251";

/// Column layout of the attribute spreadsheet template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetLayout {
    /// 0-based index of the first data row (row 11 in the workbook).
    pub first_row: u32,
    pub name_column: u32,
    pub identifier_column: u32,
    pub length_column: u32,
    pub diameter_column: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            first_row: 10,
            name_column: 2,
            identifier_column: 3,
            length_column: 14,
            diameter_column: 15,
        }
    }
}

/// How record-level and header failures are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Skip unmatched records and swallow header-fix failures.
    #[default]
    BestEffort,
    /// Abort on the first skipped record or header-fix failure.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub policy: Policy,
    /// Worksheet to read instead of the workbook's first sheet.
    pub sheet_name: Option<String>,
    pub layout: SheetLayout,
}

impl SyncOptions {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            policy: Policy::Strict,
            ..Self::default()
        }
    }
}
