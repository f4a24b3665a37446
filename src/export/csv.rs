use crate::error::ExportError;
use crate::sync::{SkipReason, SyncReport};
use std::fs::File;
use std::path::Path;

/// Writes one line per skipped sheet row.
pub fn export_skipped_csv<P: AsRef<Path>>(report: &SyncReport, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(["Row", "Name", "Reason", "Sheet GlobalId", "Model GlobalId"])?;

    for skipped in &report.skipped {
        let (reason, expected, actual) = match &skipped.reason {
            SkipReason::UnmatchedName => ("unmatched name", "", ""),
            SkipReason::IdentifierMismatch { expected, actual } => (
                "identifier mismatch",
                expected.as_deref().unwrap_or_default(),
                actual.as_str(),
            ),
            SkipReason::DanglingEntity { global_id } => ("dangling entity", "", global_id.as_str()),
        };
        writer.write_record([
            skipped.row.to_string().as_str(),
            skipped.name.as_deref().unwrap_or_default(),
            reason,
            expected,
            actual,
        ])?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}
