use super::record::{CellValue, PipeRecord};
use crate::config::{SheetLayout, SyncOptions};
use crate::error::ReadError;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

/// Reads every data row of the attribute sheet.
///
/// `.csv` files are read as a single sheet; anything else is opened as a
/// workbook (xlsx, xlsm, xls, ods) and the first worksheet is used unless
/// `options.sheet_name` names another. Rows are read from
/// `layout.first_row` to the end of the sheet. Rows with empty identity
/// cells are kept; matching decides what to do with them.
///
/// # Errors
///
/// Returns [`ReadError`] if the file cannot be opened or decoded.
pub fn read_records<P: AsRef<Path>>(
    path: P,
    options: &SyncOptions,
) -> Result<Vec<PipeRecord>, ReadError> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let records = if is_csv {
        read_csv(path, &options.layout)?
    } else {
        read_workbook(path, options)?
    };

    debug!(path = %path.display(), rows = records.len(), "Read attribute rows");
    Ok(records)
}

fn read_workbook(path: &Path, options: &SyncOptions) -> Result<Vec<PipeRecord>, ReadError> {
    let workbook_error = |source| ReadError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = match &options.sheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ReadError::NoSheet {
                path: path.to_path_buf(),
            })?,
    }
    .map_err(workbook_error)?;

    let Some((last_row, _)) = range.end() else {
        return Ok(Vec::new());
    };

    let layout = &options.layout;
    let records = (layout.first_row..=last_row)
        .map(|row| {
            extract_record(row, layout, |column| {
                range.get_value((row, column)).and_then(cell_value)
            })
        })
        .collect();

    Ok(records)
}

fn read_csv(path: &Path, layout: &SheetLayout) -> Result<Vec<PipeRecord>, ReadError> {
    let csv_error = |source| ReadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        // Blank lines yield no record, so the row is the line it started on.
        let index = row.position().map_or(0, |p| p.line().saturating_sub(1)) as u32;
        if index < layout.first_row {
            continue;
        }
        records.push(extract_record(index, layout, |column| {
            row.get(column as usize).and_then(CellValue::from_text)
        }));
    }

    Ok(records)
}

fn extract_record(
    row: u32,
    layout: &SheetLayout,
    cell: impl Fn(u32) -> Option<CellValue>,
) -> PipeRecord {
    PipeRecord {
        row: row + 1,
        name: cell(layout.name_column).as_ref().map(CellValue::to_text),
        identifier: cell(layout.identifier_column).as_ref().map(CellValue::to_text),
        length: cell(layout.length_column),
        diameter: cell(layout.diameter_column),
    }
}

#[allow(clippy::cast_precision_loss)]
fn cell_value(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty | Data::Error(_) => None,
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Bool(b) => Some(CellValue::Number(if *b { 1.0 } else { 0.0 })),
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        other => Some(CellValue::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn csv_sheet(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    fn data_row(name: &str, id: &str, length: &str, diameter: &str) -> String {
        let mut cells = vec![String::new(); 16];
        cells[2] = name.to_string();
        cells[3] = id.to_string();
        cells[14] = length.to_string();
        cells[15] = diameter.to_string();
        cells.join(",")
    }

    #[test]
    fn csv_rows_start_at_row_eleven() {
        let mut rows = vec!["header"; 10];
        let first = data_row("ELBOW-1", "0K6MU3uWr7EOoSBKTyWcOc", "2.5", "0.1");
        rows.push(&first);
        let file = csv_sheet(&rows);

        let records = read_records(file.path(), &SyncOptions::default()).unwrap();

        assert_eq!(
            records,
            vec![PipeRecord {
                row: 11,
                name: Some("ELBOW-1".to_string()),
                identifier: Some("0K6MU3uWr7EOoSBKTyWcOc".to_string()),
                length: Some(CellValue::Number(2.5)),
                diameter: Some(CellValue::Number(0.1)),
            }]
        );
    }

    #[test]
    fn rows_without_identifier_are_kept() {
        let mut rows = vec!["header"; 10];
        let first = data_row("ELBOW-1", "", "", "");
        let second = data_row("TEE-2", "1kTvXnbbzCWw8lcMd1dR4o", "1", "");
        rows.push(&first);
        rows.push(&second);
        let file = csv_sheet(&rows);

        let records = read_records(file.path(), &SyncOptions::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, None);
        assert_eq!(records[0].length, None);
        assert_eq!(records[1].row, 12);
    }

    #[test]
    fn short_sheet_yields_no_records() {
        let file = csv_sheet(&["a", "b"]);
        let records = read_records(file.path(), &SyncOptions::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn blank_lines_keep_their_row() {
        let mut rows = vec!["header"; 9];
        rows.push("");
        let first = data_row("ELBOW-1", "0K6MU3uWr7EOoSBKTyWcOc", "2.5", "0.1");
        rows.push(&first);
        let file = csv_sheet(&rows);

        let records = read_records(file.path(), &SyncOptions::default()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row, 11);
        assert_eq!(records[0].name.as_deref(), Some("ELBOW-1"));
    }

    fn fixture() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/attributes.xlsx"))
    }

    #[test]
    fn workbook_rows_come_from_the_first_sheet() {
        let records = read_records(fixture(), &SyncOptions::default()).unwrap();

        assert_eq!(
            records,
            vec![
                PipeRecord {
                    row: 11,
                    name: Some("ELBOW-1".to_string()),
                    identifier: Some("0K6MU3uWr7EOoSBKTyWcOc".to_string()),
                    length: Some(CellValue::Number(2.5)),
                    diameter: Some(CellValue::Number(0.1)),
                },
                PipeRecord {
                    row: 12,
                    name: Some("TEE-2".to_string()),
                    identifier: Some("1kTvXnbbzCWw8lcMd1dR4o".to_string()),
                    length: Some(CellValue::Text("n/a".to_string())),
                    diameter: None,
                },
            ]
        );
    }

    #[test]
    fn named_sheet_overrides_the_first() {
        // This sheet has no header rows, so its used range starts at C11.
        let options = SyncOptions {
            sheet_name: Some("Revision B".to_string()),
            ..SyncOptions::default()
        };

        let records = read_records(fixture(), &options).unwrap();

        assert_eq!(
            records,
            vec![PipeRecord {
                row: 11,
                name: Some("VALVE-3".to_string()),
                identifier: Some("2Vh2uG3ET4lf1SJTwBW0zV".to_string()),
                length: Some(CellValue::Number(4.0)),
                diameter: Some(CellValue::Number(0.2)),
            }]
        );
    }

    #[test]
    fn unknown_sheet_is_a_read_error() {
        let options = SyncOptions {
            sheet_name: Some("Missing".to_string()),
            ..SyncOptions::default()
        };
        let err = read_records(fixture(), &options);
        assert!(matches!(err, Err(ReadError::Workbook { .. })));
    }

    #[test]
    fn missing_workbook_is_a_read_error() {
        let err = read_records("/nonexistent/attributes.xlsx", &SyncOptions::default());
        assert!(matches!(err, Err(ReadError::Workbook { .. })));
    }
}
