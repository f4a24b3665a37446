use serde::Serialize;

/// A non-empty spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Parses free text the way a CSV cell is read: numbers become numbers.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(match text.parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(text.to_string()),
        })
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }

    /// Text form used for name and GlobalId comparison. Whole numbers print
    /// without a fractional part.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                (*n as i64).to_string()
            }
            CellValue::Number(n) => n.to_string(),
        }
    }
}

/// One data row of the attribute sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeRecord {
    /// 1-based row number as shown by spreadsheet applications.
    pub row: u32,
    pub name: Option<String>,
    /// Expected GlobalId of the component.
    pub identifier: Option<String>,
    /// Metres.
    pub length: Option<CellValue>,
    pub diameter: Option<CellValue>,
}
