pub mod csv;
pub mod ifc;
pub mod json;

pub use crate::error::{ExportError, WriteError};
pub use csv::export_skipped_csv;
pub use ifc::write_model;
pub use json::export_json;
