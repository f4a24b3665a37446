pub mod reader;
pub mod record;

pub use crate::error::ReadError;
pub use reader::read_records;
pub use record::{CellValue, PipeRecord};
