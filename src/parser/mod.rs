pub mod encoding;
pub mod ifc;
pub mod step;

pub use crate::error::{LoadError, ParseError};
pub use encoding::SourceEncoding;
pub use ifc::load_model;
pub use step::{StepEntity, StepFile, StepRecord, StepValue};
