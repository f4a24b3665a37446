//! Spreadsheet-to-model property synchronization.

pub mod locator;
pub mod properties;
pub mod synchronizer;

pub use locator::{find_pipe_assemblies, index_components, ComponentIndex};
pub use properties::{resolve_length_unit, upsert_property, wrap_value};
pub use synchronizer::{sync, SkipReason, SkippedRecord, SyncReport};
