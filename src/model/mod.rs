pub mod entity;
pub mod graph;
pub mod guid;
pub mod header;

pub use entity::{Entity, EntityId, EntityKind};
pub use graph::IfcModel;
pub use header::{Header, HeaderRecord};
