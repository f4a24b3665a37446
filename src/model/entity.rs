use crate::model::guid::GLOBAL_ID_LEN;
use crate::parser::step::{format_attributes, StepEntity, StepValue};
use serde::Serialize;

/// STEP instance number (`#123`), used as the arena handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The entity kinds this crate reads or creates. Everything else is
/// `Opaque` and round-trips untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Assembly,
    PropertySet,
    Property,
    Unit,
    UnitAssignment,
    PropertyLink,
    Decomposition,
    Nesting,
    Opaque,
}

impl EntityKind {
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "IFCELEMENTASSEMBLY" => EntityKind::Assembly,
            "IFCPROPERTYSET" => EntityKind::PropertySet,
            "IFCPROPERTYSINGLEVALUE" => EntityKind::Property,
            "IFCSIUNIT" => EntityKind::Unit,
            "IFCUNITASSIGNMENT" => EntityKind::UnitAssignment,
            "IFCRELDEFINESBYPROPERTIES" => EntityKind::PropertyLink,
            "IFCRELAGGREGATES" => EntityKind::Decomposition,
            "IFCRELNESTS" => EntityKind::Nesting,
            _ => EntityKind::Opaque,
        }
    }
}

/// Attribute positions used by this crate.
pub mod attr {
    // IfcRoot
    pub const GLOBAL_ID: usize = 0;
    pub const OWNER_HISTORY: usize = 1;
    pub const NAME: usize = 2;

    // IfcProduct
    pub const REPRESENTATION: usize = 6;

    // IfcRelAggregates / IfcRelNests
    pub const RELATING_OBJECT: usize = 4;
    pub const RELATED_PARTS: usize = 5;

    // IfcRelDefinesByProperties
    pub const RELATED_OBJECTS: usize = 4;
    pub const RELATING_DEFINITION: usize = 5;

    // IfcPropertySet
    pub const HAS_PROPERTIES: usize = 4;

    // IfcPropertySingleValue
    pub const PROPERTY_NAME: usize = 0;
    pub const NOMINAL_VALUE: usize = 2;

    // IfcSIUnit
    pub const UNIT_TYPE: usize = 1;

    // IfcUnitAssignment
    pub const UNITS: usize = 0;
}

#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    type_name: String,
    attributes: Vec<StepValue>,
    /// Original text, dropped on first mutation.
    raw: Option<String>,
}

impl Entity {
    #[must_use]
    pub fn new(id: EntityId, type_name: &str, attributes: Vec<StepValue>) -> Self {
        let type_name = type_name.to_ascii_uppercase();
        Self {
            id,
            kind: EntityKind::from_type_name(&type_name),
            type_name,
            attributes,
            raw: None,
        }
    }

    pub(crate) fn from_step(step: StepEntity) -> Self {
        Self {
            id: EntityId(step.id),
            kind: EntityKind::from_type_name(&step.entity_type),
            type_name: step.entity_type,
            attributes: step.values,
            raw: Some(step.raw),
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn attributes(&self) -> &[StepValue] {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, index: usize) -> Option<&StepValue> {
        self.attributes.get(index)
    }

    /// Overwrites one attribute, padding with `$` if the list is short.
    pub fn set_attribute(&mut self, index: usize, value: StepValue) {
        if self.attributes.len() <= index {
            self.attributes.resize(index + 1, StepValue::Null);
        }
        self.attributes[index] = value;
        self.raw = None;
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.raw.is_none()
    }

    /// GlobalId of a rooted entity: a 22-character string in the first
    /// attribute followed by an owner-history slot. The id is taken as
    /// written; exporters do not all honour the IFC alphabet.
    #[must_use]
    pub fn global_id(&self) -> Option<&str> {
        if self.kind == EntityKind::Property {
            return None;
        }
        match self.attribute(attr::OWNER_HISTORY) {
            Some(StepValue::Reference(_) | StepValue::Null) => {}
            _ => return None,
        }
        self.attribute(attr::GLOBAL_ID)
            .and_then(StepValue::as_str)
            .filter(|id| id.chars().count() == GLOBAL_ID_LEN)
    }

    #[must_use]
    pub fn is_rooted(&self) -> bool {
        self.global_id().is_some()
    }

    /// Human-readable name: `Name` of a rooted entity or of a property.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        let index = match self.kind {
            EntityKind::Property => attr::PROPERTY_NAME,
            _ if self.is_rooted() => attr::NAME,
            _ => return None,
        };
        self.attribute(index).and_then(StepValue::as_str)
    }

    #[must_use]
    pub fn reference(&self, index: usize) -> Option<EntityId> {
        self.attribute(index)
            .and_then(StepValue::as_reference)
            .map(EntityId)
    }

    #[must_use]
    pub fn references(&self, index: usize) -> Vec<EntityId> {
        self.attribute(index)
            .map(StepValue::references)
            .unwrap_or_default()
            .into_iter()
            .map(EntityId)
            .collect()
    }

    /// `#id=BODY` without the terminating `;`.
    #[must_use]
    pub fn to_step(&self) -> String {
        match &self.raw {
            Some(raw) => format!("{}={raw}", self.id),
            None => format!(
                "{}={}{}",
                self.id,
                self.type_name,
                format_attributes(&self.attributes)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assembly() -> Entity {
        Entity::new(
            EntityId(7),
            "IfcElementAssembly",
            vec![
                StepValue::String("2O2Fr$t4X7Zf8NOew3FLOH".to_string()),
                StepValue::Reference(1),
                StepValue::String("PIPE 1".to_string()),
            ],
        )
    }

    #[test]
    fn classifies_known_kinds() {
        assert_eq!(assembly().kind(), EntityKind::Assembly);
        assert_eq!(
            EntityKind::from_type_name("IFCWALL"),
            EntityKind::Opaque
        );
    }

    #[test]
    fn rooted_entities_expose_name_and_global_id() {
        let entity = assembly();
        assert_eq!(entity.global_id(), Some("2O2Fr$t4X7Zf8NOew3FLOH"));
        assert_eq!(entity.name(), Some("PIPE 1"));
    }

    #[test]
    fn any_22_character_id_counts_as_global_id() {
        let entity = Entity::new(
            EntityId(8),
            "IFCELEMENTASSEMBLY",
            vec![
                StepValue::String("PIPEAAAAAAAAAAAAAAAAAA".to_string()),
                StepValue::Null,
                StepValue::String("PIPE 2".to_string()),
            ],
        );
        assert_eq!(entity.global_id(), Some("PIPEAAAAAAAAAAAAAAAAAA"));
        assert_eq!(entity.name(), Some("PIPE 2"));
    }

    #[test]
    fn named_resources_are_not_rooted() {
        let property = Entity::new(
            EntityId(9),
            "IFCPROPERTYSINGLEVALUE",
            vec![
                StepValue::String("PipeLengthPipeLengthPi".to_string()),
                StepValue::Null,
                StepValue::Real(1.0),
            ],
        );
        let colour = Entity::new(
            EntityId(10),
            "IFCCOLOURRGB",
            vec![
                StepValue::String("ColourColourColourColo".to_string()),
                StepValue::Real(0.5),
            ],
        );

        assert_eq!(property.global_id(), None);
        assert_eq!(property.name(), Some("PipeLengthPipeLengthPi"));
        assert_eq!(colour.global_id(), None);
    }

    #[test]
    fn set_attribute_pads_and_marks_modified() {
        let mut entity = assembly();
        entity.set_attribute(4, StepValue::Enum("X".to_string()));

        assert!(entity.is_modified());
        assert_eq!(entity.attribute(3), Some(&StepValue::Null));
        assert_eq!(
            entity.to_step(),
            "#7=IFCELEMENTASSEMBLY('2O2Fr$t4X7Zf8NOew3FLOH',#1,'PIPE 1',$,.X.)"
        );
    }
}
