use super::entity::{attr, Entity, EntityId, EntityKind};
use super::header::Header;
use crate::parser::encoding::SourceEncoding;
use crate::parser::step::{StepFile, StepValue};
use std::collections::HashMap;

/// In-memory IFC model: an arena of entities keyed by instance number, plus
/// inverse indices for the relationships this crate walks.
///
/// Relationships stay as references inside attributes; the indices below are
/// derived from them and kept current as entities are added.
#[derive(Debug)]
pub struct IfcModel {
    pub schema: String,
    pub header: Header,
    /// Encoding the model is written back in.
    pub encoding: SourceEncoding,
    entities: Vec<Entity>,
    slots: HashMap<EntityId, usize>,
    by_global_id: HashMap<String, EntityId>,
    children: HashMap<EntityId, Vec<EntityId>>,   // parent → decomposed parts
    parent: HashMap<EntityId, EntityId>,          // part → parent
    defined_by: HashMap<EntityId, Vec<EntityId>>, // object → property links
    next_id: u64,
}

impl IfcModel {
    #[must_use]
    pub fn from_step(step_file: StepFile) -> Self {
        let mut model = Self {
            schema: step_file.schema,
            header: Header::new(step_file.header.into_iter().map(Into::into).collect()),
            encoding: SourceEncoding::default(),
            entities: Vec::with_capacity(step_file.entities.len()),
            slots: HashMap::new(),
            by_global_id: HashMap::new(),
            children: HashMap::new(),
            parent: HashMap::new(),
            defined_by: HashMap::new(),
            next_id: 1,
        };

        for step_entity in step_file.entities {
            model.insert(Entity::from_step(step_entity));
        }

        model
    }

    fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.next_id = self.next_id.max(id.0 + 1);
        self.index(&entity);
        self.slots.insert(id, self.entities.len());
        self.entities.push(entity);
        id
    }

    fn index(&mut self, entity: &Entity) {
        if let Some(global_id) = entity.global_id() {
            self.by_global_id
                .entry(global_id.to_string())
                .or_insert(entity.id());
        }

        match entity.kind() {
            EntityKind::Decomposition => self.index_decomposition(entity),
            // IFC2X3 counts nesting as decomposition too.
            EntityKind::Nesting if self.schema.to_ascii_uppercase().starts_with("IFC2X3") => {
                self.index_decomposition(entity);
            }
            EntityKind::PropertyLink => {
                for object in entity.references(attr::RELATED_OBJECTS) {
                    self.defined_by.entry(object).or_default().push(entity.id());
                }
            }
            _ => {}
        }
    }

    fn index_decomposition(&mut self, rel: &Entity) {
        if let Some(parent) = rel.reference(attr::RELATING_OBJECT) {
            let parts = rel.references(attr::RELATED_PARTS);
            for part in &parts {
                self.parent.insert(*part, parent);
            }
            self.children.entry(parent).or_default().extend(parts);
        }
    }

    /// Adds a new entity with the next free instance number.
    pub fn add_entity(&mut self, type_name: &str, attributes: Vec<StepValue>) -> EntityId {
        let id = EntityId(self.next_id);
        self.insert(Entity::new(id, type_name, attributes))
    }

    /// Entities in file order, new ones last.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(&id).map(|&slot| &self.entities[slot])
    }

    /// Mutable access for attribute edits. Relationship attributes must not
    /// be rewritten through this; the inverse indices would go stale.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get(&id).map(|&slot| &mut self.entities[slot])
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind() == kind)
    }

    pub fn entities_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities
            .iter()
            .filter(move |e| e.type_name().eq_ignore_ascii_case(type_name))
    }

    #[must_use]
    pub fn by_global_id(&self, global_id: &str) -> Option<&Entity> {
        self.by_global_id
            .get(global_id)
            .and_then(|id| self.entity(*id))
    }

    /// Replaces an entity's GlobalId and keeps the lookup index in step.
    pub fn set_global_id(&mut self, id: EntityId, global_id: &str) {
        let Some(entity) = self.entity_mut(id) else {
            return;
        };
        let previous = entity.global_id().map(str::to_string);
        entity.set_attribute(attr::GLOBAL_ID, StepValue::String(global_id.to_string()));

        if let Some(previous) = previous {
            if self.by_global_id.get(&previous) == Some(&id) {
                self.by_global_id.remove(&previous);
            }
        }
        self.by_global_id.insert(global_id.to_string(), id);
    }

    /// Direct parts of `id` through the decomposition relationship.
    #[must_use]
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parent.get(&id).copied()
    }

    /// Property links (`IfcRelDefinesByProperties`) naming `id` as a related object.
    #[must_use]
    pub fn defined_by(&self, id: EntityId) -> &[EntityId] {
        self.defined_by.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Serializes the full model as an ISO 10303-21 physical file.
    ///
    /// Statements are written one per line with `\n` endings. Untouched
    /// statements keep their text, but comments between statements and the
    /// original line breaks are not kept.
    #[must_use]
    pub fn to_step(&self) -> String {
        let mut out = String::from("ISO-10303-21;\nHEADER;\n");
        for record in self.header.records() {
            out.push_str(&record.to_step());
            out.push_str(";\n");
        }
        out.push_str("ENDSEC;\nDATA;\n");
        for entity in &self.entities {
            out.push_str(&entity.to_step());
            out.push_str(";\n");
        }
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        out
    }
}
