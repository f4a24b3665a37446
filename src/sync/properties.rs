use crate::config::PSET_NAME;
use crate::model::entity::attr;
use crate::model::guid::new_global_id;
use crate::model::{EntityId, EntityKind, IfcModel};
use crate::parser::StepValue;
use crate::sheet::CellValue;
use tracing::{debug, warn};

/// What `upsert_property` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    pub pset_created: bool,
    pub change: PropertyChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyChange {
    Created,
    Updated,
    /// A property of that name exists but is not a single value.
    Untouched,
}

/// Wraps a raw cell value in an IFC defined type: numbers as `IFCREAL`,
/// text as `IFCLABEL`, nothing as `$`.
#[must_use]
pub fn wrap_value(value: Option<&CellValue>) -> StepValue {
    match value {
        Some(CellValue::Number(n)) => {
            StepValue::Typed("IFCREAL".to_string(), Box::new(StepValue::Real(*n)))
        }
        Some(CellValue::Text(s)) => {
            StepValue::Typed("IFCLABEL".to_string(), Box::new(StepValue::String(s.clone())))
        }
        None => StepValue::Null,
    }
}

/// Property set named `Pset_PipeProperties` linked to `entity`, if any.
#[must_use]
pub fn find_property_set(model: &IfcModel, entity: EntityId) -> Option<EntityId> {
    model.defined_by(entity).iter().find_map(|&link| {
        let definition = model.entity(link)?.reference(attr::RELATING_DEFINITION)?;
        let pset = model.entity(definition)?;
        (pset.kind() == EntityKind::PropertySet && pset.name() == Some(PSET_NAME))
            .then_some(definition)
    })
}

/// Creates an empty `Pset_PipeProperties` and links it to `entity`.
pub fn create_property_set(model: &mut IfcModel, entity: EntityId) -> EntityId {
    let owner_history = model
        .entity(entity)
        .and_then(|e| e.attribute(attr::OWNER_HISTORY))
        .filter(|v| matches!(v, StepValue::Reference(_)))
        .cloned()
        .unwrap_or(StepValue::Null);

    let pset = model.add_entity(
        "IFCPROPERTYSET",
        vec![
            StepValue::String(new_global_id()),
            owner_history.clone(),
            StepValue::String(PSET_NAME.to_string()),
            StepValue::Null,
            StepValue::List(Vec::new()),
        ],
    );
    model.add_entity(
        "IFCRELDEFINESBYPROPERTIES",
        vec![
            StepValue::String(new_global_id()),
            owner_history,
            StepValue::Null,
            StepValue::Null,
            StepValue::List(vec![StepValue::Reference(entity.0)]),
            StepValue::Reference(pset.0),
        ],
    );

    debug!(entity = %entity, pset = %pset, "Created property set");
    pset
}

/// The model's length unit, creating and registering a metre if none exists.
pub fn resolve_length_unit(model: &mut IfcModel) -> EntityId {
    let existing = model.entities_of_kind(EntityKind::Unit).find(|unit| {
        matches!(
            unit.attribute(attr::UNIT_TYPE),
            Some(StepValue::Enum(kind)) if kind.eq_ignore_ascii_case("LENGTHUNIT")
        )
    });
    if let Some(unit) = existing {
        return unit.id();
    }

    let unit = model.add_entity(
        "IFCSIUNIT",
        vec![
            StepValue::Derived,
            StepValue::Enum("LENGTHUNIT".to_string()),
            StepValue::Null,
            StepValue::Enum("METRE".to_string()),
        ],
    );

    let assignment = model
        .entities_of_kind(EntityKind::UnitAssignment)
        .next()
        .map(|e| e.id());
    if let Some(assignment) = assignment.and_then(|id| model.entity_mut(id)) {
        let mut units = match assignment.attribute(attr::UNITS) {
            Some(StepValue::List(units)) => units.clone(),
            _ => Vec::new(),
        };
        units.push(StepValue::Reference(unit.0));
        assignment.set_attribute(attr::UNITS, StepValue::List(units));
    }

    debug!(unit = %unit, "Created length unit");
    unit
}

/// Creates or updates property `name` in the entity's `Pset_PipeProperties`.
///
/// An existing property keeps its identity; only its nominal value is
/// replaced. A new property is appended with the model's length unit.
pub fn upsert_property(
    model: &mut IfcModel,
    entity: EntityId,
    name: &str,
    value: Option<&CellValue>,
) -> Upsert {
    let (pset, pset_created) = match find_property_set(model, entity) {
        Some(pset) => (pset, false),
        None => (create_property_set(model, entity), true),
    };

    let properties = model
        .entity(pset)
        .map(|p| p.references(attr::HAS_PROPERTIES))
        .unwrap_or_default();

    let existing = properties.iter().copied().find(|&id| {
        model
            .entity(id)
            .and_then(|p| p.attribute(attr::PROPERTY_NAME))
            .and_then(StepValue::as_str)
            == Some(name)
    });

    let wrapped = wrap_value(value);

    if let Some(property) = existing.and_then(|id| model.entity_mut(id)) {
        if property.kind() != EntityKind::Property {
            warn!(
                property = %property.id(),
                kind = property.type_name(),
                name,
                "Existing property is not a single value, left unchanged"
            );
            return Upsert {
                pset_created,
                change: PropertyChange::Untouched,
            };
        }
        property.set_attribute(attr::NOMINAL_VALUE, wrapped);
        return Upsert {
            pset_created,
            change: PropertyChange::Updated,
        };
    }

    let unit = resolve_length_unit(model);
    let property = model.add_entity(
        "IFCPROPERTYSINGLEVALUE",
        vec![
            StepValue::String(name.to_string()),
            StepValue::Null,
            wrapped,
            StepValue::Reference(unit.0),
        ],
    );

    let mut list: Vec<StepValue> = properties
        .into_iter()
        .map(|id| StepValue::Reference(id.0))
        .collect();
    list.push(StepValue::Reference(property.0));
    if let Some(pset) = model.entity_mut(pset) {
        pset.set_attribute(attr::HAS_PROPERTIES, StepValue::List(list));
    }

    Upsert {
        pset_created,
        change: PropertyChange::Created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::guid::is_valid_global_id;
    use crate::parser::StepFile;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCOWNERHISTORY($,$,$,.NOCHANGE.,$,$,$,0);
#2=IFCELEMENTASSEMBLY('0K6MU3uWr7EOoSBKTyWcOc',#1,'ELBOW 1',$,$,$,$,$,$,$);
#3=IFCUNITASSIGNMENT((#4));
#4=IFCSIUNIT(*,.PLANEANGLEUNIT.,$,.RADIAN.);
ENDSEC;
END-ISO-10303-21;
";

    fn model() -> IfcModel {
        IfcModel::from_step(StepFile::parse(MODEL).unwrap())
    }

    fn property_value(model: &IfcModel, pset: EntityId, name: &str) -> Option<StepValue> {
        model
            .entity(pset)?
            .references(attr::HAS_PROPERTIES)
            .into_iter()
            .filter_map(|id| model.entity(id))
            .find(|p| p.name() == Some(name))
            .and_then(|p| p.attribute(attr::NOMINAL_VALUE).cloned())
    }

    #[test]
    fn creates_pset_link_and_property() {
        let mut model = model();
        let entity = EntityId(2);

        let upsert = upsert_property(&mut model, entity, "PipeLength", Some(&CellValue::Number(2500.0)));

        assert_eq!(
            upsert,
            Upsert {
                pset_created: true,
                change: PropertyChange::Created
            }
        );
        let pset = find_property_set(&model, entity).unwrap();
        let pset_entity = model.entity(pset).unwrap();
        assert_eq!(pset_entity.attribute(attr::OWNER_HISTORY), Some(&StepValue::Reference(1)));
        assert!(pset_entity.global_id().is_some_and(is_valid_global_id));
        assert_eq!(
            property_value(&model, pset, "PipeLength"),
            Some(wrap_value(Some(&CellValue::Number(2500.0))))
        );
    }

    #[test]
    fn second_upsert_updates_in_place() {
        let mut model = model();
        let entity = EntityId(2);

        upsert_property(&mut model, entity, "PipeLength", Some(&CellValue::Number(1.0)));
        let pset = find_property_set(&model, entity).unwrap();
        let first = model.entity(pset).unwrap().references(attr::HAS_PROPERTIES);
        let count = model.len();

        let upsert = upsert_property(&mut model, entity, "PipeLength", Some(&CellValue::Number(2.0)));

        assert_eq!(upsert.change, PropertyChange::Updated);
        assert!(!upsert.pset_created);
        assert_eq!(model.len(), count);
        assert_eq!(model.entity(pset).unwrap().references(attr::HAS_PROPERTIES), first);
        assert_eq!(
            property_value(&model, pset, "PipeLength"),
            Some(wrap_value(Some(&CellValue::Number(2.0))))
        );
    }

    #[test]
    fn properties_append_in_insertion_order() {
        let mut model = model();
        let entity = EntityId(2);

        upsert_property(&mut model, entity, "PipeLength", Some(&CellValue::Number(1.0)));
        upsert_property(&mut model, entity, "PipeDiameter", None);

        let pset = find_property_set(&model, entity).unwrap();
        let names: Vec<_> = model
            .entity(pset)
            .unwrap()
            .references(attr::HAS_PROPERTIES)
            .into_iter()
            .filter_map(|id| model.entity(id).and_then(|p| p.name()).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["PipeLength", "PipeDiameter"]);
        assert_eq!(property_value(&model, pset, "PipeDiameter"), Some(StepValue::Null));
    }

    #[test]
    fn length_unit_is_created_once_and_registered() {
        let mut model = model();

        let unit = resolve_length_unit(&mut model);
        let again = resolve_length_unit(&mut model);

        assert_eq!(unit, again);
        assert_eq!(
            model.entity(EntityId(3)).unwrap().attribute(attr::UNITS),
            Some(&StepValue::List(vec![
                StepValue::Reference(4),
                StepValue::Reference(unit.0)
            ]))
        );
    }

    #[test]
    fn wraps_text_as_label() {
        assert_eq!(
            wrap_value(Some(&CellValue::Text("DN100".to_string()))).to_step(),
            "IFCLABEL('DN100')"
        );
    }
}
