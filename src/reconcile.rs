//! Carries identity over from a previous export of the same plant model and
//! tidies names the downstream viewer groups by.

use crate::model::entity::attr;
use crate::model::{EntityId, EntityKind, IfcModel};
use crate::parser::StepValue;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Rooted types that are matched even without a name (first one only).
const UNNAMED_MATCH_TYPES: [&str; 3] = ["IFCPROJECT", "IFCSITE", "IFCBUILDING"];

pub const AVEVA_PSET: &str = "AVEVA_Pset";

const INSULATION_PREFIX: &str = "Insulation of ";

// Styled items nest a few levels at most; this bounds malformed cycles.
const MAX_STYLE_DEPTH: usize = 8;

type MatchKey = (String, Option<String>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuidTransfer {
    /// Rooted entities of the new model eligible for matching.
    pub candidates: usize,
    pub updated: usize,
    /// Matches skipped because the GlobalId was already taken.
    pub conflicts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub guids: GuidTransfer,
    pub psets_renamed: usize,
    pub insulation_marked: usize,
}

fn match_keys(model: &IfcModel) -> Vec<(EntityId, MatchKey)> {
    let mut seen_unnamed = HashSet::new();

    model
        .entities()
        .filter(|e| e.is_rooted())
        .filter_map(|e| {
            let type_name = e.type_name();
            let name = e.name().map(str::to_string);
            if name.is_none() {
                if !UNNAMED_MATCH_TYPES.contains(&type_name) {
                    return None;
                }
                if !seen_unnamed.insert(type_name.to_string()) {
                    return None;
                }
            }
            Some((e.id(), (type_name.to_string(), name)))
        })
        .collect()
}

/// Gives entities of `new` the GlobalId of the entity with the same type and
/// name in `old`. The first old entity per key wins, and no GlobalId is
/// handed to two entities.
pub fn transfer_global_ids(old: &IfcModel, new: &mut IfcModel) -> GuidTransfer {
    let mut old_ids: HashMap<MatchKey, String> = HashMap::new();
    for (id, key) in match_keys(old) {
        if let Some(global_id) = old.entity(id).and_then(|e| e.global_id()) {
            old_ids.entry(key).or_insert_with(|| global_id.to_string());
        }
    }

    let candidates = match_keys(new);
    let mut transfer = GuidTransfer {
        candidates: candidates.len(),
        ..GuidTransfer::default()
    };
    let mut assigned: HashSet<&str> = HashSet::new();
    let mut updates = Vec::new();

    for (id, key) in &candidates {
        let Some(global_id) = old_ids.get(key) else {
            continue;
        };
        let holder = new.by_global_id(global_id).map(|e| e.id());
        if assigned.contains(global_id.as_str()) || holder.is_some_and(|h| h != *id) {
            debug!(entity = %id, global_id = %global_id, "GlobalId already in use, not transferred");
            transfer.conflicts += 1;
            continue;
        }
        assigned.insert(global_id);
        updates.push((*id, global_id.clone()));
    }

    for (id, global_id) in updates {
        new.set_global_id(id, &global_id);
        transfer.updated += 1;
    }

    info!(
        updated = transfer.updated,
        candidates = transfer.candidates,
        conflicts = transfer.conflicts,
        "Transferred GlobalIds"
    );
    transfer
}

/// Renames every property set whose name contains `token` to exactly `token`.
pub fn normalize_pset_names(model: &mut IfcModel, token: &str) -> usize {
    let ids: Vec<EntityId> = model
        .entities_of_kind(EntityKind::PropertySet)
        .filter(|e| e.name().is_some_and(|n| n.contains(token) && n != token))
        .map(|e| e.id())
        .collect();

    for &id in &ids {
        if let Some(pset) = model.entity_mut(id) {
            pset.set_attribute(attr::NAME, StepValue::String(token.to_string()));
        }
    }
    ids.len()
}

/// Representation item → surface transparency, from `IfcStyledItem`s.
fn item_transparency(model: &IfcModel) -> HashMap<EntityId, f64> {
    let mut map = HashMap::new();
    for styled in model.entities_of_type("IFCSTYLEDITEM") {
        let Some(item) = styled.reference(0) else {
            continue;
        };
        let transparency = styled
            .references(1)
            .into_iter()
            .find_map(|style| style_transparency(model, style, 0));
        if let Some(t) = transparency {
            map.entry(item).or_insert(t);
        }
    }
    map
}

fn style_transparency(model: &IfcModel, style: EntityId, depth: usize) -> Option<f64> {
    if depth > MAX_STYLE_DEPTH {
        return None;
    }
    let entity = model.entity(style)?;
    match entity.type_name() {
        "IFCSURFACESTYLERENDERING" | "IFCSURFACESTYLESHADING" => {
            entity.attribute(1).and_then(StepValue::as_real)
        }
        "IFCSURFACESTYLE" => entity
            .references(2)
            .into_iter()
            .find_map(|s| style_transparency(model, s, depth + 1)),
        "IFCPRESENTATIONSTYLEASSIGNMENT" => entity
            .references(0)
            .into_iter()
            .find_map(|s| style_transparency(model, s, depth + 1)),
        _ => None,
    }
}

/// Transparency of the first styled item reachable from a shape
/// representation, following mapped items.
fn representation_transparency(
    model: &IfcModel,
    styles: &HashMap<EntityId, f64>,
    representation: EntityId,
    depth: usize,
) -> Option<f64> {
    if depth > MAX_STYLE_DEPTH {
        return None;
    }
    let shape = model.entity(representation)?;
    shape.references(3).into_iter().find_map(|item| {
        if let Some(t) = styles.get(&item) {
            return Some(*t);
        }
        let item_entity = model.entity(item)?;
        if item_entity.type_name() != "IFCMAPPEDITEM" {
            return None;
        }
        let mapped = model
            .entity(item_entity.reference(0)?)?
            .reference(1)?;
        representation_transparency(model, styles, mapped, depth + 1)
    })
}

/// Prefixes duplicated, semi-transparent pipe fittings with `Insulation of`.
pub fn mark_insulation(model: &mut IfcModel) -> usize {
    let styles = item_transparency(model);

    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for fitting in model.entities_of_type("IFCPIPEFITTING") {
        if let Some(name) = fitting.name() {
            *name_counts.entry(name).or_insert(0) += 1;
        }
    }

    let renames: Vec<(EntityId, String)> = model
        .entities_of_type("IFCPIPEFITTING")
        .filter_map(|fitting| {
            let name = fitting.name()?;
            if name_counts.get(name).copied().unwrap_or(0) <= 1
                || name.starts_with(INSULATION_PREFIX)
            {
                return None;
            }
            let product_shape = model.entity(fitting.reference(attr::REPRESENTATION)?)?;
            let transparency = product_shape
                .references(2)
                .into_iter()
                .find_map(|rep| representation_transparency(model, &styles, rep, 0))?;
            (transparency > 0.0 && transparency < 1.0)
                .then(|| (fitting.id(), format!("{INSULATION_PREFIX}{name}")))
        })
        .collect();

    for (id, name) in &renames {
        if let Some(fitting) = model.entity_mut(*id) {
            fitting.set_attribute(attr::NAME, StepValue::String(name.clone()));
        }
    }
    renames.len()
}

/// Runs GlobalId transfer, pset renaming and insulation marking on `new`.
pub fn reconcile(old: &IfcModel, new: &mut IfcModel) -> ReconcileReport {
    ReconcileReport {
        guids: transfer_global_ids(old, new),
        psets_renamed: normalize_pset_names(new, AVEVA_PSET),
        insulation_marked: mark_insulation(new),
    }
}
