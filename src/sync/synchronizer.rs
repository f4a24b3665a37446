use super::locator::ComponentIndex;
use super::properties::{upsert_property, PropertyChange};
use crate::config::{Policy, DIAMETER_PROPERTY, LENGTH_PROPERTY, LENGTH_SCALE};
use crate::error::SyncError;
use crate::model::{Entity, EntityId, IfcModel};
use crate::sheet::{CellValue, PipeRecord};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    UnmatchedName,
    IdentifierMismatch {
        expected: Option<String>,
        actual: String,
    },
    DanglingEntity {
        global_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub row: u32,
    pub name: Option<String>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub records: usize,
    pub matched: usize,
    pub psets_created: usize,
    pub properties_created: usize,
    pub properties_updated: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Length in millimetres. Text that reads as a number is scaled too; any
/// other text passes through.
fn convert_length(length: Option<&CellValue>) -> Option<CellValue> {
    length.map(|value| match value {
        CellValue::Number(n) => CellValue::Number(n * LENGTH_SCALE),
        CellValue::Text(text) => match text.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n * LENGTH_SCALE),
            Err(_) => value.clone(),
        },
    })
}

/// Writes `PipeLength` and `PipeDiameter` onto every component whose name
/// and GlobalId both match a sheet row.
///
/// Rows that do not match are skipped and listed in the report; under
/// [`Policy::Strict`] the first such row aborts with an error instead.
/// Diameter is written as read, without unit conversion.
pub fn sync(
    model: &mut IfcModel,
    index: &ComponentIndex,
    records: &[PipeRecord],
    policy: Policy,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport {
        records: records.len(),
        ..SyncReport::default()
    };

    for record in records {
        let reason = match resolve(model, index, record) {
            Ok(entity) => {
                report.matched += 1;
                let length = convert_length(record.length.as_ref());
                let diameter = record.diameter.clone();

                for (name, value) in [
                    (LENGTH_PROPERTY, length.as_ref()),
                    (DIAMETER_PROPERTY, diameter.as_ref()),
                ] {
                    let upsert = upsert_property(model, entity, name, value);
                    report.psets_created += usize::from(upsert.pset_created);
                    match upsert.change {
                        PropertyChange::Created => report.properties_created += 1,
                        PropertyChange::Updated => report.properties_updated += 1,
                        PropertyChange::Untouched => {}
                    }
                }
                continue;
            }
            Err(reason) => reason,
        };

        debug!(row = record.row, name = ?record.name, ?reason, "Skipped record");
        if policy == Policy::Strict {
            return Err(strict_error(record, reason));
        }
        report.skipped.push(SkippedRecord {
            row: record.row,
            name: record.name.clone(),
            reason,
        });
    }

    info!(
        records = report.records,
        matched = report.matched,
        created = report.properties_created,
        updated = report.properties_updated,
        skipped = report.skipped.len(),
        "Synchronized pipe properties"
    );
    Ok(report)
}

fn resolve(
    model: &IfcModel,
    index: &ComponentIndex,
    record: &PipeRecord,
) -> Result<EntityId, SkipReason> {
    let global_id = record
        .name
        .as_ref()
        .and_then(|name| index.get(name))
        .ok_or(SkipReason::UnmatchedName)?;

    if record.identifier.as_deref() != Some(global_id.as_str()) {
        return Err(SkipReason::IdentifierMismatch {
            expected: record.identifier.clone(),
            actual: global_id.clone(),
        });
    }

    model
        .by_global_id(global_id)
        .map(Entity::id)
        .ok_or_else(|| SkipReason::DanglingEntity {
            global_id: global_id.clone(),
        })
}

fn strict_error(record: &PipeRecord, reason: SkipReason) -> SyncError {
    let row = record.row;
    let name = record.name.clone().unwrap_or_default();
    match reason {
        SkipReason::UnmatchedName => SyncError::UnmatchedName { row, name },
        SkipReason::IdentifierMismatch { expected, actual } => SyncError::IdentifierMismatch {
            row,
            name,
            expected: expected.unwrap_or_default(),
            actual,
        },
        SkipReason::DanglingEntity { global_id } => SyncError::DanglingEntity {
            row,
            name,
            global_id,
        },
    }
}
