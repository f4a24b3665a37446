//! Entry points used by the request layer: each takes paths, runs the whole
//! load → sync → fix → write sequence, and either writes the output file or
//! returns an error with nothing written.

use crate::config::{Policy, SyncOptions};
use crate::error::{HeaderError, PipelineError};
use crate::export::write_model;
use crate::header_fix::fix_header;
use crate::model::IfcModel;
use crate::parser::load_model;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::sheet::{read_records, PipeRecord};
use crate::sync::{find_pipe_assemblies, index_components, sync, SyncReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Updates `Pset_PipeProperties` of the components in `model_path` from the
/// rows of `sheet_path` and writes the result to `output_path`.
///
/// # Errors
///
/// Load, read, and write failures always abort. An empty sheet aborts with
/// [`PipelineError::EmptySheet`]. Under [`Policy::Strict`] a skipped row or
/// a header-fix problem aborts too.
///
/// # Example
///
/// ```no_run
/// use ifc_pset_sync::config::SyncOptions;
/// use ifc_pset_sync::pipeline::convert_excel_to_ifc;
///
/// let report = convert_excel_to_ifc(
///     "model.ifc",
///     "attributes.xlsx",
///     "model_updated.ifc",
///     &SyncOptions::default(),
/// )?;
/// println!("{} of {} rows matched", report.matched, report.records);
/// # Ok::<(), ifc_pset_sync::error::PipelineError>(())
/// ```
pub fn convert_excel_to_ifc<M, S, O>(
    model_path: M,
    sheet_path: S,
    output_path: O,
    options: &SyncOptions,
) -> Result<SyncReport, PipelineError>
where
    M: AsRef<Path>,
    S: AsRef<Path>,
    O: AsRef<Path>,
{
    let model = load_model(&model_path)?;
    let records = load_records(sheet_path.as_ref(), options)?;
    apply(model, &records, output_path.as_ref(), options)
}

fn load_records(sheet_path: &Path, options: &SyncOptions) -> Result<Vec<PipeRecord>, PipelineError> {
    let records = read_records(sheet_path, options)?;
    if records.is_empty() {
        return Err(PipelineError::EmptySheet {
            path: sheet_path.to_path_buf(),
        });
    }
    Ok(records)
}

fn apply(
    mut model: IfcModel,
    records: &[PipeRecord],
    output_path: &Path,
    options: &SyncOptions,
) -> Result<SyncReport, PipelineError> {
    let pipes = find_pipe_assemblies(&model);
    let index = index_components(&model, &pipes);
    info!(
        pipes = pipes.len(),
        components = index.len(),
        rows = records.len(),
        "Located pipe components"
    );

    let report = sync(&mut model, &index, records, options.policy)?;
    apply_header_fix(&mut model, options.policy)?;
    write_model(&model, output_path)?;

    info!(output = %output_path.display(), "Wrote updated model");
    Ok(report)
}

fn apply_header_fix(model: &mut IfcModel, policy: Policy) -> Result<(), HeaderError> {
    let result = fix_header(&mut model.header).and_then(|fix| match fix.substituted {
        0 => Ok(()),
        count if policy == Policy::Strict => Err(HeaderError::Unmappable { count }),
        count => {
            warn!(count, "Header characters replaced during CP1251 normalization");
            Ok(())
        }
    });

    match result {
        Err(e) if policy == Policy::BestEffort => {
            warn!(error = %e, "Header encoding fix skipped");
            Ok(())
        }
        other => other,
    }
}

/// Outcome of one model in a batch.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_none()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// `dir/name.ext` for input `name.ext`, as `dir/name_updated.ext`.
#[must_use]
pub fn updated_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}_updated.{}", ext.to_string_lossy()),
        None => format!("{stem}_updated"),
    };
    output_dir.join(file_name)
}

/// Runs [`convert_excel_to_ifc`] for several models against one sheet,
/// writing `<name>_updated.<ext>` files into `output_dir`.
///
/// A failing model is recorded in the report and does not stop the batch.
///
/// # Errors
///
/// Fails up front if `output_dir` is not a directory or the sheet cannot be
/// read.
pub fn convert_batch<S, O>(
    model_paths: &[PathBuf],
    sheet_path: S,
    output_dir: O,
    options: &SyncOptions,
) -> Result<BatchReport, PipelineError>
where
    S: AsRef<Path>,
    O: AsRef<Path>,
{
    let output_dir = output_dir.as_ref();
    if !output_dir.is_dir() {
        return Err(PipelineError::NotADirectory {
            path: output_dir.to_path_buf(),
        });
    }
    let records = load_records(sheet_path.as_ref(), options)?;

    let mut batch = BatchReport::default();
    for input in model_paths {
        let output = updated_output_path(input, output_dir);
        let result = load_model(input)
            .map_err(PipelineError::from)
            .and_then(|model| apply(model, &records, &output, options));

        let (report, error) = match result {
            Ok(report) => (Some(report), None),
            Err(e) => {
                warn!(input = %input.display(), error = %e, "Model update failed");
                (None, Some(e.to_string()))
            }
        };
        batch.items.push(BatchItem {
            input: input.clone(),
            output,
            report,
            error,
        });
    }

    info!(
        succeeded = batch.succeeded(),
        failed = batch.failed(),
        "Batch finished"
    );
    Ok(batch)
}

/// Reconciles `new_path` against the earlier export `old_path` and writes
/// the result to `output_path`.
pub fn reconcile_files<A, B, O>(
    old_path: A,
    new_path: B,
    output_path: O,
) -> Result<ReconcileReport, PipelineError>
where
    A: AsRef<Path>,
    B: AsRef<Path>,
    O: AsRef<Path>,
{
    let old = load_model(old_path)?;
    let mut new = load_model(new_path)?;

    let report = reconcile(&old, &mut new);
    write_model(&new, output_path.as_ref())?;

    info!(
        output = %output_path.as_ref().display(),
        psets_renamed = report.psets_renamed,
        insulation_marked = report.insulation_marked,
        "Wrote reconciled model"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_names_get_updated_suffix() {
        assert_eq!(
            updated_output_path(Path::new("/in/plant.ifc"), Path::new("/out")),
            PathBuf::from("/out/plant_updated.ifc")
        );
        assert_eq!(
            updated_output_path(Path::new("plant"), Path::new("/out")),
            PathBuf::from("/out/plant_updated")
        );
    }
}
