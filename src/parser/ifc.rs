use crate::error::LoadError;
use crate::model::IfcModel;
use crate::parser::encoding::SourceEncoding;
use crate::parser::step::StepFile;
use std::path::Path;
use tracing::debug;

/// Loads an IFC file into a mutable entity graph.
///
/// The file is read whole and closed before parsing, so no handle outlives
/// this call on any path.
///
/// # Errors
///
/// Returns [`LoadError::FileRead`] if the file cannot be read.
/// Returns [`LoadError::Parse`] if the STEP content is malformed.
///
/// # Example
///
/// ```no_run
/// use ifc_pset_sync::parser::load_model;
///
/// let model = load_model("model.ifc")?;
/// println!("{} entities, schema {}", model.len(), model.schema);
/// # Ok::<(), ifc_pset_sync::error::LoadError>(())
/// ```
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<IfcModel, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoadError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let (content, encoding) = SourceEncoding::decode(&bytes);

    let step_file = StepFile::parse(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut model = IfcModel::from_step(step_file);
    model.encoding = encoding;
    debug!(
        path = %path.display(),
        entities = model.len(),
        schema = %model.schema,
        ?encoding,
        "Loaded IFC model"
    );

    Ok(model)
}
