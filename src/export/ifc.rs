use crate::error::WriteError;
use crate::model::IfcModel;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Serializes the model to `path`.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failure at any point leaves no partial output behind.
pub fn write_model<P: AsRef<Path>>(model: &IfcModel, path: P) -> Result<(), WriteError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(WriteError::NoParent {
                path: path.to_path_buf(),
            })
        }
    };
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = model.to_step();
    let bytes = model.encoding.encode(&content);
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(&bytes).map_err(io_error)?;
    file.persist(path).map_err(|source| WriteError::Persist {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote IFC model");
    Ok(())
}
