//! Filesystem helpers shared by the processor, the data service and the read cache.

use crate::{TransformerError, TransformerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Serialise `value` as pretty JSON and replace `path` atomically.
///
/// The document is written to a uniquely named sibling file first and then renamed over the
/// target, so readers see either the previous or the new document and concurrent writers never
/// share a temporary file.
///
/// # Errors
///
/// Returns `TransformerError` if serialisation, the temporary write or the rename fails.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> TransformerResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(TransformerError::Serialization)?;
    bytes.push(b'\n');

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            TransformerError::InvalidInput(format!("not a file path: {}", path.display()))
        })?;
    let temp_path = path.with_file_name(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    fs::write(&temp_path, &bytes).map_err(|source| TransformerError::FileWrite {
        path: temp_path.clone(),
        source,
    })?;

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(TransformerError::FileWrite {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Read and deserialise a JSON document, returning `None` if the file does not exist.
///
/// # Errors
///
/// Returns `TransformerError::FileRead` on I/O failures other than not-found, and
/// `TransformerError::Deserialization` if the document is not valid for `T`.
pub(crate) fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> TransformerResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TransformerError::FileRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| TransformerError::Deserialization {
            path: path.to_path_buf(),
            source,
        })
}

/// Immediate subdirectories of `root`, sorted by path.
///
/// # Errors
///
/// Returns `TransformerError::DirectoryRead` if `root` cannot be listed.
pub(crate) fn list_subdirectories(root: &Path) -> TransformerResult<Vec<PathBuf>> {
    let read_error = |source: std::io::Error| TransformerError::DirectoryRead {
        path: root.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Regular files in `dir` with the given extension, sorted by path.
pub(crate) fn list_files_with_extension(dir: &Path, extension: &str) -> TransformerResult<Vec<PathBuf>> {
    let read_error = |source: std::io::Error| TransformerError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn ensure_dir(path: &Path) -> TransformerResult<()> {
    fs::create_dir_all(path).map_err(|source| TransformerError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a file, treating an already-missing file as success.
pub(crate) fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
