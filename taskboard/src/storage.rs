//! Local files used by the CLI: the task and project documents (JSON) and
//! the saved board layout (postcard).
//!
//! A missing file reads as empty. Writes create the parent directory.
//! Each grouping key keeps its own layout file, derived from the
//! configured layout path by [`layout_path`].

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use taskboard_proto::layout::{self, BoardLayout, CodecError};
use taskboard_proto::project::Project;
use taskboard_proto::task::Task;

/// Errors that can occur reading or writing local files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A document file is not valid JSON for the expected list.
    #[error("malformed document file {path}: {source}")]
    Json {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The layout file could not be encoded or decoded.
    #[error("layout file {path}: {source}")]
    Layout {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying codec error.
        source: CodecError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path)(e)),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    }
    std::fs::write(path, bytes).map_err(io_error(path))
}

fn load_documents<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn save_documents<T: Serialize>(path: &Path, documents: &[T]) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(documents).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &json)
}

/// Reads the task list; a missing file is an empty list.
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be read or parsed.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, StorageError> {
    load_documents(path)
}

/// Writes the task list as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be written.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), StorageError> {
    save_documents(path, tasks)
}

/// Reads the project list; a missing file is an empty list.
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be read or parsed.
pub fn load_projects(path: &Path) -> Result<Vec<Project>, StorageError> {
    load_documents(path)
}

/// Writes the project list as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be written.
pub fn save_projects(path: &Path, projects: &[Project]) -> Result<(), StorageError> {
    save_documents(path, projects)
}

/// Path of the layout file for `grouping`.
///
/// `layout.bin` becomes `layout.priority.bin` for the priority grouping.
#[must_use]
pub fn layout_path(base: &Path, grouping: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map_or_else(|| "layout".into(), |s| s.to_string_lossy());
    let name = match base.extension() {
        Some(ext) => format!("{stem}.{grouping}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{grouping}"),
    };
    base.with_file_name(name)
}

/// Reads the saved layout, if any.
///
/// # Errors
///
/// Returns [`StorageError`] if the file exists but cannot be read or decoded.
pub fn load_layout(path: &Path) -> Result<Option<BoardLayout>, StorageError> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };
    layout::decode(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Layout {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes the layout.
///
/// # Errors
///
/// Returns [`StorageError`] if the layout cannot be encoded or written.
pub fn save_layout(path: &Path, board_layout: &BoardLayout) -> Result<(), StorageError> {
    let bytes = layout::encode(board_layout).map_err(|source| StorageError::Layout {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &bytes)
}
