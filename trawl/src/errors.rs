//! Error types shared by every stage of a scan.
//!
//! Filesystem failures fall into three groups. Per-entry failures (a file
//! vanished, a permission bit, a dangling or looping link) are dropped by the
//! caller and never reach [`SearchError`]. Descriptor exhaustion is retried
//! once through [`retry_on_fd_exhaustion`]. Everything else propagates.
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during discovery and search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid pattern kind: {0} (expected 'f' or 'r')")]
    InvalidPatternKind(String),
    #[error("Cache error: {0}")]
    CacheError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Too many open files while accessing {0}")]
    TooManyOpenFiles(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SearchError {
    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn invalid_pattern_kind(kind: impl Into<String>) -> Self {
        Self::InvalidPatternKind(kind.into())
    }

    pub fn cache_error(msg: impl Into<String>) -> Self {
        Self::CacheError(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn too_many_open_files(path: impl Into<PathBuf>) -> Self {
        Self::TooManyOpenFiles(path.into())
    }
}

/// Returns true for errors that only affect a single entry and should be skipped:
/// missing files, permission problems, a path component that is not a directory,
/// symlink loops and over-long names.
pub fn is_entry_error(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    ) {
        return true;
    }

    #[cfg(unix)]
    {
        matches!(
            err.raw_os_error(),
            Some(libc::ENOTDIR) | Some(libc::ELOOP) | Some(libc::ENAMETOOLONG)
        )
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Returns true when the process (or system) ran out of file descriptors.
pub fn is_fd_exhaustion(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        matches!(err.raw_os_error(), Some(libc::EMFILE) | Some(libc::ENFILE))
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

/// Runs `op`, retrying exactly once if it fails because descriptors ran out.
///
/// Handles opened by a scan are dropped as soon as each file is done with, so by
/// the time the error surfaces the only thing left to release is whatever the
/// failed attempt itself held. A second exhaustion is fatal.
pub fn retry_on_fd_exhaustion<T>(
    path: &Path,
    mut op: impl FnMut() -> io::Result<T>,
) -> SearchResult<io::Result<T>> {
    match op() {
        Err(e) if is_fd_exhaustion(&e) => {
            warn!(
                "Ran out of file descriptors at {}, retrying once",
                path.display()
            );
            match op() {
                Err(e) if is_fd_exhaustion(&e) => Err(SearchError::too_many_open_files(path)),
                other => Ok(other),
            }
        }
        other => Ok(other),
    }
}
