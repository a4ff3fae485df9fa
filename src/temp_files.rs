//! Temporary file management utilities.
//!
//! Helpers for the filesystem-scoped artifacts an orchestration run owns
//! (the precomputed audio track and the in-progress output container).
//! Cleanup rides the tempfile crate's Drop handling, so artifacts vanish
//! on every exit path, success or failure.

use crate::error::CoreResult;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, NamedTempFile, TempDir};

/// Creates a run-scoped temporary directory under `base`. Auto-cleaned
/// when dropped.
pub fn create_temp_dir(base: &Path, prefix: &str) -> CoreResult<TempDir> {
    std::fs::create_dir_all(base)?;
    Ok(TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .tempdir_in(base)?)
}

/// Creates a temporary file with prefix and extension inside `dir`.
/// Auto-deleted when dropped unless persisted.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    Ok(TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?)
}
