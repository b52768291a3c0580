//! CSV and file I/O.
//!
//! Outputs are written to a sibling temporary file and renamed into place,
//! so a failed run never leaves a partial file at the destination.

use crate::error::{ResultExt, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load a UTF-8, comma-delimited CSV file with a header row.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read CSV '{}'", path.display()))?;

    debug!("Loaded {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a DataFrame as CSV with a header row.
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    stage_csv(df, path)?.commit()
}

/// Write raw bytes to `path` atomically, creating parent directories.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    stage_bytes(path, contents)?.commit()
}

/// Write a DataFrame as CSV to the temporary sibling of `path`.
///
/// Nothing is visible at `path` until [`StagedWrite::commit`].
pub fn stage_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<StagedWrite> {
    let path = path.as_ref();
    let staged = StagedWrite::new(path)?;

    let mut file = File::create(&staged.tmp)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .context(format!("Failed to write CSV '{}'", path.display()))?;

    debug!("Staged {} rows for {}", df.height(), path.display());
    Ok(staged)
}

/// Write raw bytes to the temporary sibling of `path`.
pub fn stage_bytes(path: impl AsRef<Path>, contents: &[u8]) -> Result<StagedWrite> {
    let staged = StagedWrite::new(path.as_ref())?;

    let mut file = File::create(&staged.tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;

    Ok(staged)
}

/// A file written next to its destination and not yet renamed into place.
///
/// Dropping an uncommitted write removes the temporary file, so several
/// outputs can be staged and then committed together.
#[must_use = "a staged write is discarded unless committed"]
#[derive(Debug)]
pub struct StagedWrite {
    tmp: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl StagedWrite {
    fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            tmp: path.with_file_name(format!(".{file_name}.tmp")),
            path: path.to_path_buf(),
            committed: false,
        })
    }

    /// Destination the write will land at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temporary file into place.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp, &self.path)?;
        self.committed = true;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}
