//! Log-archive cache (C2, spec §4.2)
//!
//! Scoped to the lifetime of one `collect_data` call (one [`PendingRunSetResult::materialize`]
//! invocation): opens the sibling `<stem>.logfiles.zip` archive lazily, on first use, and reuses
//! the handle for the remainder of the call. Not shared across run sets or worker threads.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use zip::ZipArchive;

use crate::aggregator::reader::logfiles_zip_path;
use crate::error::Error;

pub struct LogArchiveCache {
    result_path: PathBuf,
    zip: Option<ZipArchive<File>>,
    zip_opened: bool,
}

impl LogArchiveCache {
    pub fn new(result_path: PathBuf) -> Self {
        Self {
            result_path,
            zip: None,
            zip_opened: false,
        }
    }

    fn zip_archive(&mut self) -> Result<Option<&mut ZipArchive<File>>> {
        if !self.zip_opened {
            self.zip_opened = true;
            let zip_path = logfiles_zip_path(&self.result_path);
            if zip_path.is_file() {
                let file = File::open(&zip_path)
                    .with_context(|| format!("opening '{}'", zip_path.display()))?;
                let archive = ZipArchive::new(file).map_err(|error| {
                    Error::LogArchiveError(zip_path.clone(), error.to_string())
                })?;
                self.zip = Some(archive);
            }
        }
        Ok(self.zip.as_mut())
    }

    /// Reads a run's log as a list of UTF-8 lines. First tries the log path as a standalone
    /// file; on failure falls back to the archive path relative to the zip root. Returns `None`
    /// (with the caller responsible for logging a warning) if neither is found.
    pub fn read_log_lines(
        &mut self,
        standalone_path: &Path,
        archive_relative_path: &str,
    ) -> Result<Option<Vec<String>>> {
        if let Ok(file) = File::open(standalone_path) {
            return Ok(Some(read_lines(file)?));
        }

        if let Some(archive) = self.zip_archive()? {
            if let Ok(mut entry) = archive.by_name(archive_relative_path) {
                let mut contents = String::new();
                entry.read_to_string(&mut contents)?;
                return Ok(Some(contents.lines().map(str::to_owned).collect()));
            }
        }

        Ok(None)
    }
}

fn read_lines(file: File) -> Result<Vec<String>> {
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(lines)
}

/// A process-local cache of already-opened [`LogArchiveCache`]s, keyed by result-file path, so
/// that concurrent run-set loads (C10) never share a single cache instance across threads; each
/// run-set load owns exactly one.
pub type CacheRegistry = HashMap<PathBuf, LogArchiveCache>;
