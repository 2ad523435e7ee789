//! Flat-directory snapshot cache.
//!
//! Every feed snapshot is one file named `<source>_<YYYYMMDD>.<ext>`.
//! Reads concatenate all snapshots of a source in lexicographic
//! filename order; writes are date-stamped and same-day writes
//! overwrite by identical name.

use crate::types::{Result, Source};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Opens the storage directory, creating it if absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All snapshot files for one source, sorted lexicographically.
    pub fn snapshot_files(&self, source: &Source) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}_", source);
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Concatenated ordered contents of every snapshot of a source.
    pub fn read_source(&self, source: &Source) -> Result<Vec<u8>> {
        let mut combined = Vec::new();
        for path in self.snapshot_files(source)? {
            combined.extend(fs::read(&path)?);
        }
        Ok(combined)
    }

    /// Deduplicated set of sources with at least one snapshot, taken
    /// from the filename prefix before the first `_`.
    pub fn list_sources(&self) -> Result<Vec<String>> {
        let mut sources = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some((prefix, _)) = name.split_once('_') {
                if !prefix.is_empty() {
                    sources.insert(prefix.to_string());
                }
            }
        }
        Ok(sources.into_iter().collect())
    }

    /// Writes a new snapshot stamped with today's UTC date. Writing
    /// the same source twice on one day overwrites the earlier file.
    pub fn write_snapshot(&self, source: &Source, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d");
        let path = self
            .root
            .join(format!("{}_{}.{}", source, stamp, extension));
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote snapshot");
        Ok(path)
    }
}
