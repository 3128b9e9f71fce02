use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::Result;
use crate::har::{Entry, Har};

/// Collects entries from every `*.har` file below a directory.
#[derive(Debug, Clone)]
pub struct HarReader {
    directory: PathBuf,
}

impl HarReader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Paths of all HAR files, sorted so output does not depend on
    /// directory iteration order.
    pub fn har_files(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.directory) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && has_har_extension(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Entries of every readable HAR file. Files that are not valid HAR
    /// JSON are skipped with a warning.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for path in self.har_files()? {
            let text = fs::read_to_string(&path)?;
            match serde_json::from_str::<Har>(&text) {
                Ok(har) => entries.extend(har.log.entries),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable HAR file"),
            }
        }
        Ok(entries)
    }
}

fn has_har_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "har")
}
