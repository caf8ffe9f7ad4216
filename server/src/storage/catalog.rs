//! Directory listing for the served root

use super::{RootDirectory, StorageError};

/// One listed file, ready for display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub size_display: String,
}

/// Enumerates the regular files directly inside the root.
pub struct FileCatalog<'a> {
    root: &'a RootDirectory,
}

impl<'a> FileCatalog<'a> {
    pub fn new(root: &'a RootDirectory) -> Self {
        Self { root }
    }

    /// List files in directory enumeration order.
    ///
    /// Subdirectories are skipped, as are names that are not valid UTF-8
    /// and entries that vanish or cannot be inspected while the listing runs.
    /// Only a failure to read the root itself is an error.
    pub async fn list(&self) -> Result<Vec<FileRecord>, StorageError> {
        let mut entries = tokio::fs::read_dir(self.root.path()).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!("skipping {:?}: {}", entry.file_name(), e);
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }
            // A lossy name could not be downloaded or deleted again.
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::debug!("skipping non UTF-8 name {:?}", raw);
                    continue;
                }
            };

            records.push(FileRecord {
                name,
                size_display: format_size(metadata.len()),
            });
        }

        Ok(records)
    }
}

/// Human-readable byte count using base-1024 units, e.g. "3.4 MB".
pub fn format_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, SUFFIXES[exp])
}
