//! Filesystem side of the upload, download and delete operations

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use super::StorageError;

/// Upload bytes held in memory before spilling to a temporary file
pub const SPOOL_MEMORY_LIMIT: usize = 1024 * 1024;

/// Staging area for an upload body.
///
/// Content stays in memory up to [`SPOOL_MEMORY_LIMIT`] and moves to an
/// anonymous temporary file past that, so nothing under the served root is
/// touched until the whole request has been read.
pub struct UploadSpool {
    memory: Vec<u8>,
    spill: Option<File>,
    len: u64,
}

impl UploadSpool {
    pub fn new() -> Self {
        Self {
            memory: Vec::new(),
            spill: None,
            len: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_spilled(&self) -> bool {
        self.spill.is_some()
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.len += chunk.len() as u64;

        if let Some(spill) = self.spill.as_mut() {
            spill.write_all(chunk).await?;
            return Ok(());
        }

        if self.memory.len() + chunk.len() <= SPOOL_MEMORY_LIMIT {
            self.memory.extend_from_slice(chunk);
            return Ok(());
        }

        let std_file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))??;
        let mut spill = File::from_std(std_file);
        spill.write_all(&self.memory).await?;
        spill.write_all(chunk).await?;
        self.memory = Vec::new();
        self.spill = Some(spill);
        tracing::debug!("upload spooled to temporary file after {} bytes", self.len);
        Ok(())
    }

    /// Copy the staged content into a newly created file at `path`.
    ///
    /// The file is created exclusively: an existing entry yields
    /// [`StorageError::AlreadyExists`] and is left untouched. A failure after
    /// creation leaves the partial file in place.
    pub async fn persist_new(self, path: &Path) -> Result<u64, StorageError> {
        let mut dst = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists,
                _ => StorageError::Io(e),
            })?;

        let written = match self.spill {
            Some(mut spill) => {
                spill.flush().await?;
                spill.seek(SeekFrom::Start(0)).await?;
                tokio::io::copy(&mut spill, &mut dst).await?
            }
            None => {
                dst.write_all(&self.memory).await?;
                self.memory.len() as u64
            }
        };
        dst.flush().await?;

        Ok(written)
    }
}

impl Default for UploadSpool {
    fn default() -> Self {
        Self::new()
    }
}

/// Open an existing regular file for reading, returning it with its length.
pub async fn open_existing(path: &Path) -> Result<(File, u64), StorageError> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        return Err(StorageError::NotFound);
    }

    let file = File::open(path).await.map_err(not_found_or_io)?;
    Ok((file, metadata.len()))
}

/// Remove a regular file. Directories are never removed.
pub async fn remove(path: &Path) -> Result<(), StorageError> {
    let metadata = fs::symlink_metadata(path).await.map_err(not_found_or_io)?;
    if metadata.is_dir() {
        return Err(StorageError::NotFound);
    }
    fs::remove_file(path).await.map_err(not_found_or_io)
}

fn not_found_or_io(e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_spool_in_memory() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("small.txt");

        let mut spool = UploadSpool::new();
        spool.write(b"hello ").await.unwrap();
        spool.write(b"world").await.unwrap();
        assert!(!spool.is_spilled());
        assert_eq!(spool.len(), 11);

        assert_eq!(spool.persist_new(&target).await.unwrap(), 11);
        assert_eq!(std::fs::read(&target).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_spool_spills_past_memory_limit() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("large.bin");
        let chunk: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

        let mut spool = UploadSpool::new();
        for _ in 0..20 {
            spool.write(&chunk).await.unwrap();
        }
        assert!(spool.is_spilled());

        let written = spool.persist_new(&target).await.unwrap();
        assert_eq!(written, 20 * chunk.len() as u64);

        let on_disk = std::fs::read(&target).unwrap();
        assert_eq!(on_disk.len(), 20 * chunk.len());
        assert!(on_disk.chunks(chunk.len()).all(|c| c == chunk.as_slice()));
    }

    #[tokio::test]
    async fn test_persist_refuses_existing() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("taken.txt");
        std::fs::write(&target, b"original").unwrap();

        let mut spool = UploadSpool::new();
        spool.write(b"replacement").await.unwrap();

        assert!(matches!(
            spool.persist_new(&target).await,
            Err(StorageError::AlreadyExists)
        ));
        assert_eq!(std::fs::read(&target).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_open_existing() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("data.bin");
        std::fs::write(&target, b"abc").unwrap();

        let (mut file, len) = open_existing(&target).await.unwrap();
        assert_eq!(len, 3);
        let mut content = Vec::new();
        file.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"abc");

        assert!(matches!(
            open_existing(&temp.path().join("missing")).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            open_existing(temp.path()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("doomed.txt");
        std::fs::write(&target, b"bye").unwrap();
        std::fs::create_dir(temp.path().join("dir")).unwrap();

        remove(&target).await.unwrap();
        assert!(!target.exists());

        assert!(matches!(remove(&target).await, Err(StorageError::NotFound)));
        assert!(matches!(
            remove(&temp.path().join("dir")).await,
            Err(StorageError::NotFound)
        ));
        assert!(temp.path().join("dir").is_dir());
    }
}
