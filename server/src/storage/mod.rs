pub mod catalog;
pub mod files;
pub mod resolver;

pub use catalog::{FileCatalog, FileRecord};
pub use files::UploadSpool;
pub use resolver::{base_name, RootDirectory};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid file name")]
    InvalidName,
    #[error("File already exists")]
    AlreadyExists,
    #[error("File not found")]
    NotFound,
}
