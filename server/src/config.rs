use std::path::Path;
use std::time::Duration;

use crate::storage::RootDirectory;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub root: RootDirectory,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Build from the command-line directory and port, with tuning knobs
    /// taken from the environment.
    pub fn from_args(directory: &Path, port: u16) -> anyhow::Result<Self> {
        let root = RootDirectory::create(directory)
            .map_err(|e| anyhow::anyhow!("cannot use directory {}: {}", directory.display(), e))?;

        Ok(Config {
            root,
            port,
            max_upload_bytes: env_or("DROPBIN_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            read_timeout: Duration::from_secs(env_or("DROPBIN_READ_TIMEOUT_SECS", 30)?),
            write_timeout: Duration::from_secs(env_or("DROPBIN_WRITE_TIMEOUT_SECS", 60)?),
            idle_timeout: Duration::from_secs(env_or("DROPBIN_IDLE_TIMEOUT_SECS", 120)?),
            shutdown_grace: Duration::from_secs(env_or("DROPBIN_SHUTDOWN_GRACE_SECS", 10)?),
        })
    }

    /// Defaults for a given root, without consulting the environment.
    #[cfg(test)]
    pub fn for_root(root: RootDirectory) -> Self {
        Config {
            root,
            port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, value, e)),
        Err(_) => Ok(default),
    }
}
