pub mod rest;

use crate::config::Config;
use crate::storage::RootDirectory;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn root(&self) -> &RootDirectory {
        &self.config.root
    }
}
