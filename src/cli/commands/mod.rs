//! Command implementations.

pub mod check;
pub mod run;
pub mod score;

use std::path::Path;

use anyhow::Result;

use crate::domain::models::Config;
use crate::infrastructure::ConfigLoader;

/// Load configuration from the override path or the standard hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
