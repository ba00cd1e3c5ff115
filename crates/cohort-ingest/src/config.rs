//! Config file loading.

use std::fs;
use std::path::Path;

use tracing::info;

use cohort_model::CohortConfig;

use crate::error::{IngestError, Result};

/// Loads a TOML config file. Missing sections and fields take their defaults.
pub fn load_config(path: &Path) -> Result<CohortConfig> {
    let content = fs::read_to_string(path).map_err(|e| IngestError::open(path, e))?;
    let config: CohortConfig = toml::from_str(&content).map_err(|e| IngestError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.options.validate().map_err(|e| IngestError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}
