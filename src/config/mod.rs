//! JSON configuration documents
//!
//! Two documents drive a pipeline run: the per-job task document
//! (`pipelines/<job>/<job>_config.json`) and the shared action-order
//! document (`pipelines/action_config.json`). The monitoring suites have
//! their own documents under `monitoring/`. All of them are read once per
//! run and never written back.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

pub mod job;
pub mod monitor;

pub use job::{ActionConfig, JobDefinition, TaskConfig};
pub use monitor::{KpiSpec, KpisConfig, LogsConfig, TableCheck, TablesConfig, KPI_REQUIRED_KEYS};

/// Configuration errors are fatal: they abort the run before any task executes
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no job group defined in {}", path.display())]
    EmptyDocument { path: PathBuf },

    #[error("missing keys in {context}: {keys}")]
    MissingKeys { context: String, keys: String },
}

/// Read and deserialize a JSON document
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate that required parameter keys are present, with a readable context
pub fn require_keys(
    params: &serde_json::Map<String, serde_json::Value>,
    keys: &[&str],
    context: &str,
) -> Result<(), ConfigError> {
    let missing: Vec<&str> = keys
        .iter()
        .filter(|k| !params.contains_key(**k))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingKeys {
            context: context.to_string(),
            keys: missing.join(", "),
        })
    }
}

pub(crate) fn default_enabled() -> bool {
    true
}
