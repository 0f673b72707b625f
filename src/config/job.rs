//! Per-job task configuration and action ordering

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{default_enabled, load_json, ConfigError};
use crate::run::context::Action;

/// One task's parameters from the job document.
///
/// Arbitrary key/value pairs (table names, thresholds, flags) plus the
/// reserved enable switch. Parameters feed template substitution; reserved
/// substitution keys always override same-named entries at render time.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Disabled tasks are skipped by the dispatcher without halting the batch
    #[serde(rename = "isEnable", alias = "enabled", default = "default_enabled")]
    pub enabled: bool,

    /// Free-form template parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JobGroup {
    tasks: HashMap<String, TaskConfig>,
}

/// A job's task map, loaded once per run.
///
/// The document shape is `{ <group_key>: { "tasks": { <name>: {...} } } }`;
/// only the first group under the top-level mapping is used.
#[derive(Debug)]
pub struct JobDefinition {
    pub job_name: String,
    pub tasks: HashMap<String, TaskConfig>,
}

impl JobDefinition {
    pub fn load(path: &Path, job_name: &str) -> Result<Self, ConfigError> {
        let doc: serde_json::Map<String, serde_json::Value> = load_json(path)?;
        let (_, group) = doc
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::EmptyDocument {
                path: path.to_path_buf(),
            })?;
        let group: JobGroup =
            serde_json::from_value(group).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            job_name: job_name.to_string(),
            tasks: group.tasks,
        })
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.get(name)
    }
}

/// Ordered task-name sequences per action.
///
/// Entries may contain a `{job_name}` placeholder (or the legacy
/// `{etl_name}` spelling); the sequence order is the execution order.
#[derive(Debug, Default, Deserialize)]
pub struct ActionConfig(HashMap<Action, Vec<String>>);

impl ActionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }

    /// The configured sequence for an action; empty when the action is absent
    pub fn sequence(&self, action: Action) -> &[String] {
        self.0.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}
