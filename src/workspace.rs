//! Filesystem layout conventions
//!
//! Templates and configuration live under `pipelines/` and `monitoring/`;
//! run artifacts (rendered SQL, error reports, alert files) are mirrored
//! under `temp/`. All paths derive deterministically from `(job, task)`.

use std::io;
use std::path::{Path, PathBuf};

/// Artifact directories for one job or monitoring suite
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Rendered SQL and run reports
    pub logs: PathBuf,
    /// Per-task error files
    pub errors: PathBuf,
    /// Alert markdown files
    pub alerts: PathBuf,
}

impl ArtifactPaths {
    fn under(root: PathBuf) -> io::Result<Self> {
        let paths = Self {
            logs: root.join("logs"),
            errors: root.join("errors"),
            alerts: root.join("alerts"),
        };
        std::fs::create_dir_all(&paths.logs)?;
        std::fs::create_dir_all(&paths.errors)?;
        std::fs::create_dir_all(&paths.alerts)?;
        Ok(paths)
    }
}

/// Root of the pipeline/monitoring tree
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn action_config_path(&self) -> PathBuf {
        self.root.join("pipelines").join("action_config.json")
    }

    pub fn job_config_path(&self, job_name: &str) -> PathBuf {
        self.root
            .join("pipelines")
            .join(job_name)
            .join(format!("{job_name}_config.json"))
    }

    /// SQL template for a task, with the shared `clear_table` fallback
    pub fn task_template_path(&self, job_name: &str, task_name: &str) -> PathBuf {
        let path = self
            .root
            .join("pipelines")
            .join(job_name)
            .join(format!("{task_name}.sql"));
        if !path.exists() && task_name == "clear_table" {
            return self.root.join("pipelines").join("clear_table.sql");
        }
        path
    }

    /// Artifact directories for a pipeline job, created on first use
    pub fn job_artifacts(&self, job_name: &str) -> io::Result<ArtifactPaths> {
        ArtifactPaths::under(self.root.join("temp").join("pipelines").join(job_name))
    }

    /// Artifact directories for a monitoring suite, created on first use
    pub fn monitor_artifacts(&self, suite: &str) -> io::Result<ArtifactPaths> {
        ArtifactPaths::under(self.root.join("temp").join("monitoring").join(suite))
    }

    pub fn kpis_config_path(&self) -> PathBuf {
        self.root
            .join("monitoring")
            .join("kpis")
            .join("kpis_config.json")
    }

    pub fn kpi_query_path(&self, kpi_name: &str) -> PathBuf {
        self.root
            .join("monitoring")
            .join("kpis")
            .join("queries")
            .join(format!("{kpi_name}_alerts.sql"))
    }

    pub fn logs_config_path(&self) -> PathBuf {
        self.root
            .join("monitoring")
            .join("logs")
            .join("logs_config.json")
    }

    pub fn logs_query_path(&self) -> PathBuf {
        self.root
            .join("monitoring")
            .join("logs")
            .join("logs_query.sql")
    }

    pub fn tables_config_path(&self) -> PathBuf {
        self.root
            .join("monitoring")
            .join("tables")
            .join("tables_config.json")
    }

    pub fn tables_query_path(&self) -> PathBuf {
        self.root
            .join("monitoring")
            .join("tables")
            .join("table_freshness_alert.sql")
    }
}

/// Write a file, creating parent directories as needed
pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}
