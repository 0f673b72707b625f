//! Monitoring suite configuration documents

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{default_enabled, load_json, ConfigError};

/// Keys every KPI entry must define
pub const KPI_REQUIRED_KEYS: [&str; 2] = ["thresh_in_percent", "d1"];

/// KPI monitoring document: named groups of KPI checks
#[derive(Debug, Deserialize)]
pub struct KpisConfig {
    pub tables: BTreeMap<String, KpiGroup>,
}

#[derive(Debug, Deserialize)]
pub struct KpiGroup {
    pub kpis: BTreeMap<String, KpiSpec>,
}

/// One KPI check: deviation threshold plus free-form template parameters
#[derive(Debug, Clone, Deserialize)]
pub struct KpiSpec {
    #[serde(rename = "isEnable", default = "default_enabled")]
    pub enabled: bool,

    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl KpisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }
}

/// Log-freshness monitoring document: one parameter map per check group
#[derive(Debug, Deserialize)]
pub struct LogsConfig {
    pub tables: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl LogsConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }
}

/// Table-freshness monitoring document
#[derive(Debug, Deserialize)]
pub struct TablesConfig {
    pub tables: BTreeMap<String, TableCheck>,
}

/// One monitored table with its freshness threshold
#[derive(Debug, Clone, Deserialize)]
pub struct TableCheck {
    pub dataset: String,
    pub table: String,
    pub description: String,
    pub thresh_in_hours: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl TablesConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_kpis_config_shape() {
        let f = write_temp(
            r#"{
                "tables": {
                    "engagement": {
                        "kpis": {
                            "dau": {"thresh_in_percent": 20, "d1": 7},
                            "installs": {"thresh_in_percent": 30, "d1": 7, "isEnable": false}
                        }
                    }
                }
            }"#,
        );
        let config = KpisConfig::load(f.path()).unwrap();
        let group = &config.tables["engagement"];
        assert!(group.kpis["dau"].enabled);
        assert!(!group.kpis["installs"].enabled);
        assert_eq!(group.kpis["dau"].params["d1"], serde_json::json!(7));
    }

    #[test]
    fn test_tables_config_required_fields() {
        let f = write_temp(
            r#"{
                "tables": {
                    "events": {
                        "dataset": "raw",
                        "table": "events",
                        "description": "raw events feed",
                        "thresh_in_hours": 24
                    }
                }
            }"#,
        );
        let config = TablesConfig::load(f.path()).unwrap();
        let check = &config.tables["events"];
        assert!(check.enabled);
        assert_eq!(check.thresh_in_hours, 24.0);
    }

    #[test]
    fn test_tables_config_missing_threshold_fails() {
        let f = write_temp(r#"{"tables": {"events": {"dataset": "raw", "table": "events", "description": "x"}}}"#);
        assert!(matches!(
            TablesConfig::load(f.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
