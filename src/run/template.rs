//! SQL template rendering
//!
//! Templates are plain text with `{name}` placeholders; substitution is
//! explicit key → value replacement, not a template language. The merged
//! parameter set is task configuration first, then the reserved run keys
//! applied on top, so task configuration can never override the run's
//! identity or date parameters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::context::RunContext;

/// Substitution keys owned by the run itself
pub const RESERVED_KEYS: [&str; 5] = ["date", "run_time", "project", "job_name", "job_action"];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template references unknown placeholder {{{name}}}")]
    UnknownPlaceholder { name: String },
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").expect("valid literal pattern"))
}

/// Read a template file, distinguishing "missing" from other I/O failures
pub fn load_template(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            TemplateError::NotFound(path.to_path_buf())
        } else {
            TemplateError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Render a configuration value into SQL text.
///
/// Strings substitute bare (templates carry their own quoting); everything
/// else uses its JSON rendering.
fn param_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge task parameters, extras, and the reserved run keys.
///
/// Later entries override earlier ones; reserved keys are applied last and
/// always win.
pub fn build_params(
    task_conf: &serde_json::Map<String, serde_json::Value>,
    extras: &[(&str, String)],
    ctx: &RunContext,
) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = task_conf
        .iter()
        .map(|(k, v)| (k.clone(), param_value(v)))
        .collect();
    for (key, value) in extras {
        params.insert(key.to_string(), value.clone());
    }
    params.insert("date".to_string(), ctx.y_m_d.clone());
    params.insert("run_time".to_string(), ctx.run_time_str());
    params.insert("project".to_string(), ctx.project_id.clone());
    params.insert("job_name".to_string(), ctx.job_name.clone());
    params.insert("job_action".to_string(), ctx.action.to_string());
    params
}

/// Substitute every `{name}` placeholder from the parameter map
pub fn substitute(template: &str, params: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for m in placeholder_re().find_iter(template) {
        let name = &template[m.start() + 1..m.end() - 1];
        out.push_str(&template[last..m.start()]);
        match params.get(name) {
            Some(value) => out.push_str(value),
            None => {
                return Err(TemplateError::UnknownPlaceholder {
                    name: name.to_string(),
                })
            }
        }
        last = m.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Render a task's SQL template against its configuration and run context
pub fn render(
    template: &str,
    task_conf: &serde_json::Map<String, serde_json::Value>,
    ctx: &RunContext,
) -> Result<String, TemplateError> {
    substitute(template, &build_params(task_conf, &[], ctx))
}
