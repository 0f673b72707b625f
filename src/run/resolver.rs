//! Action resolution: (job, action) → ordered task names

use crate::config::ActionConfig;

use super::context::Action;

/// Resolve the ordered task list for an action.
///
/// Entries are taken exactly in configuration order; `{job_name}` (and the
/// legacy `{etl_name}` spelling) is substituted literally. The result is
/// unfiltered: names not defined in the job document or disabled tasks are
/// handled by the dispatcher, not here. An action with no configured
/// sequence yields an empty list.
pub fn resolve(actions: &ActionConfig, action: Action, job_name: &str) -> Vec<String> {
    actions
        .sequence(action)
        .iter()
        .map(|entry| {
            entry
                .replace("{job_name}", job_name)
                .replace("{etl_name}", job_name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(json: &str) -> ActionConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_resolve_preserves_order_and_substitutes() {
        let actions = actions(
            r#"{"daily": ["clear_table", "load_{job_name}", "dedup_{job_name}"]}"#,
        );
        assert_eq!(
            resolve(&actions, Action::Daily, "fact"),
            ["clear_table", "load_fact", "dedup_fact"]
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let actions = actions(r#"{"init": ["create_{job_name}_table"]}"#);
        let first = resolve(&actions, Action::Init, "user_panel");
        let second = resolve(&actions, Action::Init, "user_panel");
        assert_eq!(first, second);
        assert_eq!(first, ["create_user_panel_table"]);
    }

    #[test]
    fn test_resolve_legacy_placeholder() {
        let actions = actions(r#"{"delete": ["drop_{etl_name}"]}"#);
        assert_eq!(resolve(&actions, Action::Delete, "fact"), ["drop_fact"]);
    }

    #[test]
    fn test_resolve_unknown_action_is_empty() {
        let actions = actions(r#"{"daily": ["load_{job_name}"]}"#);
        assert!(resolve(&actions, Action::Delete, "fact").is_empty());
    }
}
