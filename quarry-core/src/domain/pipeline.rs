//! Pipeline definition types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category assigned to pipelines that don't declare one
pub const DEFAULT_CATEGORY: &str = "scrape";

/// Entry stage used when a definition has no `init` key
pub const DEFAULT_INIT_STAGE: &str = "init";

/// Pipeline definition as read from a definition document
///
/// Fields whose defaults depend on context (`name` falls back to the
/// definition identifier, `expire` to the process-wide default) stay optional
/// here and are resolved by the orchestrator when it builds a crawler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    /// Raw schedule token, interpreted by `SchedulePolicy::from_token`
    #[serde(default)]
    pub schedule: Option<String>,
    /// YAML 1.2 booleans only: `yes`/`no`/`on`/`off` are rejected
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_init_stage", rename = "init")]
    pub init_stage: String,
    /// Seconds
    #[serde(default)]
    pub delay: u64,
    /// Seconds
    #[serde(default)]
    pub expire: Option<u64>,
    #[serde(default)]
    pub stealthy: bool,
    /// Stages keyed by name, in document order
    #[serde(default, rename = "pipeline")]
    pub stages: IndexMap<String, StageDescriptor>,
}

/// Handler configuration of a single stage
///
/// The orchestrator never interprets `method` or `params`; they are carried
/// for the stage execution collaborator. `handle` maps an outcome rule to the
/// name of the stage that should receive the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub handle: IndexMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_init_stage() -> String {
    DEFAULT_INIT_STAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_document() {
        let definition: PipelineDefinition = serde_yaml::from_str("{}").unwrap();
        assert_eq!(definition.name, None);
        assert_eq!(definition.category, "scrape");
        assert_eq!(definition.init_stage, "init");
        assert_eq!(definition.delay, 0);
        assert_eq!(definition.expire, None);
        assert!(!definition.disabled);
        assert!(!definition.stealthy);
        assert!(definition.stages.is_empty());
    }

    #[test]
    fn test_stage_order_and_handler_config() {
        let yaml = r#"
name: gazette
init: seed
pipeline:
  seed:
    method: seed
    params:
      urls: ["https://example.com"]
    handle:
      pass: fetch
  fetch:
    method: fetch
    handle:
      pass: store
    retries: 3
  store:
    method: directory
"#;
        let definition: PipelineDefinition = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<&str> = definition.stages.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["seed", "fetch", "store"]);

        let fetch = &definition.stages["fetch"];
        assert_eq!(fetch.method.as_deref(), Some("fetch"));
        assert_eq!(fetch.handle.get("pass").map(String::as_str), Some("store"));
        assert_eq!(fetch.extra.get("retries"), Some(&Value::from(3)));
        assert!(definition.stages["seed"].params.contains_key("urls"));
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let result = serde_yaml::from_str::<PipelineDefinition>("delay: soon");
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_1_1_booleans_are_rejected() {
        for token in ["yes", "no", "on", "off"] {
            let yaml = format!("disabled: {token}");
            assert!(serde_yaml::from_str::<PipelineDefinition>(&yaml).is_err(), "{token}");
        }

        let definition: PipelineDefinition = serde_yaml::from_str("disabled: true").unwrap();
        assert!(definition.disabled);
    }
}
