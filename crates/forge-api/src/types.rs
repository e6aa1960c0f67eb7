//! Persisted project model and lifecycle vocabulary
//!
//! Everything in this module round-trips through the hidden project
//! configuration directory as JSON. `ProjectSettings` is the static half
//! (mutated only by create/env operations), `ProjectState` the dynamic half
//! (append/overwrite, never pruned automatically).

use crate::question::Answers;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Free-form JSON object, the lingua franca between engine and plugins
pub type Json = serde_json::Map<String, serde_json::Value>;

/// Name of the hidden per-project configuration directory
pub const CONFIG_FOLDER: &str = ".forge";

/// Metadata of one deployment environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvMeta {
    /// Unique key within [`ProjectSettings::environments`]
    pub name: String,
    /// Whether this environment runs locally
    pub local: bool,
    /// Whether sideloading is enabled
    pub sideloading: bool,
}

impl EnvMeta {
    /// Create environment metadata
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, local: bool, sideloading: bool) -> Self {
        Self {
            name: name.into(),
            local,
            sideloading,
        }
    }
}

/// Settings owned by the selected solution plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSettings {
    /// Identifier of the solution plugin
    pub name: String,
    /// Solution version
    pub version: String,
    /// Ordered list of active resource-plugin identifiers
    #[serde(default)]
    pub active_resource_plugins: Vec<String>,
    /// Per-resource settings keyed by resource-plugin identifier
    #[serde(default)]
    pub resource_settings: Json,
    /// Solution-specific settings (capabilities, host type, ...)
    #[serde(default, flatten)]
    pub extra: Json,
}

impl SolutionSettings {
    /// Create settings for a named solution
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            active_resource_plugins: Vec::new(),
            resource_settings: Json::new(),
            extra: Json::new(),
        }
    }
}

/// Static per-project settings, persisted as `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Application name
    pub name: String,
    /// Name of the active environment; always present in `environments`
    pub current_env: String,
    /// Environment name -> metadata
    pub environments: HashMap<String, EnvMeta>,
    /// Selected solution and its settings
    pub solution: SolutionSettings,
}

impl ProjectSettings {
    /// Metadata of the active environment
    ///
    /// The active environment always exists in the map; a settings file that
    /// violates this is rejected at load time.
    #[must_use]
    pub fn current_env_meta(&self) -> Option<&EnvMeta> {
        self.environments.get(&self.current_env)
    }
}

/// Dynamic per-project state, persisted as `state.json`
///
/// Stage completion flags and plugin-produced values accumulate here via deep
/// merge; keys are never deleted by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectState {
    /// Raw state mapping
    pub values: Json,
}

/// Values returned by an environment-scoped plugin call
///
/// Both mappings accumulate across repeated stage invocations via deep merge
/// and are persisted per environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvResult {
    /// Resolved instance values (`<env>.userdata.json`)
    pub resource_values: Json,
    /// Stage/state values (`<env>.state.json`)
    pub state_values: Json,
}

/// Lifecycle stage a question tree or plugin call is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Create a new project
    Create,
    /// Provision infrastructure resources
    Provision,
    /// Build artifacts
    Build,
    /// Deploy artifacts
    Deploy,
    /// Publish the application
    Publish,
    /// Create an environment
    CreateEnv,
    /// Remove an environment
    RemoveEnv,
    /// Switch the active environment
    SwitchEnv,
}

/// Caller-supplied inputs for one operation
///
/// `answers` may pre-supply question answers (e.g. from CLI flags); the
/// traversal consumes a preset answer instead of prompting for it.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Root path of the target project
    pub project_path: PathBuf,
    /// Pre-supplied answers keyed by question name
    pub answers: Answers,
}

impl Inputs {
    /// Inputs for a project rooted at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: path.into(),
            answers: Answers::default(),
        }
    }

    /// Pre-supply one answer
    #[must_use]
    pub fn with_answer(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.answers.insert(name, value);
        self
    }
}

/// Deep-copied snapshot of everything the engine knows about a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfigs {
    /// Static settings
    pub settings: Option<ProjectSettings>,
    /// Dynamic state
    pub state: Option<ProjectState>,
    /// Raw provision templates keyed by resource-plugin identifier
    pub provision_templates: HashMap<String, serde_json::Value>,
    /// Raw deploy templates keyed by resource-plugin identifier
    pub deploy_templates: HashMap<String, serde_json::Value>,
    /// Provision templates resolved against the active environment
    pub provision_configs: HashMap<String, serde_json::Value>,
    /// Deploy templates resolved against the active environment
    pub deploy_configs: HashMap<String, serde_json::Value>,
    /// Instance values of the active environment
    pub resource_instance_values: Json,
    /// State values of the active environment
    pub state_values: Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_roundtrip() {
        let mut environments = HashMap::new();
        environments.insert("default".to_string(), EnvMeta::new("default", false, false));
        let settings = ProjectSettings {
            name: "myapp".to_string(),
            current_env: "default".to_string(),
            environments,
            solution: SolutionSettings::new("forge-solution-default", "1.0.0"),
        };

        let text = serde_json::to_string(&settings).unwrap();
        let back: ProjectSettings = serde_json::from_str(&text).unwrap();
        assert_eq!(back.name, "myapp");
        assert_eq!(back.current_env_meta().unwrap().name, "default");
    }

    #[test]
    fn solution_settings_extra_fields_flatten() {
        let text = r#"{
            "name": "sol",
            "version": "1.0.0",
            "host_type": "Azure",
            "capabilities": ["Tab"]
        }"#;
        let settings: SolutionSettings = serde_json::from_str(text).unwrap();
        assert_eq!(settings.extra.get("host_type").unwrap(), "Azure");

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back.get("capabilities").unwrap()[0], "Tab");
    }

    #[test]
    fn project_state_is_transparent() {
        let state: ProjectState = serde_json::from_str(r#"{"build": true}"#).unwrap();
        assert_eq!(state.values.get("build").unwrap(), true);
    }
}
