//! Configuration persistence, template resolution, deep merge
//!
//! All persisted files live inside the hidden project-configuration
//! directory ([`forge_api::CONFIG_FOLDER`]):
//!
//! - `settings.json` / `state.json`: required
//! - `<resource-id>.provision.tpl.json` / `<resource-id>.deploy.tpl.json`
//! - `<env>.userdata.json` / `<env>.state.json`: optional, default empty
//!
//! Writes are per-file with no cross-file transaction; a crash between
//! writes can leave them mutually inconsistent (accepted limitation).

use forge_api::{CoreError, Json, ProjectSettings, ProjectState, CONFIG_FOLDER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// `{{name}}` placeholder tokens inside templates
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_.-]+)\}\}").expect("valid placeholder pattern"));

/// Persistence I/O for one project's configuration directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at the given project path
    #[must_use]
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            config_dir: project_path.as_ref().join(CONFIG_FOLDER),
        }
    }

    /// The hidden configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Whether the on-disk layout looks like a project we can operate on
    pub async fn is_project(&self) -> bool {
        fs::try_exists(self.config_dir.join("settings.json"))
            .await
            .unwrap_or(false)
    }

    /// Load `settings.json` (required)
    pub async fn load_settings(&self) -> Result<ProjectSettings, CoreError> {
        let settings: ProjectSettings = self.read_json(&self.config_dir.join("settings.json")).await?;
        if !settings.environments.contains_key(&settings.current_env) {
            return Err(CoreError::EnvNotFound {
                name: settings.current_env,
            });
        }
        Ok(settings)
    }

    /// Load `state.json` (required)
    pub async fn load_state(&self) -> Result<ProjectState, CoreError> {
        self.read_json(&self.config_dir.join("state.json")).await
    }

    /// Load the template pair of every active resource plugin
    pub async fn load_templates(
        &self,
        resources: &[String],
    ) -> Result<(HashMap<String, Value>, HashMap<String, Value>), CoreError> {
        let mut provision = HashMap::new();
        let mut deploy = HashMap::new();
        for resource in resources {
            let p: Value = self
                .read_json(&self.config_dir.join(format!("{resource}.provision.tpl.json")))
                .await?;
            let d: Value = self
                .read_json(&self.config_dir.join(format!("{resource}.deploy.tpl.json")))
                .await?;
            provision.insert(resource.clone(), p);
            deploy.insert(resource.clone(), d);
        }
        Ok((provision, deploy))
    }

    /// Load an environment's instance and state values; missing files default
    /// to empty mappings
    pub async fn load_env_values(&self, env: &str) -> Result<(Json, Json), CoreError> {
        let instance = self
            .read_json_optional(&self.config_dir.join(format!("{env}.userdata.json")))
            .await?
            .unwrap_or_default();
        let state = self
            .read_json_optional(&self.config_dir.join(format!("{env}.state.json")))
            .await?
            .unwrap_or_default();
        Ok((instance, state))
    }

    /// Persist settings, state, and the active environment's value files
    ///
    /// Invoked once per mutating operation, after the in-memory merge.
    pub async fn write_back(
        &self,
        settings: &ProjectSettings,
        state: &ProjectState,
        env: &str,
        instance_values: &Json,
        state_values: &Json,
    ) -> Result<(), CoreError> {
        fs::create_dir_all(&self.config_dir)
            .await
            .map_err(|e| CoreError::io(&self.config_dir, e))?;
        self.write_json(&self.config_dir.join("settings.json"), settings)
            .await?;
        self.write_json(&self.config_dir.join("state.json"), state)
            .await?;
        self.write_json(
            &self.config_dir.join(format!("{env}.userdata.json")),
            instance_values,
        )
        .await?;
        self.write_json(
            &self.config_dir.join(format!("{env}.state.json")),
            state_values,
        )
        .await?;
        Ok(())
    }

    /// Persist the per-resource template pairs produced at scaffold time
    pub async fn write_templates(
        &self,
        provision: &HashMap<String, Value>,
        deploy: &HashMap<String, Value>,
    ) -> Result<(), CoreError> {
        fs::create_dir_all(&self.config_dir)
            .await
            .map_err(|e| CoreError::io(&self.config_dir, e))?;
        for (resource, template) in provision {
            self.write_json(
                &self.config_dir.join(format!("{resource}.provision.tpl.json")),
                template,
            )
            .await?;
        }
        for (resource, template) in deploy {
            self.write_json(
                &self.config_dir.join(format!("{resource}.deploy.tpl.json")),
                template,
            )
            .await?;
        }
        Ok(())
    }

    /// Remove an environment's persisted value files, ignoring missing ones
    pub async fn remove_env_values(&self, env: &str) -> Result<(), CoreError> {
        for file in [
            self.config_dir.join(format!("{env}.userdata.json")),
            self.config_dir.join(format!("{env}.state.json")),
        ] {
            match fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CoreError::io(&file, e)),
            }
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, CoreError> {
        let bytes = fs::read(path).await.map_err(|e| CoreError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| CoreError::parse(path, e))
    }

    async fn read_json_optional<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<T>, CoreError> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CoreError::parse(path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io(path, e)),
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| CoreError::parse(path, e))?;
        fs::write(path, bytes).await.map_err(|e| CoreError::io(path, e))
    }
}

/// Resolve the stage templates of every active resource plugin
///
/// Resources without a template for the stage are skipped; templates are
/// cloned, never mutated in place.
#[must_use]
pub fn resolve_configs(
    resources: &[String],
    templates: &HashMap<String, Value>,
    instance_values: &Json,
) -> HashMap<String, Value> {
    let mut configs = HashMap::new();
    for resource in resources {
        if let Some(template) = templates.get(resource) {
            let mut resolved = template.clone();
            resolve_placeholders(&mut resolved, instance_values);
            configs.insert(resource.clone(), resolved);
        }
    }
    configs
}

/// Substitute `{{key}}` tokens anywhere in a nested structure
///
/// Tokens with no matching instance value are left literal: a partially
/// provisioned environment degrades gracefully instead of erroring.
pub fn resolve_placeholders(value: &mut Value, instance_values: &Json) {
    match value {
        Value::String(text) => {
            if PLACEHOLDER.is_match(text) {
                let replaced = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
                    match instance_values.get(&caps[1]) {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => caps[0].to_string(),
                    }
                });
                *text = replaced.into_owned();
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_placeholders(item, instance_values);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                resolve_placeholders(item, instance_values);
            }
        }
        _ => {}
    }
}

/// Deep merge: nested objects merge recursively, everything else (scalars,
/// arrays) is overwritten wholesale. A merge never deletes a known key.
pub fn deep_merge(existing: &mut Json, incoming: &Json) {
    for (key, incoming_value) in incoming {
        match (existing.get_mut(key), incoming_value) {
            (Some(Value::Object(left)), Value::Object(right)) => deep_merge(left, right),
            _ => {
                existing.insert(key.clone(), incoming_value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_api::{EnvMeta, SolutionSettings};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Json {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn merge_combines_nested_objects() {
        let mut existing = obj(json!({"a": 1, "b": {"c": 1}}));
        let incoming = obj(json!({"b": {"d": 2}}));
        deep_merge(&mut existing, &incoming);
        assert_eq!(Value::Object(existing), json!({"a": 1, "b": {"c": 1, "d": 2}}));
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut existing = obj(json!({"a": 1, "b": {"c": 1}}));
        deep_merge(&mut existing, &Json::new());
        assert_eq!(Value::Object(existing), json!({"a": 1, "b": {"c": 1}}));
    }

    #[test]
    fn merge_replaces_scalars_and_arrays_wholesale() {
        let mut existing = obj(json!({"a": [1, 2], "b": "old"}));
        let incoming = obj(json!({"a": [3], "b": "new"}));
        deep_merge(&mut existing, &incoming);
        assert_eq!(Value::Object(existing), json!({"a": [3], "b": "new"}));
    }

    #[test]
    fn placeholder_resolution_is_idempotent() {
        let instance = obj(json!({"endpoint": "http://x"}));
        let mut template = json!({"endpoint": "{{endpoint}}"});

        resolve_placeholders(&mut template, &instance);
        assert_eq!(template, json!({"endpoint": "http://x"}));

        // second pass finds no tokens and changes nothing
        resolve_placeholders(&mut template, &instance);
        assert_eq!(template, json!({"endpoint": "http://x"}));
    }

    #[test]
    fn unresolved_placeholder_stays_literal() {
        let mut template = json!({"endpoint": "{{endpoint}}"});
        resolve_placeholders(&mut template, &Json::new());
        assert_eq!(template, json!({"endpoint": "{{endpoint}}"}));
    }

    #[test]
    fn placeholders_resolve_inside_arrays_and_nested_objects() {
        let instance = obj(json!({"name": "frontend", "port": 8080}));
        let mut template = json!({
            "hosts": ["{{name}}.example.com"],
            "nested": {"url": "http://{{name}}:{{port}}/api"}
        });
        resolve_placeholders(&mut template, &instance);
        assert_eq!(
            template,
            json!({
                "hosts": ["frontend.example.com"],
                "nested": {"url": "http://frontend:8080/api"}
            })
        );
    }

    #[test]
    fn resolve_configs_skips_resources_without_template() {
        let mut templates = HashMap::new();
        templates.insert("frontend".to_string(), json!({"endpoint": "{{endpoint}}"}));
        let resources = vec!["frontend".to_string(), "backend".to_string()];
        let instance = obj(json!({"endpoint": "http://x"}));

        let configs = resolve_configs(&resources, &templates, &instance);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["frontend"], json!({"endpoint": "http://x"}));
    }

    fn test_settings() -> ProjectSettings {
        let mut environments = std::collections::HashMap::new();
        environments.insert("default".to_string(), EnvMeta::new("default", false, false));
        ProjectSettings {
            name: "myapp".to_string(),
            current_env: "default".to_string(),
            environments,
            solution: SolutionSettings::new("sol", "1.0.0"),
        }
    }

    #[tokio::test]
    async fn write_back_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());

        let settings = test_settings();
        let state = ProjectState {
            values: obj(json!({"build": true})),
        };
        let instance = obj(json!({"endpoint": "http://x"}));
        let env_state = obj(json!({"provision": true}));

        store
            .write_back(&settings, &state, "default", &instance, &env_state)
            .await
            .unwrap();

        assert!(store.is_project().await);
        let loaded = store.load_settings().await.unwrap();
        assert_eq!(loaded.name, "myapp");
        let loaded_state = store.load_state().await.unwrap();
        assert_eq!(loaded_state.values.get("build").unwrap(), true);
        let (inst, st) = store.load_env_values("default").await.unwrap();
        assert_eq!(inst, instance);
        assert_eq!(st, env_state);
    }

    #[tokio::test]
    async fn missing_env_values_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let (inst, st) = store.load_env_values("ghost").await.unwrap();
        assert!(inst.is_empty());
        assert!(st.is_empty());
    }

    #[tokio::test]
    async fn missing_settings_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let err = store.load_settings().await.unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[tokio::test]
    async fn malformed_settings_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_FOLDER);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("settings.json"), b"{ not json").unwrap();

        let store = ConfigStore::new(dir.path());
        let err = store.load_settings().await.unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn templates_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());

        let mut provision = HashMap::new();
        provision.insert("frontend".to_string(), json!({"endpoint": "{{endpoint}}"}));
        let mut deploy = HashMap::new();
        deploy.insert("frontend".to_string(), json!({"storagename": "{{storagename}}"}));

        store.write_templates(&provision, &deploy).await.unwrap();
        let (p, d) = store
            .load_templates(&["frontend".to_string()])
            .await
            .unwrap();
        assert_eq!(p, provision);
        assert_eq!(d, deploy);
    }
}
