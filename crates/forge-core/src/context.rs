//! Stage-scoped context composition
//!
//! [`CoreContext`] is the engine's in-memory view of one project for the
//! duration of one operation: loaded settings/state, raw templates, the
//! active environment's accumulated values, and the capability handles.
//! Plugin calls never see it directly; they receive the narrower slices
//! built here.

use crate::config_store;
use forge_api::{
    CoreError, EnvMeta, EnvResult, Json, ProjectSettings, ProjectState, SolutionAllContext,
    SolutionContext, SolutionEnvContext, SolutionPlugin, Tools,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// In-memory model of one project during one operation; never persisted
/// directly
#[derive(Clone)]
pub struct CoreContext {
    /// Project root path
    pub project_path: PathBuf,
    /// Static settings
    pub settings: ProjectSettings,
    /// Dynamic state
    pub state: ProjectState,
    /// The routed solution plugin
    pub solution: Arc<dyn SolutionPlugin>,
    /// Raw provision templates keyed by resource-plugin identifier
    pub provision_templates: HashMap<String, Value>,
    /// Raw deploy templates keyed by resource-plugin identifier
    pub deploy_templates: HashMap<String, Value>,
    /// Accumulated instance values of the active environment
    pub instance_values: Json,
    /// Accumulated state values of the active environment
    pub state_values: Json,
    /// Host capability handles
    pub tools: Tools,
}

impl CoreContext {
    /// Metadata of the active environment
    ///
    /// Settings loading guarantees the active environment exists.
    pub fn current_env(&self) -> Result<EnvMeta, CoreError> {
        self.settings
            .current_env_meta()
            .cloned()
            .ok_or_else(|| CoreError::EnvNotFound {
                name: self.settings.current_env.clone(),
            })
    }

    /// Provision templates resolved against the accumulated instance values
    #[must_use]
    pub fn provision_configs(&self) -> HashMap<String, Value> {
        config_store::resolve_configs(
            &self.settings.solution.active_resource_plugins,
            &self.provision_templates,
            &self.instance_values,
        )
    }

    /// Deploy templates resolved against the accumulated instance values
    #[must_use]
    pub fn deploy_configs(&self) -> HashMap<String, Value> {
        config_store::resolve_configs(
            &self.settings.solution.active_resource_plugins,
            &self.deploy_templates,
            &self.instance_values,
        )
    }

    /// Project-scoped solution slice
    #[must_use]
    pub fn solution_context(&self) -> SolutionContext {
        SolutionContext {
            project_path: self.project_path.clone(),
            settings: self.settings.clone(),
            state: self.state.clone(),
        }
    }

    /// Environment-scoped slice carrying the given stage's resolved configs
    pub fn solution_env_context(
        &self,
        resource_configs: HashMap<String, Value>,
    ) -> Result<SolutionEnvContext, CoreError> {
        Ok(SolutionEnvContext {
            solution: self.solution_context(),
            env: self.current_env()?,
            tokens: Arc::clone(&self.tools.tokens),
            resource_configs,
        })
    }

    /// Slice carrying both stages' resolved configs
    pub fn solution_all_context(&self) -> Result<SolutionAllContext, CoreError> {
        Ok(SolutionAllContext {
            solution: self.solution_context(),
            env: self.current_env()?,
            tokens: Arc::clone(&self.tools.tokens),
            provision_configs: self.provision_configs(),
            deploy_configs: self.deploy_configs(),
        })
    }

    /// Merge an environment-scoped plugin result into the accumulated values
    pub fn merge_env_result(&mut self, result: &EnvResult) {
        config_store::deep_merge(&mut self.instance_values, &result.resource_values);
        config_store::deep_merge(&mut self.state_values, &result.state_values);
    }

    /// Merge a plugin-produced state patch into the project state
    pub fn merge_state_patch(&mut self, patch: &Json) {
        config_store::deep_merge(&mut self.state.values, patch);
    }
}
