//! Plugin lifecycle contracts
//!
//! Two plugin shapes exist: one top-level [`SolutionPlugin`] that owns
//! scaffolding and orchestration policy, and zero or more [`ResourcePlugin`]s
//! each responsible for a single resource's lifecycle. Every method receives
//! a stage-appropriate context slice, never the full engine state.
//!
//! Optional methods default to a no-op contribution; callers that need a
//! definite answer ask [`SolutionPlugin::supports`] /
//! [`ResourcePlugin::supports`] instead of probing for failures.

use crate::error::{CoreError, StageError};
use crate::question::QuestionNode;
use crate::token::TokenProvider;
use crate::types::{
    EnvMeta, EnvResult, Inputs, Json, ProjectSettings, ProjectState, SolutionSettings, Task,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Optional plugin method, queryable via `supports()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `scaffold_source_code`
    ScaffoldSourceCode,
    /// `scaffold_resource_template`
    ScaffoldResourceTemplate,
    /// `provision_resource`
    ProvisionResource,
    /// `configure_resource`
    ConfigureResource,
    /// `build_artifacts`
    BuildArtifacts,
    /// `deploy_artifacts`
    DeployArtifacts,
    /// `publish_application`
    PublishApplication,
    /// `get_questions_for_lifecycle_task`
    GetQuestionsForLifecycleTask,
    /// `get_questions_for_user_task`
    GetQuestionsForUserTask,
    /// `execute_user_task`
    ExecuteUserTask,
}

impl Capability {
    /// Method name, for diagnostics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScaffoldSourceCode => "scaffold_source_code",
            Self::ScaffoldResourceTemplate => "scaffold_resource_template",
            Self::ProvisionResource => "provision_resource",
            Self::ConfigureResource => "configure_resource",
            Self::BuildArtifacts => "build_artifacts",
            Self::DeployArtifacts => "deploy_artifacts",
            Self::PublishApplication => "publish_application",
            Self::GetQuestionsForLifecycleTask => "get_questions_for_lifecycle_task",
            Self::GetQuestionsForUserTask => "get_questions_for_user_task",
            Self::ExecuteUserTask => "execute_user_task",
        }
    }
}

/// Namespaced user-task request routed through the registry
///
/// The first `/`-separated segment of `namespace` selects a plugin; the rest
/// is opaque to the engine and forwarded verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFunction {
    /// Slash-delimited routing identifier
    pub namespace: String,
    /// Method name within the plugin
    pub method: String,
    /// Free-form parameters
    pub params: Option<Value>,
}

impl TaskFunction {
    /// Build a routed task request
    #[must_use]
    pub fn new(namespace: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            method: method.into(),
            params: None,
        }
    }

    /// First namespace segment, the routing key
    #[must_use]
    pub fn route_key(&self) -> Option<&str> {
        self.namespace.split('/').next().filter(|s| !s.is_empty())
    }
}

/// Result of a solution scaffold: the filled-in solution settings plus one
/// immutable template pair per active resource plugin
#[derive(Debug, Clone)]
pub struct ScaffoldResult {
    /// Solution settings derived from the collected answers
    pub solution: SolutionSettings,
    /// Provision templates keyed by resource-plugin identifier
    pub provision_templates: HashMap<String, Value>,
    /// Deploy templates keyed by resource-plugin identifier
    pub deploy_templates: HashMap<String, Value>,
}

/// Result of a resource-plugin template scaffold
#[derive(Debug, Clone, Default)]
pub struct ResourceScaffoldResult {
    /// Provision template
    pub provision: Value,
    /// Deploy template
    pub deploy: Value,
}

/// Context slice for project-scoped solution calls
#[derive(Debug, Clone)]
pub struct SolutionContext {
    /// Project root
    pub project_path: PathBuf,
    /// Static settings
    pub settings: ProjectSettings,
    /// Dynamic state
    pub state: ProjectState,
}

/// Context slice for environment-scoped solution calls (provision, deploy)
#[derive(Clone)]
pub struct SolutionEnvContext {
    /// Project-scoped slice
    pub solution: SolutionContext,
    /// The active environment
    pub env: EnvMeta,
    /// Token access
    pub tokens: Arc<dyn TokenProvider>,
    /// Resolved config per active resource plugin, for the invoked stage
    pub resource_configs: HashMap<String, Value>,
}

/// Context slice carrying both stages' resolved configs (publish, questions)
#[derive(Clone)]
pub struct SolutionAllContext {
    /// Project-scoped slice
    pub solution: SolutionContext,
    /// The active environment
    pub env: EnvMeta,
    /// Token access
    pub tokens: Arc<dyn TokenProvider>,
    /// Resolved provision configs per active resource plugin
    pub provision_configs: HashMap<String, Value>,
    /// Resolved deploy configs per active resource plugin
    pub deploy_configs: HashMap<String, Value>,
}

/// Context slice for project-scoped resource calls
#[derive(Debug, Clone)]
pub struct ResourceContext {
    /// Project root
    pub project_path: PathBuf,
    /// Static settings
    pub settings: ProjectSettings,
    /// Dynamic state
    pub state: ProjectState,
    /// This resource's settings slice
    pub resource_settings: Value,
    /// This resource's recorded state slice
    pub resource_states: Value,
}

/// Context slice for environment-scoped resource calls
#[derive(Clone)]
pub struct ResourceEnvContext {
    /// Project-scoped slice
    pub resource: ResourceContext,
    /// The active environment
    pub env: EnvMeta,
    /// Token access
    pub tokens: Arc<dyn TokenProvider>,
    /// Config shared across resource plugins
    pub common_config: Value,
    /// This resource's resolved config
    pub self_config: Value,
}

/// Top-level solution plugin
///
/// Lifecycle methods are mandatory for solutions; only the user-task pair is
/// optional.
#[async_trait]
pub trait SolutionPlugin: Send + Sync {
    /// Stable identifier used for registration and routing
    fn name(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str;

    /// Scaffold a project: derive solution settings from the collected
    /// answers and emit the per-resource template pairs
    async fn scaffold_files(
        &self,
        ctx: &SolutionContext,
        inputs: &Inputs,
    ) -> Result<ScaffoldResult, CoreError>;

    /// Build artifacts; returns a state patch merged into the project state
    async fn build_artifacts(
        &self,
        ctx: &SolutionContext,
        inputs: &Inputs,
    ) -> Result<Json, CoreError>;

    /// Provision resources; may fail while still attaching a partial result
    async fn provision_resources(
        &self,
        ctx: &SolutionEnvContext,
        inputs: &Inputs,
    ) -> Result<EnvResult, StageError>;

    /// Deploy artifacts; may fail while still attaching a partial result
    async fn deploy_artifacts(
        &self,
        ctx: &SolutionEnvContext,
        inputs: &Inputs,
    ) -> Result<EnvResult, StageError>;

    /// Publish the application
    async fn publish_application(
        &self,
        ctx: &SolutionAllContext,
        inputs: &Inputs,
    ) -> Result<EnvResult, CoreError>;

    /// Question subtree for a lifecycle task; `None` contributes nothing
    async fn get_questions_for_lifecycle_task(
        &self,
        ctx: &SolutionAllContext,
        task: Task,
        inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError>;

    /// Whether an optional method is implemented
    fn supports(&self, capability: Capability) -> bool {
        !matches!(
            capability,
            Capability::GetQuestionsForUserTask | Capability::ExecuteUserTask
        )
    }

    /// Question subtree for a plugin-defined user task
    async fn get_questions_for_user_task(
        &self,
        _ctx: &SolutionAllContext,
        _func: &TaskFunction,
        _inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        Ok(None)
    }

    /// Execute a plugin-defined user task (`Add Resource`, ...)
    async fn execute_user_task(
        &self,
        _ctx: &SolutionAllContext,
        _func: &TaskFunction,
        _inputs: &Inputs,
    ) -> Result<Value, CoreError> {
        Err(CoreError::CapabilityNotSupported {
            plugin: self.name().to_string(),
            capability: Capability::ExecuteUserTask.as_str().to_string(),
        })
    }
}

/// Resource plugin; every method is optional and defaults to a no-op
/// contribution
#[async_trait]
pub trait ResourcePlugin: Send + Sync {
    /// Stable identifier used for registration and routing
    fn name(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str;

    /// Whether an optional method is implemented
    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Scaffold source code for this resource
    async fn scaffold_source_code(
        &self,
        _ctx: &ResourceContext,
        _inputs: &Inputs,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    /// Produce this resource's provision/deploy template pair
    async fn scaffold_resource_template(
        &self,
        _ctx: &ResourceContext,
        _inputs: &Inputs,
    ) -> Result<ResourceScaffoldResult, CoreError> {
        Ok(ResourceScaffoldResult::default())
    }

    /// Provision this resource; may fail while still attaching a partial
    /// result
    async fn provision_resource(
        &self,
        _ctx: &ResourceEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, StageError> {
        Ok(EnvResult::default())
    }

    /// Configure this resource after all resources are provisioned
    async fn configure_resource(&self, _ctx: &ResourceEnvContext) -> Result<(), CoreError> {
        Ok(())
    }

    /// Build this resource's artifacts; returns a state patch
    async fn build_artifacts(
        &self,
        _ctx: &ResourceContext,
        _inputs: &Inputs,
    ) -> Result<Json, CoreError> {
        Ok(Json::new())
    }

    /// Deploy this resource's artifacts
    async fn deploy_artifacts(
        &self,
        _ctx: &ResourceEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, StageError> {
        Ok(EnvResult::default())
    }

    /// Publish this resource's share of the application
    async fn publish_application(
        &self,
        _ctx: &ResourceEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, CoreError> {
        Ok(EnvResult::default())
    }

    /// Question subtree for a lifecycle task; `None` contributes nothing
    async fn get_questions_for_lifecycle_task(
        &self,
        _ctx: &ResourceContext,
        _task: Task,
        _inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        Ok(None)
    }

    /// Question subtree for a plugin-defined user task
    async fn get_questions_for_user_task(
        &self,
        _ctx: &ResourceContext,
        _func: &TaskFunction,
        _inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        Ok(None)
    }

    /// Execute a plugin-defined user task
    async fn execute_user_task(
        &self,
        _ctx: &ResourceContext,
        _func: &TaskFunction,
        _inputs: &Inputs,
    ) -> Result<Value, CoreError> {
        Err(CoreError::CapabilityNotSupported {
            plugin: self.name().to_string(),
            capability: Capability::ExecuteUserTask.as_str().to_string(),
        })
    }
}
