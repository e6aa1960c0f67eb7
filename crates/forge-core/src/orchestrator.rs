//! Lifecycle orchestration
//!
//! [`LifecycleOrchestrator`] is the single entry point hosts call. Every
//! operation follows the same pipeline: serialize per project, load the
//! persisted configuration, compose and traverse the question tree, invoke
//! the routed solution plugin with a stage-scoped context slice, merge the
//! returned patches, and write everything back. Partial results attached to
//! a failed provision or deploy are merged and persisted before the error is
//! surfaced, so a later retry resumes from what did succeed.

use crate::compose;
use crate::config_store::ConfigStore;
use crate::context::CoreContext;
use crate::guard::ConcurrencyGuard;
use crate::questions;
use crate::registry::{PluginRegistry, RoutedPlugin};
use crate::traverse::{traverse, TraverseOutcome};
use forge_api::{
    Capability, CoreError, EnvMeta, Inputs, Json, ProjectConfigs, ProjectSettings, ProjectState,
    QuestionNode, SolutionAllContext, SolutionContext, SolutionSettings, StageError, Task,
    TaskFunction, Tools,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the environment every new project starts with
pub const DEFAULT_ENV: &str = "default";

/// The lifecycle engine
pub struct LifecycleOrchestrator {
    tools: Tools,
    registry: Arc<PluginRegistry>,
    guard: ConcurrencyGuard,
}

impl LifecycleOrchestrator {
    /// Orchestrator over a plugin registry and host capability handles
    #[must_use]
    pub fn new(tools: Tools, registry: Arc<PluginRegistry>) -> Self {
        Self {
            tools,
            registry,
            guard: ConcurrencyGuard::new(),
        }
    }

    /// The plugin registry backing this orchestrator
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Create a new project under `<folder>/<app-name>`
    ///
    /// Runs the creation question tree, routes to the selected solution for
    /// scaffolding, and persists the initial configuration with a single
    /// `default` environment. Returns the new project root.
    pub async fn create_project(&self, inputs: &Inputs) -> Result<PathBuf, CoreError> {
        // Preset collisions fail here with the definite error; interactive
        // ones are already re-prompted by the app-name validator.
        if let (Some(folder), Some(app_name)) = (
            inputs.answers.get_str(questions::names::FOLDER),
            inputs.answers.get_str(questions::names::APP_NAME),
        ) {
            let path = PathBuf::from(folder).join(app_name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(CoreError::ProjectFolderExists { path });
            }
        }

        let bootstrap = self.bootstrap_all_context(inputs);
        let tree = compose::questions_for_lifecycle_task(
            &self.registry,
            None,
            &bootstrap,
            Task::Create,
            inputs,
        )
        .await?;
        let inputs = self.collect(tree, inputs).await?;

        let folder = inputs
            .answers
            .get_str(questions::names::FOLDER)
            .ok_or_else(|| CoreError::InvalidInput("workspace folder not answered".to_string()))?;
        let app_name = inputs
            .answers
            .get_str(questions::names::APP_NAME)
            .ok_or_else(|| {
                CoreError::InvalidInput("application name not answered".to_string())
            })?
            .to_string();
        questions::validate_app_name(&app_name)?;

        let project_path = PathBuf::from(folder).join(&app_name);
        if tokio::fs::try_exists(&project_path).await.unwrap_or(false) {
            return Err(CoreError::ProjectFolderExists { path: project_path });
        }

        let solution = self.selected_solution(&inputs)?;
        info!(app = %app_name, solution = solution.name(), path = %project_path.display(), "creating project");

        let mut environments = HashMap::new();
        environments.insert(
            DEFAULT_ENV.to_string(),
            EnvMeta::new(DEFAULT_ENV, false, false),
        );
        let mut settings = ProjectSettings {
            name: app_name,
            current_env: DEFAULT_ENV.to_string(),
            environments,
            solution: SolutionSettings::new(solution.name(), "1.0.0"),
        };
        let mut state = ProjectState::default();
        if let Some(sample) = inputs.answers.get_str(questions::names::SAMPLES) {
            state
                .values
                .insert("sample".to_string(), Value::String(sample.to_string()));
        }

        tokio::fs::create_dir_all(&project_path)
            .await
            .map_err(|e| CoreError::io(&project_path, e))?;

        let scaffold_ctx = SolutionContext {
            project_path: project_path.clone(),
            settings: settings.clone(),
            state: state.clone(),
        };
        let scaffolded = solution.scaffold_files(&scaffold_ctx, &inputs).await?;
        settings.solution = scaffolded.solution;

        let store = ConfigStore::new(&project_path);
        store
            .write_back(&settings, &state, DEFAULT_ENV, &Json::new(), &Json::new())
            .await?;
        store
            .write_templates(&scaffolded.provision_templates, &scaffolded.deploy_templates)
            .await?;
        Ok(project_path)
    }

    /// Provision the active environment's resources
    ///
    /// On failure a partial result attached to the error is merged and
    /// persisted before the error is returned.
    pub async fn provision_resources(&self, inputs: &Inputs) -> Result<(), StageError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let inputs = self.collect_for_stage(&ctx, Task::Provision, inputs).await?;

        info!(path = %ctx.project_path.display(), env = %ctx.settings.current_env, "provisioning");
        let env_ctx = ctx.solution_env_context(ctx.provision_configs())?;
        match ctx.solution.provision_resources(&env_ctx, &inputs).await {
            Ok(result) => {
                ctx.merge_env_result(&result);
                self.write_back(&ctx).await?;
                Ok(())
            }
            Err(stage_error) => Err(self.persist_partial(&mut ctx, stage_error).await),
        }
    }

    /// Build artifacts; the returned state patch is merged into `state.json`
    pub async fn build_artifacts(&self, inputs: &Inputs) -> Result<(), CoreError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let inputs = self.collect_for_stage(&ctx, Task::Build, inputs).await?;

        info!(path = %ctx.project_path.display(), "building");
        let patch = ctx
            .solution
            .build_artifacts(&ctx.solution_context(), &inputs)
            .await?;
        ctx.merge_state_patch(&patch);
        self.write_back(&ctx).await
    }

    /// Deploy artifacts into the active environment
    ///
    /// Partial results are handled as in [`Self::provision_resources`].
    pub async fn deploy_artifacts(&self, inputs: &Inputs) -> Result<(), StageError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let inputs = self.collect_for_stage(&ctx, Task::Deploy, inputs).await?;

        info!(path = %ctx.project_path.display(), env = %ctx.settings.current_env, "deploying");
        let env_ctx = ctx.solution_env_context(ctx.deploy_configs())?;
        match ctx.solution.deploy_artifacts(&env_ctx, &inputs).await {
            Ok(result) => {
                ctx.merge_env_result(&result);
                self.write_back(&ctx).await?;
                Ok(())
            }
            Err(stage_error) => Err(self.persist_partial(&mut ctx, stage_error).await),
        }
    }

    /// Publish the application from the active environment
    pub async fn publish_application(&self, inputs: &Inputs) -> Result<(), CoreError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let inputs = self.collect_for_stage(&ctx, Task::Publish, inputs).await?;

        info!(path = %ctx.project_path.display(), env = %ctx.settings.current_env, "publishing");
        let all_ctx = ctx.solution_all_context()?;
        let result = ctx.solution.publish_application(&all_ctx, &inputs).await?;
        ctx.merge_env_result(&result);
        self.write_back(&ctx).await
    }

    /// Add a new environment; the active environment is left unchanged
    pub async fn create_env(&self, inputs: &Inputs) -> Result<(), CoreError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;

        // Preset duplicates fail here with the definite error; interactive
        // duplicates are already re-prompted by the question's validator.
        if let Some(name) = inputs.answers.get_str(questions::names::ENV_NAME) {
            if ctx.settings.environments.contains_key(name) {
                return Err(CoreError::EnvExists {
                    name: name.to_string(),
                });
            }
        }

        let inputs = self.collect_for_stage(&ctx, Task::CreateEnv, inputs).await?;
        let name = inputs
            .answers
            .get_str(questions::names::ENV_NAME)
            .ok_or_else(|| CoreError::InvalidInput("environment name not answered".to_string()))?
            .to_string();
        if ctx.settings.environments.contains_key(&name) {
            return Err(CoreError::EnvExists { name });
        }

        let local = inputs.answers.get_str(questions::names::ENV_LOCAL) == Some("true");
        let sideloading =
            inputs.answers.get_str(questions::names::ENV_SIDELOADING) == Some("true");
        info!(path = %ctx.project_path.display(), env = %name, "creating environment");
        ctx.settings
            .environments
            .insert(name.clone(), EnvMeta::new(name, local, sideloading));
        self.write_back(&ctx).await
    }

    /// Remove an environment; removing the active one is rejected
    pub async fn remove_env(&self, inputs: &Inputs) -> Result<(), CoreError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let inputs = self.collect_for_stage(&ctx, Task::RemoveEnv, inputs).await?;

        let name = inputs
            .answers
            .get_str(questions::names::ENV)
            .ok_or_else(|| CoreError::InvalidInput("environment not answered".to_string()))?
            .to_string();
        if name == ctx.settings.current_env {
            return Err(CoreError::CannotRemoveActiveEnv { name });
        }
        if ctx.settings.environments.remove(&name).is_none() {
            return Err(CoreError::EnvNotFound { name });
        }

        info!(path = %ctx.project_path.display(), env = %name, "removing environment");
        let store = ConfigStore::new(&ctx.project_path);
        store.remove_env_values(&name).await?;
        self.write_back(&ctx).await
    }

    /// Switch the active environment pointer
    ///
    /// On any failure the pointer is unchanged.
    pub async fn switch_env(&self, inputs: &Inputs) -> Result<(), CoreError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let inputs = self.collect_for_stage(&ctx, Task::SwitchEnv, inputs).await?;

        let name = inputs
            .answers
            .get_str(questions::names::ENV)
            .ok_or_else(|| CoreError::InvalidInput("environment not answered".to_string()))?
            .to_string();
        if !ctx.settings.environments.contains_key(&name) {
            return Err(CoreError::EnvNotFound { name });
        }

        info!(path = %ctx.project_path.display(), env = %name, "switching environment");
        let store = ConfigStore::new(&ctx.project_path);
        let (instance_values, state_values) = store.load_env_values(&name).await?;
        ctx.settings.current_env = name;
        ctx.instance_values = instance_values;
        ctx.state_values = state_values;
        self.write_back(&ctx).await
    }

    /// Metadata of every environment (unordered)
    pub async fn list_envs(&self, inputs: &Inputs) -> Result<Vec<EnvMeta>, CoreError> {
        let store = ConfigStore::new(&inputs.project_path);
        if !store.is_project().await {
            return Err(CoreError::UnsupportedProject {
                path: inputs.project_path.clone(),
            });
        }
        let settings = store.load_settings().await?;
        Ok(settings.environments.into_values().collect())
    }

    /// Question tree for a lifecycle task, without running it
    pub async fn get_questions_for_lifecycle_task(
        &self,
        task: Task,
        inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        if task == Task::Create {
            let bootstrap = self.bootstrap_all_context(inputs);
            return compose::questions_for_lifecycle_task(
                &self.registry,
                None,
                &bootstrap,
                task,
                inputs,
            )
            .await;
        }
        let ctx = self.load_context(inputs).await?;
        let all_ctx = ctx.solution_all_context()?;
        compose::questions_for_lifecycle_task(
            &self.registry,
            Some(&ctx.solution),
            &all_ctx,
            task,
            inputs,
        )
        .await
    }

    /// Question tree for a plugin-defined user task, without running it
    pub async fn get_questions_for_user_task(
        &self,
        func: &TaskFunction,
        inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        let ctx = self.load_context(inputs).await?;
        let all_ctx = ctx.solution_all_context()?;
        compose::questions_for_user_task(&self.registry, &all_ctx, func, inputs).await
    }

    /// Execute a plugin-defined user task, routed by namespace
    pub async fn execute_user_task(
        &self,
        func: &TaskFunction,
        inputs: &Inputs,
    ) -> Result<Value, CoreError> {
        let _lock = self.guard.acquire(&inputs.project_path)?;
        let mut ctx = self.load_context(inputs).await?;
        let routed = self
            .registry
            .route_for_capability(&func.namespace, Capability::ExecuteUserTask)?;

        let all_ctx = ctx.solution_all_context()?;
        let inputs = if routed.supports(Capability::GetQuestionsForUserTask) {
            let tree =
                compose::questions_for_user_task(&self.registry, &all_ctx, func, inputs).await?;
            self.collect(tree, inputs).await?
        } else {
            inputs.clone()
        };

        info!(namespace = %func.namespace, method = %func.method, "executing user task");
        let value = match &routed {
            RoutedPlugin::Solution(plugin) => {
                plugin.execute_user_task(&all_ctx, func, &inputs).await?
            }
            RoutedPlugin::Resource(plugin) => {
                let resource_ctx = compose::resource_context(&all_ctx, plugin.name());
                plugin.execute_user_task(&resource_ctx, func, &inputs).await?
            }
        };

        // User tasks may mutate project files directly; reload so the write
        // back below does not clobber them with the stale in-memory copy.
        let store = ConfigStore::new(&ctx.project_path);
        ctx.settings = store.load_settings().await?;
        ctx.state = store.load_state().await?;
        self.write_back(&ctx).await?;
        Ok(value)
    }

    /// Deep-copied snapshot of everything persisted for a project
    pub async fn get_project_configs(&self, inputs: &Inputs) -> Result<ProjectConfigs, CoreError> {
        let store = ConfigStore::new(&inputs.project_path);
        if !store.is_project().await {
            return Ok(ProjectConfigs::default());
        }
        let ctx = self.load_context(inputs).await?;
        Ok(ProjectConfigs {
            provision_configs: ctx.provision_configs(),
            deploy_configs: ctx.deploy_configs(),
            settings: Some(ctx.settings),
            state: Some(ctx.state),
            provision_templates: ctx.provision_templates,
            deploy_templates: ctx.deploy_templates,
            resource_instance_values: ctx.instance_values,
            state_values: ctx.state_values,
        })
    }

    async fn load_context(&self, inputs: &Inputs) -> Result<CoreContext, CoreError> {
        let store = ConfigStore::new(&inputs.project_path);
        if !store.is_project().await {
            return Err(CoreError::UnsupportedProject {
                path: inputs.project_path.clone(),
            });
        }
        let settings = store.load_settings().await?;
        let state = store.load_state().await?;
        let solution = self
            .registry
            .solution(&settings.solution.name)
            .ok_or_else(|| CoreError::RouteNotFound {
                namespace: settings.solution.name.clone(),
            })?;
        let (provision_templates, deploy_templates) = store
            .load_templates(&settings.solution.active_resource_plugins)
            .await?;
        let (instance_values, state_values) =
            store.load_env_values(&settings.current_env).await?;
        debug!(path = %inputs.project_path.display(), env = %settings.current_env, "context loaded");

        Ok(CoreContext {
            project_path: inputs.project_path.clone(),
            settings,
            state,
            solution,
            provision_templates,
            deploy_templates,
            instance_values,
            state_values,
            tools: self.tools.clone(),
        })
    }

    async fn write_back(&self, ctx: &CoreContext) -> Result<(), CoreError> {
        let store = ConfigStore::new(&ctx.project_path);
        store
            .write_back(
                &ctx.settings,
                &ctx.state,
                &ctx.settings.current_env,
                &ctx.instance_values,
                &ctx.state_values,
            )
            .await
    }

    /// Merge and persist a failed stage's partial result, then hand the
    /// error back
    ///
    /// If the write-back itself fails, the returned error combines both
    /// failures so the caller knows the partial progress was not saved.
    async fn persist_partial(&self, ctx: &mut CoreContext, stage_error: StageError) -> StageError {
        let Some(partial) = &stage_error.partial else {
            return stage_error;
        };
        warn!(path = %ctx.project_path.display(), "stage failed, persisting partial result");
        ctx.merge_env_result(partial);
        if let Err(write_error) = self.write_back(ctx).await {
            warn!(error = %write_error, "failed to persist partial result");
            return StageError {
                error: CoreError::PartialNotPersisted {
                    stage: Box::new(stage_error.error),
                    persist: Box::new(write_error),
                },
                partial: stage_error.partial,
            };
        }
        stage_error
    }

    async fn collect_for_stage(
        &self,
        ctx: &CoreContext,
        task: Task,
        inputs: &Inputs,
    ) -> Result<Inputs, CoreError> {
        let all_ctx = ctx.solution_all_context()?;
        let tree = compose::questions_for_lifecycle_task(
            &self.registry,
            Some(&ctx.solution),
            &all_ctx,
            task,
            inputs,
        )
        .await?;
        self.collect(tree, inputs).await
    }

    /// Run a composed tree; cancellation aborts the whole operation
    async fn collect(
        &self,
        tree: Option<QuestionNode>,
        inputs: &Inputs,
    ) -> Result<Inputs, CoreError> {
        let Some(tree) = tree else {
            return Ok(inputs.clone());
        };
        match traverse(&tree, &inputs.answers, self.tools.ui.as_ref()).await? {
            TraverseOutcome::Completed(answers) => {
                let mut effective = inputs.clone();
                effective.answers.extend_from(&answers);
                Ok(effective)
            }
            TraverseOutcome::Cancelled => Err(CoreError::UserCancelled),
        }
    }

    fn selected_solution(
        &self,
        inputs: &Inputs,
    ) -> Result<Arc<dyn forge_api::SolutionPlugin>, CoreError> {
        if let Some(name) = inputs.answers.get_str(questions::names::SOLUTION) {
            return self
                .registry
                .solution(name)
                .ok_or_else(|| CoreError::RouteNotFound {
                    namespace: name.to_string(),
                });
        }
        // Sample-based creation names no solution; with a single registered
        // solution the choice is unambiguous.
        let names = self.registry.solution_names();
        match names.as_slice() {
            [only] => self
                .registry
                .solution(only)
                .ok_or_else(|| CoreError::RouteNotFound {
                    namespace: only.clone(),
                }),
            _ => Err(CoreError::InvalidInput(
                "no solution selected".to_string(),
            )),
        }
    }

    fn bootstrap_all_context(&self, inputs: &Inputs) -> SolutionAllContext {
        let mut environments = HashMap::new();
        environments.insert(
            DEFAULT_ENV.to_string(),
            EnvMeta::new(DEFAULT_ENV, false, false),
        );
        SolutionAllContext {
            solution: SolutionContext {
                project_path: inputs.project_path.clone(),
                settings: ProjectSettings {
                    name: String::new(),
                    current_env: DEFAULT_ENV.to_string(),
                    environments,
                    solution: SolutionSettings::new("", "0.0.0"),
                },
                state: ProjectState::default(),
            },
            env: EnvMeta::new(DEFAULT_ENV, false, false),
            tokens: Arc::clone(&self.tools.tokens),
            provision_configs: HashMap::new(),
            deploy_configs: HashMap::new(),
        }
    }
}
