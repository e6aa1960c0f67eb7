//! Testing utilities for the Forge workspace
//!
//! Shared prompt scripts, mock plugins, and on-disk project fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use forge_api::{
    AnonymousTokenProvider, Capability, CoreError, EnvMeta, EnvResult, Inputs, Json, OptionItem,
    ProjectSettings, PromptKind, PromptRequest, PromptResponse, QuestionNode, ScaffoldResult,
    SolutionAllContext, SolutionContext, SolutionEnvContext, SolutionPlugin, SolutionSettings,
    StageError, Task, TaskFunction, Tools, UserInteraction, CONFIG_FOLDER,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Prompt provider replaying a fixed script of responses, recording every
/// request it receives.
pub struct ScriptedUi {
    script: Mutex<VecDeque<PromptResponse>>,
    requests: Mutex<Vec<PromptRequest>>,
}

impl ScriptedUi {
    pub fn new(responses: Vec<PromptResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script that answers each prompt with the given values in order
    pub fn answering(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(PromptResponse::Answer).collect())
    }

    /// Script that cancels the first prompt
    pub fn cancelling() -> Self {
        Self::new(vec![PromptResponse::Cancel])
    }

    /// Names of the questions prompted so far, in order
    pub fn prompted_names(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn prompt_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl UserInteraction for ScriptedUi {
    async fn prompt(&self, request: &PromptRequest) -> Result<PromptResponse, CoreError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CoreError::Plugin(format!("prompt script exhausted at '{}'", request.name)))
    }
}

/// Prompt provider that accepts the default of every prompt, or the first
/// option when no default exists.
pub struct AcceptDefaultsUi;

#[async_trait]
impl UserInteraction for AcceptDefaultsUi {
    async fn prompt(&self, request: &PromptRequest) -> Result<PromptResponse, CoreError> {
        let value = match &request.kind {
            PromptKind::Text { default } | PromptKind::Folder { default } => {
                Value::String(default.clone().unwrap_or_default())
            }
            PromptKind::SingleSelect { options, default } => Value::String(
                default
                    .clone()
                    .or_else(|| options.first().map(|o| o.id.clone()))
                    .unwrap_or_default(),
            ),
            PromptKind::MultiSelect { options, default } => {
                if default.is_empty() {
                    json!(options.first().map(|o| o.id.clone()).into_iter().collect::<Vec<_>>())
                } else {
                    json!(default)
                }
            }
        };
        Ok(PromptResponse::Answer(value))
    }
}

/// Tools over a given prompt provider and the anonymous token provider
pub fn tools_with(ui: Arc<dyn UserInteraction>) -> Tools {
    Tools::new(ui, Arc::new(AnonymousTokenProvider))
}

/// Canned outcome of a mocked provision/deploy stage
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Success(EnvResult),
    Fail {
        message: String,
        partial: Option<EnvResult>,
    },
}

impl StageOutcome {
    pub fn success_with(resource_values: Value, state_values: Value) -> Self {
        Self::Success(env_result(resource_values, state_values))
    }

    fn to_result(&self) -> Result<EnvResult, StageError> {
        match self {
            Self::Success(result) => Ok(result.clone()),
            Self::Fail { message, partial } => {
                let error = StageError::new(CoreError::Plugin(message.clone()));
                Err(match partial {
                    Some(partial) => error.with_partial(partial.clone()),
                    None => error,
                })
            }
        }
    }
}

/// Build an [`EnvResult`] from two JSON object literals
pub fn env_result(resource_values: Value, state_values: Value) -> EnvResult {
    EnvResult {
        resource_values: as_object(resource_values),
        state_values: as_object(state_values),
    }
}

fn as_object(value: Value) -> Json {
    value.as_object().cloned().unwrap_or_default()
}

/// Configurable solution plugin recording every lifecycle call it receives
pub struct MockSolution {
    name: String,
    resources: Vec<String>,
    provision_templates: HashMap<String, Value>,
    deploy_templates: HashMap<String, Value>,
    provision: StageOutcome,
    deploy: StageOutcome,
    create_questions: Option<QuestionNode>,
    user_tasks: bool,
    calls: Mutex<Vec<String>>,
}

impl MockSolution {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            provision_templates: HashMap::new(),
            deploy_templates: HashMap::new(),
            provision: StageOutcome::Success(EnvResult::default()),
            deploy: StageOutcome::Success(EnvResult::default()),
            create_questions: None,
            user_tasks: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Declare an active resource plugin with its scaffolded template pair
    pub fn with_resource(mut self, name: &str, provision: Value, deploy: Value) -> Self {
        self.resources.push(name.to_string());
        self.provision_templates.insert(name.to_string(), provision);
        self.deploy_templates.insert(name.to_string(), deploy);
        self
    }

    pub fn with_provision_outcome(mut self, outcome: StageOutcome) -> Self {
        self.provision = outcome;
        self
    }

    pub fn with_deploy_outcome(mut self, outcome: StageOutcome) -> Self {
        self.deploy = outcome;
        self
    }

    pub fn with_create_questions(mut self, subtree: QuestionNode) -> Self {
        self.create_questions = Some(subtree);
        self
    }

    pub fn with_user_tasks(mut self) -> Self {
        self.user_tasks = true;
        self
    }

    /// Lifecycle methods invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &str) {
        self.calls.lock().unwrap().push(method.to_string());
    }
}

#[async_trait]
impl SolutionPlugin for MockSolution {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        "Mock Solution"
    }

    async fn scaffold_files(
        &self,
        _ctx: &SolutionContext,
        _inputs: &Inputs,
    ) -> Result<ScaffoldResult, CoreError> {
        self.record("scaffold_files");
        let mut solution = SolutionSettings::new(&self.name, "1.0.0");
        solution.active_resource_plugins = self.resources.clone();
        Ok(ScaffoldResult {
            solution,
            provision_templates: self.provision_templates.clone(),
            deploy_templates: self.deploy_templates.clone(),
        })
    }

    async fn build_artifacts(
        &self,
        _ctx: &SolutionContext,
        _inputs: &Inputs,
    ) -> Result<Json, CoreError> {
        self.record("build_artifacts");
        Ok(as_object(json!({"build_succeeded": true})))
    }

    async fn provision_resources(
        &self,
        _ctx: &SolutionEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, StageError> {
        self.record("provision_resources");
        self.provision.to_result()
    }

    async fn deploy_artifacts(
        &self,
        _ctx: &SolutionEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, StageError> {
        self.record("deploy_artifacts");
        self.deploy.to_result()
    }

    async fn publish_application(
        &self,
        _ctx: &SolutionAllContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, CoreError> {
        self.record("publish_application");
        Ok(env_result(json!({}), json!({"publish_succeeded": true})))
    }

    async fn get_questions_for_lifecycle_task(
        &self,
        _ctx: &SolutionAllContext,
        task: Task,
        _inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        Ok(match task {
            Task::Create => self.create_questions.clone(),
            _ => None,
        })
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::GetQuestionsForUserTask | Capability::ExecuteUserTask => self.user_tasks,
            _ => true,
        }
    }

    async fn execute_user_task(
        &self,
        _ctx: &SolutionAllContext,
        func: &TaskFunction,
        _inputs: &Inputs,
    ) -> Result<Value, CoreError> {
        if !self.user_tasks {
            return Err(CoreError::CapabilityNotSupported {
                plugin: self.name.clone(),
                capability: Capability::ExecuteUserTask.as_str().to_string(),
            });
        }
        self.record("execute_user_task");
        Ok(json!({"executed": func.method}))
    }
}

/// A select question with static string options
pub fn select_question(name: &str, options: &[&str]) -> QuestionNode {
    QuestionNode::new(
        name,
        name,
        forge_api::QuestionKind::SingleSelect {
            options: options.iter().map(|o| OptionItem::new(*o, *o)).collect(),
            default: None,
            skip_single_option: false,
            dynamic_options: None,
        },
    )
}

/// Write a minimal on-disk project and return its root path
///
/// Produces `settings.json` with a single `default` environment, an empty
/// `state.json`, and one `{{<resource>.endpoint}}` provision template per
/// resource.
pub fn write_project(dir: &Path, app_name: &str, solution: &str, resources: &[&str]) -> PathBuf {
    let project_path = dir.join(app_name);
    let config_dir = project_path.join(CONFIG_FOLDER);
    std::fs::create_dir_all(&config_dir).unwrap();

    let mut environments = std::collections::HashMap::new();
    environments.insert("default".to_string(), EnvMeta::new("default", false, false));
    let mut solution_settings = SolutionSettings::new(solution, "1.0.0");
    solution_settings.active_resource_plugins =
        resources.iter().map(|r| (*r).to_string()).collect();
    let settings = ProjectSettings {
        name: app_name.to_string(),
        current_env: "default".to_string(),
        environments,
        solution: solution_settings,
    };

    write_json(&config_dir.join("settings.json"), &json!(settings));
    write_json(&config_dir.join("state.json"), &json!({}));
    for resource in resources {
        write_json(
            &config_dir.join(format!("{resource}.provision.tpl.json")),
            &json!({ "endpoint": format!("{{{{{resource}.endpoint}}}}") }),
        );
        write_json(&config_dir.join(format!("{resource}.deploy.tpl.json")), &json!({}));
    }
    project_path
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}
