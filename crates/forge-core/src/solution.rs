//! Built-in default solution
//!
//! A single-solution install works out of the box with this plugin: it asks
//! the capability/hosting questions, derives the active resource set from the
//! answers, and emits placeholder-bearing templates that later stages resolve
//! against the environment's accumulated values. Stage implementations here
//! record their outcome as state patches; a host with real infrastructure
//! registers its own solution instead.

use async_trait::async_trait;
use forge_api::{
    Answers, Condition, CoreError, EnvResult, Inputs, Json, OptionItem, OptionsResolver,
    QuestionKind, QuestionNode, ScaffoldResult, SolutionAllContext, SolutionContext,
    SolutionEnvContext, SolutionPlugin, SolutionSettings, StageError, Task,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Identifier of the built-in solution
pub const DEFAULT_SOLUTION: &str = "forge-solution-default";

/// Answer keys owned by the default solution
pub mod names {
    /// Capability multi-select
    pub const CAPABILITIES: &str = "capabilities";
    /// Hosting type select
    pub const HOST_TYPE: &str = "host-type";
    /// Cloud resource multi-select
    pub const CLOUD_RESOURCES: &str = "cloud-resources";
    /// Programming language select
    pub const PROGRAMMING_LANGUAGE: &str = "programming-language";
}

/// Capability option ids
pub mod capabilities {
    /// Browser tab application
    pub const TAB: &str = "Tab";
    /// Conversational bot
    pub const BOT: &str = "Bot";
    /// Messaging extension
    pub const MESSAGING_EXTENSION: &str = "MessagingExtension";
}

/// Hosting option ids
pub mod hosting {
    /// Cloud-hosted
    pub const AZURE: &str = "Azure";
    /// Client-side only
    pub const SPFX: &str = "SPFx";
}

const RESOURCE_FRONTEND: &str = "frontend";
const RESOURCE_BOT: &str = "bot";
const RESOURCE_FUNCTION: &str = "function";
const RESOURCE_SQL: &str = "sql";

/// The built-in solution plugin
#[derive(Debug, Default)]
pub struct DefaultSolution;

impl DefaultSolution {
    /// Create the built-in solution
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn create_questions() -> QuestionNode {
        let capabilities = QuestionNode::new(
            names::CAPABILITIES,
            "Select capabilities",
            QuestionKind::MultiSelect {
                options: vec![
                    OptionItem::new(capabilities::TAB, "Tab")
                        .with_detail("UI-based application embedded in the client."),
                    OptionItem::new(capabilities::BOT, "Bot")
                        .with_detail("Conversational agent."),
                    OptionItem::new(capabilities::MESSAGING_EXTENSION, "Messaging Extension")
                        .with_detail("Interactions within message composition."),
                ],
                default: vec![capabilities::TAB.to_string()],
                min_items: Some(1),
                dynamic_options: None,
            },
        );

        // Bots and messaging extensions only run cloud-hosted; a pure tab can
        // also be hosted client-side.
        let host_options: OptionsResolver = Arc::new(|answers: &Answers| {
            let selected = answers
                .get_string_list(names::CAPABILITIES)
                .unwrap_or_default();
            let cloud_only = selected.iter().any(|c| {
                c == capabilities::BOT || c == capabilities::MESSAGING_EXTENSION
            });
            let mut options = vec![OptionItem::new(hosting::AZURE, "Cloud hosting")];
            if !cloud_only {
                options.push(OptionItem::new(hosting::SPFX, "Client-side hosting"));
            }
            Ok(options)
        });
        let host_type = QuestionNode::new(
            names::HOST_TYPE,
            "Hosting type",
            QuestionKind::SingleSelect {
                options: vec![],
                default: Some(hosting::AZURE.to_string()),
                skip_single_option: true,
                dynamic_options: Some(host_options),
            },
        );

        let cloud_resources = QuestionNode::new(
            names::CLOUD_RESOURCES,
            "Additional cloud resources",
            QuestionKind::MultiSelect {
                options: vec![
                    OptionItem::new(RESOURCE_FUNCTION, "Function backend"),
                    OptionItem::new(RESOURCE_SQL, "SQL database"),
                ],
                default: vec![],
                min_items: None,
                dynamic_options: None,
            },
        )
        .with_condition(Condition::Equals(hosting::AZURE.to_string()));

        let programming_language = QuestionNode::new(
            names::PROGRAMMING_LANGUAGE,
            "Programming language",
            QuestionKind::SingleSelect {
                options: vec![
                    OptionItem::new("javascript", "JavaScript"),
                    OptionItem::new("typescript", "TypeScript"),
                ],
                default: Some("javascript".to_string()),
                skip_single_option: false,
                dynamic_options: None,
            },
        );

        QuestionNode::group().with_child(
            capabilities.with_child(
                host_type
                    .with_child(cloud_resources)
                    .with_child(programming_language),
            ),
        )
    }

    fn active_resources(answers: &Answers) -> Vec<String> {
        let selected = answers
            .get_string_list(names::CAPABILITIES)
            .unwrap_or_default();
        let cloud = answers
            .get_string_list(names::CLOUD_RESOURCES)
            .unwrap_or_default();

        let mut resources = Vec::new();
        if selected.iter().any(|c| c == capabilities::TAB) {
            resources.push(RESOURCE_FRONTEND.to_string());
        }
        if selected.iter().any(|c| {
            c == capabilities::BOT || c == capabilities::MESSAGING_EXTENSION
        }) {
            resources.push(RESOURCE_BOT.to_string());
        }
        for extra in [RESOURCE_FUNCTION, RESOURCE_SQL] {
            if cloud.iter().any(|c| c == extra) {
                resources.push(extra.to_string());
            }
        }
        resources
    }

    fn templates_for(resource: &str) -> (Value, Value) {
        match resource {
            RESOURCE_FRONTEND => (
                json!({
                    "endpoint": "{{frontend.endpoint}}",
                    "storage_name": "{{frontend.storage_name}}"
                }),
                json!({ "build_path": "tabs/build" }),
            ),
            RESOURCE_BOT => (
                json!({
                    "bot_id": "{{bot.id}}",
                    "endpoint": "{{bot.endpoint}}"
                }),
                json!({ "build_path": "bot" }),
            ),
            RESOURCE_FUNCTION => (
                json!({ "app_name": "{{function.app_name}}" }),
                json!({ "build_path": "api" }),
            ),
            RESOURCE_SQL => (
                json!({
                    "server": "{{sql.server}}",
                    "database": "{{sql.database}}"
                }),
                json!({}),
            ),
            _ => (json!({}), json!({})),
        }
    }

    fn provision_values(app_name: &str, resource: &str) -> Vec<(String, Value)> {
        match resource {
            RESOURCE_FRONTEND => vec![
                (
                    "frontend.endpoint".to_string(),
                    json!(format!("https://{app_name}.example.net")),
                ),
                (
                    "frontend.storage_name".to_string(),
                    json!(format!("{}storage", app_name.to_lowercase())),
                ),
            ],
            RESOURCE_BOT => vec![
                ("bot.id".to_string(), json!(format!("{app_name}-bot"))),
                (
                    "bot.endpoint".to_string(),
                    json!(format!("https://{app_name}-bot.example.net")),
                ),
            ],
            RESOURCE_FUNCTION => vec![(
                "function.app_name".to_string(),
                json!(format!("{app_name}-function")),
            )],
            RESOURCE_SQL => vec![
                (
                    "sql.server".to_string(),
                    json!(format!("{}.database.example.net", app_name.to_lowercase())),
                ),
                ("sql.database".to_string(), json!(app_name)),
            ],
            _ => vec![],
        }
    }
}

#[async_trait]
impl SolutionPlugin for DefaultSolution {
    fn name(&self) -> &str {
        DEFAULT_SOLUTION
    }

    fn display_name(&self) -> &str {
        "Default Solution"
    }

    async fn scaffold_files(
        &self,
        _ctx: &SolutionContext,
        inputs: &Inputs,
    ) -> Result<ScaffoldResult, CoreError> {
        let answers = &inputs.answers;
        let selected = answers
            .get_string_list(names::CAPABILITIES)
            .unwrap_or_default();
        if selected.is_empty() {
            return Err(CoreError::InvalidInput(
                "at least one capability must be selected".to_string(),
            ));
        }
        let host_type = answers
            .get_str(names::HOST_TYPE)
            .unwrap_or(hosting::AZURE)
            .to_string();
        let language = answers
            .get_str(names::PROGRAMMING_LANGUAGE)
            .unwrap_or("javascript")
            .to_string();

        let mut solution = SolutionSettings::new(DEFAULT_SOLUTION, "1.0.0");
        solution.active_resource_plugins = Self::active_resources(answers);
        solution.extra.insert("capabilities".to_string(), json!(selected));
        solution.extra.insert("host_type".to_string(), json!(host_type));
        solution
            .extra
            .insert("programming_language".to_string(), json!(language));
        if let Some(cloud) = answers.get_string_list(names::CLOUD_RESOURCES) {
            solution.extra.insert("cloud_resources".to_string(), json!(cloud));
        }

        let mut provision_templates = HashMap::new();
        let mut deploy_templates = HashMap::new();
        for resource in &solution.active_resource_plugins {
            let (provision, deploy) = Self::templates_for(resource);
            provision_templates.insert(resource.clone(), provision);
            deploy_templates.insert(resource.clone(), deploy);
        }

        Ok(ScaffoldResult {
            solution,
            provision_templates,
            deploy_templates,
        })
    }

    async fn build_artifacts(
        &self,
        _ctx: &SolutionContext,
        _inputs: &Inputs,
    ) -> Result<Json, CoreError> {
        let mut patch = Json::new();
        patch.insert("build_succeeded".to_string(), json!(true));
        Ok(patch)
    }

    async fn provision_resources(
        &self,
        ctx: &SolutionEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, StageError> {
        let app_name = &ctx.solution.settings.name;
        let mut result = EnvResult::default();
        for resource in &ctx.solution.settings.solution.active_resource_plugins {
            for (key, value) in Self::provision_values(app_name, resource) {
                result.resource_values.insert(key, value);
            }
        }
        result
            .state_values
            .insert("provision_succeeded".to_string(), json!(true));
        Ok(result)
    }

    async fn deploy_artifacts(
        &self,
        _ctx: &SolutionEnvContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, StageError> {
        let mut result = EnvResult::default();
        result
            .state_values
            .insert("deploy_succeeded".to_string(), json!(true));
        Ok(result)
    }

    async fn publish_application(
        &self,
        _ctx: &SolutionAllContext,
        _inputs: &Inputs,
    ) -> Result<EnvResult, CoreError> {
        let mut result = EnvResult::default();
        result
            .state_values
            .insert("publish_succeeded".to_string(), json!(true));
        Ok(result)
    }

    async fn get_questions_for_lifecycle_task(
        &self,
        _ctx: &SolutionAllContext,
        task: Task,
        _inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        Ok(match task {
            Task::Create => Some(Self::create_questions()),
            _ => None,
        })
    }
}
