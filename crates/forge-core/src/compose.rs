//! Question-tree composition per lifecycle task
//!
//! The engine owns the shape of every tree: library-authored fragments from
//! [`crate::questions`] frame the tree, and plugin contributions hang off the
//! selection nodes that govern them. For project creation every registered
//! solution is queried concurrently; each contribution is gated on its
//! solution being the one selected.

use crate::questions;
use crate::registry::{PluginRegistry, RoutedPlugin};
use forge_api::{
    Capability, Condition, CoreError, Inputs, QuestionNode, ResourceContext, SolutionAllContext,
    SolutionPlugin, Task, TaskFunction,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

/// Compose the question tree for a lifecycle task
///
/// `solution` is the project's routed solution plugin; `None` only for
/// project creation, where no project exists yet. `None` in the result means
/// the task needs no input.
pub async fn questions_for_lifecycle_task(
    registry: &PluginRegistry,
    solution: Option<&Arc<dyn SolutionPlugin>>,
    ctx: &SolutionAllContext,
    task: Task,
    inputs: &Inputs,
) -> Result<Option<QuestionNode>, CoreError> {
    match task {
        Task::Create => questions_for_create(registry, ctx, inputs).await,
        Task::CreateEnv => {
            let existing = env_names(ctx);
            Ok(Some(
                QuestionNode::group()
                    .with_child(questions::env_name_question(existing))
                    .with_child(questions::env_local_question())
                    .with_child(questions::env_sideloading_question()),
            ))
        }
        Task::RemoveEnv | Task::SwitchEnv => Ok(Some(
            QuestionNode::group().with_child(questions::select_env_question(env_names(ctx))),
        )),
        Task::Provision | Task::Build | Task::Deploy | Task::Publish => match solution {
            Some(plugin) => {
                let subtree = plugin
                    .get_questions_for_lifecycle_task(ctx, task, inputs)
                    .await?;
                Ok(subtree
                    .filter(|node| !node.is_empty_contribution())
                    .map(|node| QuestionNode::group().with_child(node)))
            }
            None => Ok(None),
        },
    }
}

/// Compose the question tree for a plugin-defined user task
pub async fn questions_for_user_task(
    registry: &PluginRegistry,
    ctx: &SolutionAllContext,
    func: &TaskFunction,
    inputs: &Inputs,
) -> Result<Option<QuestionNode>, CoreError> {
    let routed =
        registry.route_for_capability(&func.namespace, Capability::GetQuestionsForUserTask)?;
    let subtree = match routed {
        RoutedPlugin::Solution(plugin) => {
            plugin.get_questions_for_user_task(ctx, func, inputs).await?
        }
        RoutedPlugin::Resource(plugin) => {
            let resource_ctx = resource_context(ctx, plugin.name());
            plugin
                .get_questions_for_user_task(&resource_ctx, func, inputs)
                .await?
        }
    };
    Ok(subtree.filter(|node| !node.is_empty_contribution()))
}

/// Project-creation tree: scratch-or-sample select at the root, with the
/// scratch branch fanning out to the registered solutions and the sample
/// branch listing the bundled samples
async fn questions_for_create(
    registry: &PluginRegistry,
    ctx: &SolutionAllContext,
    inputs: &Inputs,
) -> Result<Option<QuestionNode>, CoreError> {
    let mut names = registry.solution_names();
    names.sort();

    let plugins: Vec<_> = names
        .iter()
        .filter_map(|name| registry.solution(name))
        .collect();
    let contributions = join_all(
        plugins
            .iter()
            .map(|plugin| plugin.get_questions_for_lifecycle_task(ctx, Task::Create, inputs)),
    )
    .await;

    let mut solution_select = questions::select_solution_question(names);
    for (plugin, contribution) in plugins.iter().zip(contributions) {
        if let Some(node) = contribution? {
            if node.is_empty_contribution() {
                continue;
            }
            solution_select.push(
                node.with_condition(Condition::Equals(plugin.name().to_string())),
            );
        }
    }

    let scratch_branch = QuestionNode::group()
        .with_condition(questions::scratch_condition())
        .with_child(solution_select)
        .with_child(questions::root_folder_question())
        .with_child(questions::app_name_question());
    let sample_branch = QuestionNode::group()
        .with_condition(questions::sample_condition())
        .with_child(questions::sample_question())
        .with_child(questions::root_folder_question())
        .with_child(questions::app_name_question());

    Ok(Some(
        questions::scratch_or_sample_question()
            .with_child(scratch_branch)
            .with_child(sample_branch),
    ))
}

fn env_names(ctx: &SolutionAllContext) -> Vec<String> {
    ctx.solution.settings.environments.keys().cloned().collect()
}

/// Narrow a solution-wide slice down to one resource plugin's view
pub(crate) fn resource_context(ctx: &SolutionAllContext, resource: &str) -> ResourceContext {
    let resource_settings = ctx
        .solution
        .settings
        .solution
        .resource_settings
        .get(resource)
        .cloned()
        .unwrap_or(Value::Null);
    let resource_states = ctx
        .solution
        .state
        .values
        .get(resource)
        .cloned()
        .unwrap_or(Value::Null);
    ResourceContext {
        project_path: ctx.solution.project_path.clone(),
        settings: ctx.solution.settings.clone(),
        state: ctx.solution.state.clone(),
        resource_settings,
        resource_states,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forge_api::{
        AnonymousTokenProvider, EnvMeta, EnvResult, Json, ProjectSettings, ProjectState,
        QuestionKind, ScaffoldResult, SolutionContext, SolutionEnvContext, SolutionSettings,
        StageError,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct FixtureSolution {
        name: &'static str,
        create_subtree: Option<&'static str>,
    }

    #[async_trait]
    impl SolutionPlugin for FixtureSolution {
        fn name(&self) -> &str {
            self.name
        }

        fn display_name(&self) -> &str {
            self.name
        }

        async fn scaffold_files(
            &self,
            _ctx: &SolutionContext,
            _inputs: &Inputs,
        ) -> Result<ScaffoldResult, CoreError> {
            Ok(ScaffoldResult {
                solution: SolutionSettings::new(self.name, "1.0.0"),
                provision_templates: Default::default(),
                deploy_templates: Default::default(),
            })
        }

        async fn build_artifacts(
            &self,
            _ctx: &SolutionContext,
            _inputs: &Inputs,
        ) -> Result<Json, CoreError> {
            Ok(Json::new())
        }

        async fn provision_resources(
            &self,
            _ctx: &SolutionEnvContext,
            _inputs: &Inputs,
        ) -> Result<EnvResult, StageError> {
            Ok(EnvResult::default())
        }

        async fn deploy_artifacts(
            &self,
            _ctx: &SolutionEnvContext,
            _inputs: &Inputs,
        ) -> Result<EnvResult, StageError> {
            Ok(EnvResult::default())
        }

        async fn publish_application(
            &self,
            _ctx: &SolutionAllContext,
            _inputs: &Inputs,
        ) -> Result<EnvResult, CoreError> {
            Ok(EnvResult::default())
        }

        async fn get_questions_for_lifecycle_task(
            &self,
            _ctx: &SolutionAllContext,
            task: Task,
            _inputs: &Inputs,
        ) -> Result<Option<QuestionNode>, CoreError> {
            if task != Task::Create {
                return Ok(None);
            }
            Ok(self.create_subtree.map(|name| {
                QuestionNode::new(name, name, QuestionKind::Text { default: None })
            }))
        }
    }

    fn all_context(env_names: &[&str]) -> SolutionAllContext {
        let mut environments = HashMap::new();
        for name in env_names {
            environments.insert((*name).to_string(), EnvMeta::new(*name, false, false));
        }
        SolutionAllContext {
            solution: SolutionContext {
                project_path: PathBuf::from("/tmp/app"),
                settings: ProjectSettings {
                    name: "app".to_string(),
                    current_env: env_names.first().map_or_else(
                        || "default".to_string(),
                        |n| (*n).to_string(),
                    ),
                    environments,
                    solution: SolutionSettings::new("sol-a", "1.0.0"),
                },
                state: ProjectState::default(),
            },
            env: EnvMeta::new("default", false, false),
            tokens: Arc::new(AnonymousTokenProvider),
            provision_configs: HashMap::new(),
            deploy_configs: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn create_tree_gates_contributions_on_selected_solution() {
        let registry = PluginRegistry::new();
        registry.register_solution(Arc::new(FixtureSolution {
            name: "sol-a",
            create_subtree: Some("sol-a-question"),
        }));
        registry.register_solution(Arc::new(FixtureSolution {
            name: "sol-b",
            create_subtree: Some("sol-b-question"),
        }));

        let ctx = all_context(&["default"]);
        let root = questions_for_lifecycle_task(
            &registry,
            None,
            &ctx,
            Task::Create,
            &Inputs::default(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(root.name, questions::names::SCRATCH);
        let scratch_branch = &root.children[0];
        let solution_select = &scratch_branch.children[0];
        assert_eq!(solution_select.name, questions::names::SOLUTION);
        assert_eq!(solution_select.children.len(), 2);
        for gated in &solution_select.children {
            assert!(matches!(gated.condition, Some(Condition::Equals(_))));
        }
    }

    #[tokio::test]
    async fn create_tree_omits_empty_contributions() {
        let registry = PluginRegistry::new();
        registry.register_solution(Arc::new(FixtureSolution {
            name: "sol-a",
            create_subtree: None,
        }));

        let ctx = all_context(&["default"]);
        let root = questions_for_lifecycle_task(
            &registry,
            None,
            &ctx,
            Task::Create,
            &Inputs::default(),
        )
        .await
        .unwrap()
        .unwrap();

        let solution_select = &root.children[0].children[0];
        assert!(solution_select.children.is_empty());
    }

    #[tokio::test]
    async fn create_env_tree_has_name_and_flags() {
        let registry = PluginRegistry::new();
        let ctx = all_context(&["default", "staging"]);
        let root = questions_for_lifecycle_task(
            &registry,
            None,
            &ctx,
            Task::CreateEnv,
            &Inputs::default(),
        )
        .await
        .unwrap()
        .unwrap();

        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                questions::names::ENV_NAME,
                questions::names::ENV_LOCAL,
                questions::names::ENV_SIDELOADING
            ]
        );
    }

    #[tokio::test]
    async fn switch_env_tree_lists_environments_sorted() {
        let registry = PluginRegistry::new();
        let ctx = all_context(&["staging", "default"]);
        let root = questions_for_lifecycle_task(
            &registry,
            None,
            &ctx,
            Task::SwitchEnv,
            &Inputs::default(),
        )
        .await
        .unwrap()
        .unwrap();

        let select = &root.children[0];
        let QuestionKind::SingleSelect { options, .. } = &select.kind else {
            panic!("expected a select");
        };
        let ids: Vec<_> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["default", "staging"]);
    }

    #[tokio::test]
    async fn stage_task_without_contribution_yields_none() {
        let registry = PluginRegistry::new();
        let plugin: Arc<dyn SolutionPlugin> = Arc::new(FixtureSolution {
            name: "sol-a",
            create_subtree: None,
        });
        let ctx = all_context(&["default"]);

        let tree = questions_for_lifecycle_task(
            &registry,
            Some(&plugin),
            &ctx,
            Task::Provision,
            &Inputs::default(),
        )
        .await
        .unwrap();
        assert!(tree.is_none());
    }

    #[tokio::test]
    async fn user_task_routing_requires_capability() {
        let registry = PluginRegistry::new();
        registry.register_solution(Arc::new(FixtureSolution {
            name: "sol-a",
            create_subtree: None,
        }));
        let ctx = all_context(&["default"]);
        let func = TaskFunction::new("sol-a", "addResource");

        let err = questions_for_user_task(&registry, &ctx, &func, &Inputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CapabilityNotSupported { .. }));
    }
}
