//! Environment management: create, remove, switch, list.

use forge_api::{CoreError, Inputs};
use forge_core::{LifecycleOrchestrator, PluginRegistry};
use forge_test_utils::{tools_with, MockSolution, ScriptedUi, StageOutcome};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn engine() -> LifecycleOrchestrator {
    engine_with(MockSolution::new("mock-solution"))
}

fn engine_with(solution: MockSolution) -> LifecycleOrchestrator {
    let registry = Arc::new(PluginRegistry::new());
    registry.register_solution(Arc::new(solution));
    LifecycleOrchestrator::new(
        tools_with(Arc::new(ScriptedUi::answering(vec![]))),
        registry,
    )
}

async fn fresh_project(engine: &LifecycleOrchestrator, dir: &Path) -> PathBuf {
    let inputs = Inputs::new(dir)
        .with_answer("scratch", json!("yes"))
        .with_answer("folder", json!(dir.to_string_lossy()))
        .with_answer("app-name", json!("myapp"));
    engine.create_project(&inputs).await.unwrap()
}

fn create_env_inputs(project: &Path, name: &str) -> Inputs {
    Inputs::new(project)
        .with_answer("env-name", json!(name))
        .with_answer("env-local", json!("false"))
        .with_answer("env-sideloading", json!("true"))
}

#[tokio::test]
async fn create_env_adds_without_switching() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let project = fresh_project(&engine, dir.path()).await;

    engine
        .create_env(&create_env_inputs(&project, "staging"))
        .await
        .unwrap();

    let mut names: Vec<_> = engine
        .list_envs(&Inputs::new(&project))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["default", "staging"]);

    let configs = engine.get_project_configs(&Inputs::new(&project)).await.unwrap();
    let settings = configs.settings.unwrap();
    assert_eq!(settings.current_env, "default");
    let staging = &settings.environments["staging"];
    assert!(!staging.local);
    assert!(staging.sideloading);
}

#[tokio::test]
async fn duplicate_create_env_fails() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let project = fresh_project(&engine, dir.path()).await;

    let err = engine
        .create_env(&create_env_inputs(&project, "default"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::EnvExists { name } if name == "default"));
}

#[tokio::test]
async fn removing_active_env_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let project = fresh_project(&engine, dir.path()).await;

    let inputs = Inputs::new(&project).with_answer("env", json!("default"));
    let err = engine.remove_env(&inputs).await.unwrap_err();
    assert!(matches!(err, CoreError::CannotRemoveActiveEnv { .. }));

    // still there
    let envs = engine.list_envs(&Inputs::new(&project)).await.unwrap();
    assert_eq!(envs.len(), 1);
}

#[tokio::test]
async fn remove_env_deletes_it() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let project = fresh_project(&engine, dir.path()).await;
    engine
        .create_env(&create_env_inputs(&project, "staging"))
        .await
        .unwrap();

    let inputs = Inputs::new(&project).with_answer("env", json!("staging"));
    engine.remove_env(&inputs).await.unwrap();

    let envs = engine.list_envs(&Inputs::new(&project)).await.unwrap();
    assert_eq!(envs.len(), 1);
    assert_eq!(envs[0].name, "default");
}

#[tokio::test]
async fn remove_unknown_env_fails() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let project = fresh_project(&engine, dir.path()).await;

    let inputs = Inputs::new(&project).with_answer("env", json!("ghost"));
    let err = engine.remove_env(&inputs).await.unwrap_err();
    assert!(matches!(err, CoreError::EnvNotFound { .. }));
}

#[tokio::test]
async fn switch_to_unknown_env_leaves_pointer_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let project = fresh_project(&engine, dir.path()).await;

    let inputs = Inputs::new(&project).with_answer("env", json!("ghost"));
    let err = engine.switch_env(&inputs).await.unwrap_err();
    assert!(matches!(err, CoreError::EnvNotFound { .. }));

    let configs = engine.get_project_configs(&Inputs::new(&project)).await.unwrap();
    assert_eq!(configs.settings.unwrap().current_env, "default");
}

#[tokio::test]
async fn switching_isolates_environment_values() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(
        MockSolution::new("mock-solution")
            .with_resource("frontend", json!({"endpoint": "{{frontend.endpoint}}"}), json!({}))
            .with_provision_outcome(StageOutcome::success_with(
                json!({"frontend.endpoint": "https://default.example.net"}),
                json!({"provision_succeeded": true}),
            )),
    );
    let project = fresh_project(&engine, dir.path()).await;
    let inputs = Inputs::new(&project);

    engine.provision_resources(&inputs).await.unwrap();
    engine
        .create_env(&create_env_inputs(&project, "staging"))
        .await
        .unwrap();

    // fresh environment starts with no accumulated values
    engine
        .switch_env(&Inputs::new(&project).with_answer("env", json!("staging")))
        .await
        .unwrap();
    let configs = engine.get_project_configs(&inputs).await.unwrap();
    assert_eq!(configs.settings.as_ref().unwrap().current_env, "staging");
    assert!(configs.resource_instance_values.is_empty());
    assert_eq!(
        configs.provision_configs["frontend"],
        json!({"endpoint": "{{frontend.endpoint}}"})
    );

    // switching back restores what default accumulated
    engine
        .switch_env(&Inputs::new(&project).with_answer("env", json!("default")))
        .await
        .unwrap();
    let configs = engine.get_project_configs(&inputs).await.unwrap();
    assert_eq!(
        configs.provision_configs["frontend"],
        json!({"endpoint": "https://default.example.net"})
    );
}
