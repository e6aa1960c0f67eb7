//! Per-project serialization of mutating operations.

use async_trait::async_trait;
use forge_api::{
    CoreError, EnvResult, Inputs, Json, QuestionNode, ScaffoldResult, SolutionAllContext,
    SolutionContext, SolutionEnvContext, SolutionPlugin, SolutionSettings, StageError, Task,
};
use forge_core::{LifecycleOrchestrator, PluginRegistry};
use forge_test_utils::{tools_with, ScriptedUi};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;

/// Solution whose provision blocks until the test releases it.
struct GatedSolution {
    started: Notify,
    release: Notify,
}

impl GatedSolution {
    fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl SolutionPlugin for GatedSolution {
    fn name(&self) -> &str {
        "gated-solution"
    }

    fn display_name(&self) -> &str {
        "Gated Solution"
    }

    async fn scaffold_files(
        &self,
        _ctx: &SolutionContext,
        _inputs: &Inputs,
    ) -> Result<ScaffoldResult, CoreError> {
        Ok(ScaffoldResult {
            solution: SolutionSettings::new("gated-solution", "1.0.0"),
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
        self.started.notify_one();
        self.release.notified().await;
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
        _task: Task,
        _inputs: &Inputs,
    ) -> Result<Option<QuestionNode>, CoreError> {
        Ok(None)
    }
}

#[tokio::test]
async fn second_operation_on_busy_project_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let solution = Arc::new(GatedSolution::new());
    let registry = Arc::new(PluginRegistry::new());
    registry.register_solution(Arc::clone(&solution) as Arc<dyn SolutionPlugin>);
    let engine = Arc::new(LifecycleOrchestrator::new(
        tools_with(Arc::new(ScriptedUi::answering(vec![]))),
        registry,
    ));

    let create = Inputs::new(dir.path())
        .with_answer("scratch", json!("yes"))
        .with_answer("folder", json!(dir.path().to_string_lossy()))
        .with_answer("app-name", json!("myapp"));
    let project = engine.create_project(&create).await.unwrap();

    let background = {
        let engine = Arc::clone(&engine);
        let inputs = Inputs::new(&project);
        tokio::spawn(async move { engine.provision_resources(&inputs).await })
    };
    solution.started.notified().await;

    // first provision holds the lock
    let err = engine
        .provision_resources(&Inputs::new(&project))
        .await
        .unwrap_err();
    assert!(matches!(err.error, CoreError::Busy { .. }));
    let err = engine
        .build_artifacts(&Inputs::new(&project))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Busy { .. }));

    // distinct project paths are independent
    let other_dir = tempfile::tempdir().unwrap();
    let other_err = engine
        .build_artifacts(&Inputs::new(other_dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(other_err, CoreError::UnsupportedProject { .. }));

    solution.release.notify_one();
    background.await.unwrap().unwrap();

    // lock released; the project accepts operations again
    engine.build_artifacts(&Inputs::new(&project)).await.unwrap();
}
