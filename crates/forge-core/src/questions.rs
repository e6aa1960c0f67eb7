//! Library-authored question fragments
//!
//! The core contributes the questions every solution shares: application
//! name, workspace folder, solution selection, scratch-or-sample, and the
//! environment-management questions. Solution/resource plugins contribute
//! the rest through their own subtrees.

use forge_api::{
    Answers, Condition, CoreError, OptionItem, QuestionKind, QuestionNode, Validator,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Answer keys of the core question fragments
pub mod names {
    /// Application name
    pub const APP_NAME: &str = "app-name";
    /// Workspace root folder
    pub const FOLDER: &str = "folder";
    /// Solution selection
    pub const SOLUTION: &str = "solution";
    /// Scratch-or-sample selection
    pub const SCRATCH: &str = "scratch";
    /// Sample selection
    pub const SAMPLES: &str = "samples";
    /// New environment name
    pub const ENV_NAME: &str = "env-name";
    /// New environment local flag
    pub const ENV_LOCAL: &str = "env-local";
    /// New environment sideloading flag
    pub const ENV_SIDELOADING: &str = "env-sideloading";
    /// Existing environment selection
    pub const ENV: &str = "env";
}

/// Option id for scaffolding from scratch
pub const SCRATCH_YES: &str = "yes";
/// Option id for starting from a sample
pub const SCRATCH_NO: &str = "no";

static APP_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][\da-zA-Z]+$").expect("valid app name pattern"));

/// Validate an application name against the project naming rule
pub fn validate_app_name(name: &str) -> Result<(), CoreError> {
    if APP_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(
            "application name must start with a letter and can only contain letters and digits"
                .to_string(),
        ))
    }
}

fn app_name_validator() -> Validator {
    Arc::new(|value: Value, answers: Answers| {
        Box::pin(async move {
            let Some(app_name) = value.as_str().map(str::to_string) else {
                return Ok(Some("application name must be a string".to_string()));
            };
            if !APP_NAME_PATTERN.is_match(&app_name) {
                return Ok(Some(
                    "Application name must start with a letter and can only contain letters and digits."
                        .to_string(),
                ));
            }
            // Folder collision check only once the target folder is known.
            if let Some(folder) = answers.get_str(names::FOLDER) {
                let project_path = Path::new(folder).join(&app_name);
                let exists = tokio::fs::try_exists(&project_path).await.unwrap_or(false);
                if exists {
                    return Ok(Some(format!(
                        "Path exists: {}. Select a different application name.",
                        project_path.display()
                    )));
                }
            }
            Ok(None)
        })
    })
}

/// `app-name` text question with pattern and folder-collision validation
#[must_use]
pub fn app_name_question() -> QuestionNode {
    QuestionNode::new(
        names::APP_NAME,
        "Application name",
        QuestionKind::Text { default: None },
    )
    .with_validator(app_name_validator())
}

/// `folder` workspace-root question
#[must_use]
pub fn root_folder_question() -> QuestionNode {
    QuestionNode::new(
        names::FOLDER,
        "Workspace folder",
        QuestionKind::Folder { default: None },
    )
}

/// `solution` selection over the registered solution identifiers
#[must_use]
pub fn select_solution_question(solution_names: Vec<String>) -> QuestionNode {
    let options = solution_names
        .into_iter()
        .map(|name| OptionItem::new(name.clone(), name))
        .collect();
    QuestionNode::new(
        names::SOLUTION,
        "Select a solution",
        QuestionKind::SingleSelect {
            options,
            default: None,
            skip_single_option: true,
            dynamic_options: None,
        },
    )
}

/// `scratch` selection gating the scratch and sample subtrees
#[must_use]
pub fn scratch_or_sample_question() -> QuestionNode {
    QuestionNode::new(
        names::SCRATCH,
        "Create a new application",
        QuestionKind::SingleSelect {
            options: vec![
                OptionItem::new(SCRATCH_YES, "Create a new app")
                    .with_detail("Scaffold a fresh application from scratch."),
                OptionItem::new(SCRATCH_NO, "Start from a sample")
                    .with_detail("Use an existing sample as a starting point."),
            ],
            default: Some(SCRATCH_YES.to_string()),
            skip_single_option: true,
            dynamic_options: None,
        },
    )
}

/// `samples` selection listing the bundled sample projects
#[must_use]
pub fn sample_question() -> QuestionNode {
    let samples = vec![
        OptionItem::new("hello-world", "Hello World")
            .with_detail("Minimal template showing the project layout.")
            .with_data(Value::String(
                "https://github.com/example/forge-samples/archive/refs/heads/main.zip".to_string(),
            )),
        OptionItem::new("todo-list", "Todo List")
            .with_detail("Task management app with a provisioned backend.")
            .with_data(Value::String(
                "https://github.com/example/forge-samples/archive/refs/heads/main.zip".to_string(),
            )),
        OptionItem::new("share-now", "Share Now")
            .with_detail("Content sharing app across a team workspace.")
            .with_data(Value::String(
                "https://github.com/example/forge-samples/archive/refs/heads/main.zip".to_string(),
            )),
    ];
    QuestionNode::new(
        names::SAMPLES,
        "Start from a sample",
        QuestionKind::SingleSelect {
            options: samples,
            default: None,
            skip_single_option: false,
            dynamic_options: None,
        },
    )
}

/// `env-name` question for createEnv, rejecting existing names
#[must_use]
pub fn env_name_question(existing: Vec<String>) -> QuestionNode {
    let validator: Validator = Arc::new(move |value: Value, _answers: Answers| {
        let existing = existing.clone();
        Box::pin(async move {
            let Some(name) = value.as_str() else {
                return Ok(Some("environment name must be a string".to_string()));
            };
            if name.is_empty() {
                return Ok(Some("environment name must not be empty".to_string()));
            }
            if existing.iter().any(|e| e == name) {
                return Ok(Some("environment already exists".to_string()));
            }
            Ok(None)
        })
    });
    QuestionNode::new(
        names::ENV_NAME,
        "Environment name",
        QuestionKind::Text { default: None },
    )
    .with_validator(validator)
}

fn bool_select(name: &str, title: &str) -> QuestionNode {
    QuestionNode::new(
        name,
        title,
        QuestionKind::SingleSelect {
            options: vec![OptionItem::new("true", "Yes"), OptionItem::new("false", "No")],
            default: Some("false".to_string()),
            skip_single_option: false,
            dynamic_options: None,
        },
    )
}

/// `env-local` flag question for createEnv
#[must_use]
pub fn env_local_question() -> QuestionNode {
    bool_select(names::ENV_LOCAL, "Local environment?")
}

/// `env-sideloading` flag question for createEnv
#[must_use]
pub fn env_sideloading_question() -> QuestionNode {
    bool_select(names::ENV_SIDELOADING, "Enable sideloading?")
}

/// `env` selection over the existing environment names
#[must_use]
pub fn select_env_question(mut env_names: Vec<String>) -> QuestionNode {
    env_names.sort();
    let options = env_names
        .into_iter()
        .map(|name| OptionItem::new(name.clone(), name))
        .collect();
    QuestionNode::new(
        names::ENV,
        "Select an environment",
        QuestionKind::SingleSelect {
            options,
            default: None,
            skip_single_option: false,
            dynamic_options: None,
        },
    )
}

/// Condition gating the scratch subtree
#[must_use]
pub fn scratch_condition() -> Condition {
    Condition::Equals(SCRATCH_YES.to_string())
}

/// Condition gating the sample subtree
#[must_use]
pub fn sample_condition() -> Condition {
    Condition::Equals(SCRATCH_NO.to_string())
}
