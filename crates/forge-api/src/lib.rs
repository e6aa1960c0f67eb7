//! Forge API
//!
//! Contracts shared between the lifecycle orchestration engine and its
//! pluggable units:
//!
//! - [`ProjectSettings`] / [`ProjectState`]: the persisted project model
//! - [`SolutionPlugin`] / [`ResourcePlugin`]: the plugin lifecycle traits
//! - [`QuestionNode`]: the conditional question tree collected before a stage
//! - [`UserInteraction`]: the prompt provider rendered by the host, not here
//! - [`CoreError`] / [`StageError`]: the typed failure surface
//!
//! The engine itself lives in `forge-core`; this crate is dependency-light on
//! purpose so that out-of-tree plugins only compile against the contracts.

mod error;
mod plugin;
mod question;
mod token;
mod types;
mod ui;

pub use error::{CoreError, StageError};
pub use plugin::{
    Capability, ResourceContext, ResourceEnvContext, ResourcePlugin, ResourceScaffoldResult,
    ScaffoldResult, SolutionAllContext, SolutionContext, SolutionEnvContext, SolutionPlugin,
    TaskFunction,
};
pub use question::{
    Answers, Condition, OptionItem, OptionsResolver, QuestionKind, QuestionNode, Validator,
    ValueFunction,
};
pub use token::{AnonymousTokenProvider, TokenProvider};
pub use types::{
    EnvMeta, EnvResult, Inputs, Json, ProjectConfigs, ProjectSettings, ProjectState,
    SolutionSettings, Task, CONFIG_FOLDER,
};
pub use ui::{PromptKind, PromptRequest, PromptResponse, Tools, UserInteraction};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
