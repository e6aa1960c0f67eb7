//! Forge Core - application lifecycle engine
//!
//! The engine that drives a project through its lifecycle:
//! - Creates projects by routing collected answers to a solution plugin
//! - Provisions, builds, deploys, and publishes per environment
//! - Composes and traverses conditional question trees
//! - Persists configuration, state, and per-environment values
//! - Serializes mutating operations per project
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_core::{DefaultSolution, LifecycleOrchestrator, PluginRegistry};
//! use forge_api::{Inputs, Tools};
//! use std::sync::Arc;
//!
//! # async fn example(tools: Tools) -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(PluginRegistry::new());
//! registry.register_solution(Arc::new(DefaultSolution::new()));
//! let engine = LifecycleOrchestrator::new(tools, registry);
//!
//! let inputs = Inputs::new("/work")
//!     .with_answer("scratch", "yes".into())
//!     .with_answer("app-name", "myapp".into());
//! let project_path = engine.create_project(&inputs).await?;
//!
//! engine.provision_resources(&Inputs::new(&project_path)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Engine modules
pub mod compose;
pub mod config_store;
pub mod context;
pub mod guard;
pub mod orchestrator;
pub mod questions;
pub mod registry;
pub mod solution;
pub mod traverse;

// Re-exports for convenience
pub use compose::{questions_for_lifecycle_task, questions_for_user_task};
pub use config_store::{deep_merge, resolve_configs, resolve_placeholders, ConfigStore};
pub use context::CoreContext;
pub use guard::{ConcurrencyGuard, ProjectLock};
pub use orchestrator::{LifecycleOrchestrator, DEFAULT_ENV};
pub use registry::{PluginRegistry, RoutedPlugin};
pub use solution::{DefaultSolution, DEFAULT_SOLUTION};
pub use traverse::{traverse, TraverseOutcome};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the lifecycle engine
    pub use crate::{
        ConfigStore, DefaultSolution, LifecycleOrchestrator, PluginRegistry, TraverseOutcome,
    };
    pub use forge_api::{Answers, CoreError, Inputs, StageError, Task, Tools};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
