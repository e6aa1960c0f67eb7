//! Operator-interaction surface
//!
//! The engine never renders anything. It hands one [`PromptRequest`] at a
//! time to a host-provided [`UserInteraction`] and interprets the response.
//! Dynamic options are already resolved by the time a request is built, so
//! prompt providers stay dumb.

use crate::error::CoreError;
use crate::question::OptionItem;
use crate::token::TokenProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Kind-specific payload of a prompt
#[derive(Debug, Clone)]
pub enum PromptKind {
    /// Free-text input
    Text {
        /// Pre-filled default
        default: Option<String>,
    },
    /// Pick exactly one option
    SingleSelect {
        /// Options, dynamic set already resolved
        options: Vec<OptionItem>,
        /// Default option id
        default: Option<String>,
    },
    /// Pick zero or more options
    MultiSelect {
        /// Options, dynamic set already resolved
        options: Vec<OptionItem>,
        /// Default option ids
        default: Vec<String>,
    },
    /// Folder or file path input
    Folder {
        /// Pre-filled default
        default: Option<String>,
    },
}

/// One question as rendered to the operator
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Answer key of the underlying question node
    pub name: String,
    /// Title to display
    pub title: String,
    /// Re-prompt reason from a failed validation, if any
    pub validation_message: Option<String>,
    /// Kind-specific payload
    pub kind: PromptKind,
}

/// Operator response to a prompt
#[derive(Debug, Clone, PartialEq)]
pub enum PromptResponse {
    /// A value was entered/selected
    Answer(Value),
    /// The operator aborted; the whole traversal is discarded
    Cancel,
}

/// Prompt provider capable of rendering one question at a time
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Render the request and return the operator's value or a cancellation
    async fn prompt(&self, request: &PromptRequest) -> Result<PromptResponse, CoreError>;
}

/// Capability handles threaded into every operation
///
/// Constructed once by the host and passed to the orchestrator explicitly;
/// there is no process-wide singleton.
#[derive(Clone)]
pub struct Tools {
    /// Prompt provider
    pub ui: Arc<dyn UserInteraction>,
    /// Token access for environment-scoped plugin calls
    pub tokens: Arc<dyn TokenProvider>,
}

impl Tools {
    /// Bundle the host-provided capability handles
    #[must_use]
    pub fn new(ui: Arc<dyn UserInteraction>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { ui, tokens }
    }
}

impl fmt::Debug for Tools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tools").finish_non_exhaustive()
    }
}
