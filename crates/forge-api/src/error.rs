//! Typed failure surface of the engine
//!
//! Every operation returns either a success value or a single typed failure;
//! nothing panics across the orchestrator boundary. Provision and deploy use
//! [`StageError`], which can carry the partial result of an interrupted
//! infrastructure operation (merged before the failure is surfaced).

use crate::types::EnvResult;
use std::path::PathBuf;

/// Engine error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// File read/write failed
    #[error("io error on {path}: {source}")]
    Io {
        /// File the operation touched
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Persisted file is malformed
    #[error("parse error on {path}: {source}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: serde_json::Error,
    },

    /// On-disk layout is not a recognized project
    #[error("not a supported project: {path}")]
    UnsupportedProject {
        /// Path that was probed
        path: PathBuf,
    },

    /// Environment name collision
    #[error("environment already exists: {name}")]
    EnvExists {
        /// Colliding name
        name: String,
    },

    /// Environment is unknown
    #[error("environment not found: {name}")]
    EnvNotFound {
        /// Requested name
        name: String,
    },

    /// The active environment cannot be removed
    #[error("cannot remove the active environment: {name}")]
    CannotRemoveActiveEnv {
        /// Active environment name
        name: String,
    },

    /// Operator aborted the question traversal
    #[error("operation cancelled by user")]
    UserCancelled,

    /// A mutating operation is already in flight for this project
    #[error("project is busy: {path}")]
    Busy {
        /// Guarded project path
        path: PathBuf,
    },

    /// No plugin registered under the first namespace segment
    #[error("no plugin found for namespace: {namespace}")]
    RouteNotFound {
        /// Full namespace as requested
        namespace: String,
    },

    /// Routed plugin does not implement the requested optional method
    #[error("plugin {plugin} does not support {capability}")]
    CapabilityNotSupported {
        /// Plugin identifier
        plugin: String,
        /// Capability name
        capability: String,
    },

    /// User-correctable input problem (invalid app name, bad folder, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Target project folder already exists
    #[error("project folder already exists: {path}")]
    ProjectFolderExists {
        /// Conflicting path
        path: PathBuf,
    },

    /// Plugin violated its contract or failed internally
    #[error("plugin error: {0}")]
    Plugin(String),

    /// A stage failed and persisting its partial result also failed
    ///
    /// The values attached to the stage failure were NOT saved; a retry
    /// starts from the last successfully persisted state.
    #[error("{stage}; partial result not persisted: {persist}")]
    PartialNotPersisted {
        /// The stage failure itself
        stage: Box<CoreError>,
        /// The write-back failure that followed
        persist: Box<CoreError>,
    },
}

impl CoreError {
    /// Wrap a file I/O failure
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a parse failure
    #[inline]
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure is correctable by the operator
    ///
    /// Internal failures (I/O, parse, routing, plugin contract violations)
    /// return `false`.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EnvExists { .. }
                | Self::EnvNotFound { .. }
                | Self::CannotRemoveActiveEnv { .. }
                | Self::UserCancelled
                | Self::InvalidInput(_)
                | Self::ProjectFolderExists { .. }
        )
    }
}

/// Failure of a provision/deploy stage
///
/// Infrastructure operations are frequently partially successful. A plugin
/// may attach the values it did manage to produce; the orchestrator merges
/// them into persisted state exactly as it would a success result, then still
/// returns this error to the caller.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct StageError {
    /// The underlying failure
    #[source]
    pub error: CoreError,
    /// Values produced before the failure, if any
    pub partial: Option<EnvResult>,
}

impl StageError {
    /// Failure with no salvageable result
    #[inline]
    #[must_use]
    pub fn new(error: CoreError) -> Self {
        Self {
            error,
            partial: None,
        }
    }

    /// Attach a partial result to the failure
    #[inline]
    #[must_use]
    pub fn with_partial(mut self, partial: EnvResult) -> Self {
        self.partial = Some(partial);
        self
    }
}

impl From<CoreError> for StageError {
    fn from(error: CoreError) -> Self {
        Self::new(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_classification() {
        assert!(CoreError::EnvExists {
            name: "dev".to_string()
        }
        .is_user_error());
        assert!(CoreError::UserCancelled.is_user_error());
        assert!(!CoreError::RouteNotFound {
            namespace: "x/y".to_string()
        }
        .is_user_error());
        assert!(!CoreError::Plugin("boom".to_string()).is_user_error());
    }

    #[test]
    fn stage_error_carries_partial() {
        let mut partial = EnvResult::default();
        partial
            .resource_values
            .insert("endpoint".to_string(), "x".into());
        let err = StageError::new(CoreError::Plugin("half done".to_string()))
            .with_partial(partial.clone());

        assert_eq!(err.partial, Some(partial));
        assert!(err.to_string().contains("half done"));
    }
}
