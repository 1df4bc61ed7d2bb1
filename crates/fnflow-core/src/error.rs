//! Unified Error Model
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result of a single step or of a whole pipeline run.
pub type StepResult<T> = Result<T, StepError>;

/// Every failure a step or the executor can produce.
///
/// Failures are plain data: callers branch on [`StepError::kind`] instead of
/// catching anything. The executor passes these through untouched.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StepError {
    #[error("INPUT/{message}")]
    InvalidInput { message: String },

    /// `resource` is the SKU for stock failures; `sku` is accepted when
    /// deserializing.
    #[error("UNAVAILABLE/{resource}")]
    ResourceUnavailable {
        #[serde(alias = "sku")]
        resource: String,
    },

    #[error("FAILED/{operation}: {message}")]
    OperationFailed { operation: String, message: String },

    #[error("CANCELLED/before {step}")]
    Cancelled { step: String },

    #[error("RETRY/{attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<StepError> },

    /// Caller-defined kind that does not fit the built-in taxonomy.
    /// Serialized as `custom_kind` since `kind` carries the variant tag.
    #[error("{kind}/{message}")]
    Other {
        #[serde(rename = "custom_kind")]
        kind: String,
        message: String,
    },
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn unavailable(resource: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
        }
    }

    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(step: impl Into<String>) -> Self {
        Self::Cancelled { step: step.into() }
    }

    pub fn exhausted(attempts: u32, last: StepError) -> Self {
        Self::RetriesExhausted {
            attempts,
            last: Box::new(last),
        }
    }

    pub fn other(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The variant tag, for branching without destructuring.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Transient kinds that a retry policy may reasonably try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ResourceUnavailable { .. } | Self::OperationFailed { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The innermost error, looking through `RetriesExhausted` wrappers.
    pub fn root(&self) -> &StepError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Tag of a [`StepError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    ResourceUnavailable,
    OperationFailed,
    Cancelled,
    RetriesExhausted,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::ResourceUnavailable => "ResourceUnavailable",
            ErrorKind::OperationFailed => "OperationFailed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::RetriesExhausted => "RetriesExhausted",
            ErrorKind::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Failures while loading configuration. Kept apart from [`StepError`]
/// because they happen before any pipeline exists.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG/read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG/parse: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("CONFIG/invalid: {0}")]
    Invalid(String),
}
