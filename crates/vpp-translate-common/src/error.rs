//! Error types for translation and orchestration.

use crate::change::Operation;
use crate::path::{ConfigPath, SchemaPath};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use vpp_api::ApiError;

/// Result type for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Errors raised by translation units, the naming context and the bridge.
#[derive(Debug, Clone, Error)]
pub enum TranslateError {
    /// Configuration data is malformed or violates a model constraint.
    #[error("Invalid data at {path}: {message}")]
    Validation { path: String, message: String },

    /// VPP rejected a request, or its reply never arrived.
    #[error("VPP call {operation} failed: {cause}")]
    CallFailed {
        operation: String,
        #[source]
        cause: ApiError,
    },

    /// The unit does not implement this operation for the path.
    #[error("{operation} is not supported for {path}")]
    Unsupported { path: String, operation: Operation },

    /// No registered unit owns the path.
    #[error("No writer registered for {path}")]
    UnhandledPath { path: String },

    /// A name or handle is already mapped to a different counterpart.
    #[error("Naming conflict in {namespace}: {message}")]
    Conflict { namespace: String, message: String },

    /// A name or handle has no mapping.
    #[error("{key} not found in {namespace}")]
    NotFound { namespace: String, key: String },

    /// The durable mapping store failed.
    #[error("Mapping store {operation} failed: {message}")]
    Store { operation: String, message: String },

    /// Programming error inside the translation layer.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse classification of a [`TranslateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    CallFailed,
    Unsupported,
    UnhandledPath,
    Conflict,
    NotFound,
    Store,
    Internal,
}

impl TranslateError {
    /// Creates a validation error.
    pub fn validation(path: impl ToString, message: impl Into<String>) -> Self {
        TranslateError::Validation {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Creates a call failure for a VPP operation.
    pub fn call_failed(operation: impl Into<String>, cause: ApiError) -> Self {
        TranslateError::CallFailed {
            operation: operation.into(),
            cause,
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(path: impl ToString, operation: Operation) -> Self {
        TranslateError::Unsupported {
            path: path.to_string(),
            operation,
        }
    }

    pub fn unhandled_path(path: impl ToString) -> Self {
        TranslateError::UnhandledPath {
            path: path.to_string(),
        }
    }

    pub fn conflict(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        TranslateError::Conflict {
            namespace: namespace.into(),
            message: message.into(),
        }
    }

    pub fn not_found(namespace: impl Into<String>, key: impl ToString) -> Self {
        TranslateError::NotFound {
            namespace: namespace.into(),
            key: key.to_string(),
        }
    }

    pub fn store(operation: impl Into<String>, message: impl ToString) -> Self {
        TranslateError::Store {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TranslateError::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::Validation { .. } => ErrorKind::Validation,
            TranslateError::CallFailed { .. } => ErrorKind::CallFailed,
            TranslateError::Unsupported { .. } => ErrorKind::Unsupported,
            TranslateError::UnhandledPath { .. } => ErrorKind::UnhandledPath,
            TranslateError::Conflict { .. } => ErrorKind::Conflict,
            TranslateError::NotFound { .. } => ErrorKind::NotFound,
            TranslateError::Store { .. } => ErrorKind::Store,
            TranslateError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the VPP `retval` if VPP itself rejected the call.
    pub fn retval(&self) -> Option<i32> {
        match self {
            TranslateError::CallFailed { cause, .. } => cause.status().map(|s| s.as_raw()),
            _ => None,
        }
    }

    /// Returns true if re-applying the same change could succeed.
    ///
    /// Only lost or late replies qualify. Nothing in this crate retries on
    /// its own; this is for the caller deciding whether to resubmit.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslateError::CallFailed { cause, .. } => cause.is_retryable(),
            TranslateError::Store { .. } => true,
            _ => false,
        }
    }
}

/// Errors detected while building a [`crate::WriterRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Ordering constraints form a cycle through {path}")]
    Cycle { path: String },

    #[error("Writer already registered for {path}")]
    DuplicateWriter { path: String },

    #[error("{path} is owned by both {owner} and {claimant}")]
    OwnershipConflict {
        path: String,
        owner: String,
        claimant: String,
    },
}

/// A unit failure, tagged with where in the pipeline it happened.
#[derive(Debug, Clone)]
pub struct NodeFailure {
    /// Registry node whose unit failed.
    pub node: SchemaPath,
    /// Keyed path the unit was invoked for.
    pub path: ConfigPath,
    pub operation: Operation,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub error: TranslateError,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} failed in writer {}: {}",
            self.operation, self.path, self.node, self.error
        )
    }
}

/// Failure of a whole change-set application.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    /// The change set was refused before any unit ran.
    #[error("Change set rejected: {0}")]
    Rejected(#[source] TranslateError),

    /// A unit failed; units ordered before it have already taken effect.
    #[error("{0}")]
    Failed(Box<NodeFailure>),
}

impl ApplyError {
    /// The underlying translation error.
    pub fn error(&self) -> &TranslateError {
        match self {
            ApplyError::Rejected(error) => error,
            ApplyError::Failed(failure) => &failure.error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error().kind()
    }

    /// Node path of the failed unit, if any unit ran.
    pub fn node(&self) -> Option<&SchemaPath> {
        match self {
            ApplyError::Rejected(_) => None,
            ApplyError::Failed(failure) => Some(&failure.node),
        }
    }

    pub fn failure(&self) -> Option<&NodeFailure> {
        match self {
            ApplyError::Rejected(_) => None,
            ApplyError::Failed(failure) => Some(failure),
        }
    }
}
