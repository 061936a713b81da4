// Copyright 2025 Cowboy AI, LLC.

//! Error types for repository composition and dispatch

use crate::fragment::Fragment;
use thiserror::Error;

/// Errors that can occur while composing or invoking a repository
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A repository method resolved to a fragment without an implementation
    #[error("{message}")]
    FragmentNotImplemented {
        /// Detail message
        message: String,
        /// Repository interface the method was invoked through
        repository_interface: String,
        /// The offending fragment
        fragment: Box<Fragment>,
    },

    /// The repository could not be created from its configuration
    #[error("Repository creation failed for {repository_interface}: {message}")]
    RepositoryCreation {
        /// Detail message
        message: String,
        /// Repository interface that failed to be created
        repository_interface: String,
    },

    /// An argument did not satisfy the operation's contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was called in a state that does not allow it
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The method is not part of the repository's surface
    #[error("Method {method} is not declared by any fragment of {repository_interface}")]
    MethodNotFound {
        /// Repository interface that was searched
        repository_interface: String,
        /// The method signature that was looked up
        method: String,
    },

    /// A fragment implementation failed while handling a call
    #[error("Invocation of {method} failed: {reason}")]
    InvocationFailed {
        /// The method signature being invoked
        method: String,
        /// Reason reported by the implementation
        reason: String,
    },

    /// A line of an external registration file could not be parsed
    #[error("Invalid registration at line {line}: {reason}")]
    InvalidRegistration {
        /// 1-based line number of the offending entry
        line: usize,
        /// Why the entry was rejected
        reason: String,
    },

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

impl RepositoryError {
    /// Create a fragment-not-implemented error for `fragment`
    pub fn fragment_not_implemented(
        repository_interface: impl Into<String>,
        fragment: Fragment,
    ) -> Self {
        let repository_interface = repository_interface.into();
        RepositoryError::FragmentNotImplemented {
            message: format!(
                "Fragment {} used in {} has no implementation",
                fragment.contract().name(),
                repository_interface
            ),
            repository_interface,
            fragment: Box::new(fragment),
        }
    }

    /// Check if this error signals a wiring defect rather than a runtime failure
    pub fn is_repository_creation_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::FragmentNotImplemented { .. }
                | RepositoryError::RepositoryCreation { .. }
        )
    }

    /// Check if this is an illegal state error
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, RepositoryError::IllegalState(_))
    }

    /// The repository interface this error is attached to, if any
    pub fn repository_interface(&self) -> Option<&str> {
        match self {
            RepositoryError::FragmentNotImplemented {
                repository_interface,
                ..
            }
            | RepositoryError::RepositoryCreation {
                repository_interface,
                ..
            }
            | RepositoryError::MethodNotFound {
                repository_interface,
                ..
            } => Some(repository_interface),
            _ => None,
        }
    }

    /// The unimplemented fragment carried by a `FragmentNotImplemented` error
    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            RepositoryError::FragmentNotImplemented { fragment, .. } => Some(fragment),
            _ => None,
        }
    }
}
