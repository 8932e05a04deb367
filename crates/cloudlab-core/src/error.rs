//! Provisioning error types

use crate::resource::ResourceKind;
use thiserror::Error;

/// Errors raised by any provisioning step.
///
/// Every variant is fatal for the running flow. Non-fatal conditions
/// (a missing upload bucket, for example) are reported through
/// [`crate::report::Reporter::advisory`] instead of being returned.
#[derive(Error, Debug)]
pub enum LabError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Connectivity failure: {0}")]
    ConnectivityFailure(String),

    #[error("{target} did not become ready after {attempts} attempts")]
    ReadinessTimeout { target: String, attempts: u32 },

    #[error("Authentication failed {attempts} times; giving up")]
    AuthExhausted { attempts: u32 },

    #[error("Failed to create {kind} '{id}': {reason}")]
    ResourceCreationFailure {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    #[error("{0} not found on PATH")]
    ToolNotFound(String),

    #[error("{program} exited with status {status:?}: {stderr}")]
    CommandFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error class used when reporting a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ConfigurationMissing,
    ConnectivityFailure,
    AuthExhausted,
    ResourceCreationFailure,
    Internal,
}

impl LabError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LabError::ConfigurationMissing(_) => ErrorCategory::ConfigurationMissing,
            LabError::ConnectivityFailure(_) | LabError::ReadinessTimeout { .. } => {
                ErrorCategory::ConnectivityFailure
            }
            LabError::AuthExhausted { .. } => ErrorCategory::AuthExhausted,
            LabError::ResourceCreationFailure { .. } | LabError::CommandFailed { .. } => {
                ErrorCategory::ResourceCreationFailure
            }
            LabError::ToolNotFound(_) | LabError::Api(_) | LabError::Io(_) | LabError::Json(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// True for errors that mean the remote side could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        self.category() == ErrorCategory::ConnectivityFailure
    }
}

pub type Result<T> = std::result::Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_timeout_is_connectivity() {
        let err = LabError::ReadinessTimeout {
            target: "http://127.0.0.1:8200/v1/sys/health".to_string(),
            attempts: 30,
        };
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("30 attempts"));
    }

    #[test]
    fn test_creation_failure_message() {
        let err = LabError::ResourceCreationFailure {
            kind: ResourceKind::AuthMethod,
            id: "userpass".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::ResourceCreationFailure);
        assert_eq!(
            err.to_string(),
            "Failed to create auth method 'userpass': permission denied"
        );
    }
}
