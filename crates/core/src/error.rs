// Central Error Type for an orchestration run

use thiserror::Error;

use crate::application::orchestrator::OrchestratorState;
use crate::domain::StageKind;

/// Fatal outcome of a run. Every variant is reported after teardown has executed.
#[derive(Error, Debug, PartialEq)]
pub enum OrchestrationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::domain::DomainError),

    #[error("Failed to compile {service} with error code {code}")]
    BuildFailed { service: String, code: i32 },

    #[error("Failed to start {service}: {reason}")]
    SpawnFailed { service: String, reason: String },

    #[error("{stage} tests failed with code {code}")]
    TestsFailed { stage: StageKind, code: i32 },

    #[error("Readiness probe target rejected: {0}")]
    ProbeTarget(String),

    #[error("Interrupted while {state}")]
    Interrupted { state: OrchestratorState },

    #[error("Execution error: {0}")]
    Execution(#[from] crate::port::ExecutionError),
}

impl OrchestrationError {
    /// Process exit code the binary should report for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestrationError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Whether re-running with streamed output would show the cause
    pub fn wants_logs_hint(&self) -> bool {
        matches!(
            self,
            OrchestrationError::BuildFailed { .. }
                | OrchestrationError::TestsFailed { .. }
                | OrchestrationError::Execution(_)
        )
    }
}

/// Result type alias using OrchestrationError
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_failure_message() {
        let err = OrchestrationError::TestsFailed {
            stage: StageKind::IntegrationTests,
            code: 2,
        };
        assert_eq!(err.to_string(), "Integration tests failed with code 2");
        assert_eq!(err.exit_code(), 1);
        assert!(err.wants_logs_hint());
    }

    #[test]
    fn test_config_error_exit_code() {
        let err = OrchestrationError::from(crate::domain::DomainError::Validation(
            "no services".to_string(),
        ));
        assert_eq!(err.exit_code(), 2);
        assert!(!err.wants_logs_hint());
    }
}
