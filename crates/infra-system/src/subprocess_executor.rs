// Subprocess executor - runs build and test commands to completion
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use testbed_core::domain::StageResult;
use testbed_core::port::{CommandExecutor, ExecutionError, Invocation, TimeProvider};

use crate::command;

/// Subprocess executor
///
/// The child is killed if the returned future is dropped, so an interrupted
/// stage does not leave a build or test process behind.
pub struct SubprocessExecutor {
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessExecutor {
    /// Create a new subprocess executor
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }
}

#[async_trait]
impl CommandExecutor for SubprocessExecutor {
    async fn run(&self, invocation: Invocation<'_>) -> Result<StageResult, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        debug!(
            command = %invocation.command,
            working_dir = %invocation.working_dir.display(),
            output = ?invocation.output,
            "Starting subprocess execution"
        );

        let mut cmd = command::prepare(&invocation);
        cmd.kill_on_drop(true);
        let mut child = cmd.spawn().map_err(|e| {
            ExecutionError::SpawnFailed(format!("{}: {}", invocation.command.program(), e))
        })?;

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::IoError(e.to_string()))?;

        let result = StageResult::new(
            command::exit_code(status),
            self.time_provider.elapsed_millis(start_time),
        );

        info!(
            command = %invocation.command,
            duration_ms = %result.duration_ms,
            exit_code = %result.exit_code,
            "Subprocess execution completed"
        );

        Ok(result)
    }
}
