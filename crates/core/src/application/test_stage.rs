// Test Stage Runner - workspace and integration test stages
use std::sync::Arc;
use tracing::{debug, info};

use super::run_config::RunConfig;
use crate::domain::{CommandSpec, EnvOverrides, StageKind, StageResult};
use crate::port::{CommandExecutor, ExecutionError, Invocation};

/// Runs a named test stage to completion
pub struct TestStageRunner {
    executor: Arc<dyn CommandExecutor>,
}

impl TestStageRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Run `command` as `stage`
    ///
    /// Output mode and working directory come from `config`; `env` is the
    /// stage-specific environment.
    pub async fn run(
        &self,
        stage: StageKind,
        command: &CommandSpec,
        env: &EnvOverrides,
        config: &RunConfig,
    ) -> Result<StageResult, ExecutionError> {
        match stage {
            StageKind::WorkspaceTests => info!("Testing workspace..."),
            _ => info!("Running {} tests...", stage.label().to_lowercase()),
        }

        let result = self
            .executor
            .run(Invocation {
                command,
                env,
                output: config.output,
                working_dir: &config.working_dir,
            })
            .await?;

        debug!(
            stage = %stage,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "Test stage finished"
        );
        Ok(result)
    }
}
