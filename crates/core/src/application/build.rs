// Process Runner - build stage, one service at a time
use std::sync::Arc;
use tracing::{debug, info};

use super::run_config::RunConfig;
use crate::domain::{ServiceSpec, StageResult};
use crate::port::{CommandExecutor, ExecutionError, Invocation};

/// Runs each service's build command to completion
pub struct ProcessRunner {
    executor: Arc<dyn CommandExecutor>,
}

impl ProcessRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Build one service
    ///
    /// A non-zero exit code comes back as a `StageResult`; deciding that it is
    /// fatal belongs to the orchestrator.
    pub async fn build(
        &self,
        service: &ServiceSpec,
        config: &RunConfig,
    ) -> Result<StageResult, ExecutionError> {
        info!(service = %service.name(), "Compiling {}...", service.name());

        let env = config.build_env();
        let result = self
            .executor
            .run(Invocation {
                command: service.build_command(),
                env: &env,
                output: config.output,
                working_dir: &config.working_dir,
            })
            .await?;

        debug!(
            service = %service.name(),
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "Build finished"
        );
        Ok(result)
    }
}
