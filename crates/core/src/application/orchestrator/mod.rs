// Orchestrator - build, launch, test and always tear down

mod state;

pub use state::OrchestratorState;

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::build::ProcessRunner;
use super::readiness::{ReadinessError, ReadinessWaiter};
use super::run_config::RunConfig;
use super::shutdown::ShutdownToken;
use super::supervisor::{ServiceSupervisor, TeardownReport};
use super::test_stage::TestStageRunner;
use crate::domain::{StageKind, StageResult};
use crate::error::{OrchestrationError, Result};
use crate::port::{CommandExecutor, ExecutionError, IdProvider, ReadinessProbe, ServiceLauncher};

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    /// Services that were launched, in launch order
    pub services: Vec<String>,
    pub probe_attempts: u32,
    pub teardown: TeardownReport,
}

/// Drives one run through the lifecycle.
///
/// Builds run in declaration order and stop at the first failure. Everything
/// from the first build to the integration tests executes inside the scope of
/// a `ServiceSupervisor`, and teardown runs after that scope on every path.
pub struct Orchestrator {
    config: RunConfig,
    builder: ProcessRunner,
    tests: TestStageRunner,
    readiness: ReadinessWaiter,
    launcher: Arc<dyn ServiceLauncher>,
    id_provider: Arc<dyn IdProvider>,
    history: Vec<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(
        config: RunConfig,
        executor: Arc<dyn CommandExecutor>,
        launcher: Arc<dyn ServiceLauncher>,
        probe: Arc<dyn ReadinessProbe>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            builder: ProcessRunner::new(Arc::clone(&executor)),
            tests: TestStageRunner::new(executor),
            readiness: ReadinessWaiter::new(probe, config.probe_interval),
            launcher,
            id_provider,
            history: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// States visited by the last run, in order
    pub fn history(&self) -> &[OrchestratorState] {
        &self.history
    }

    /// Execute the full lifecycle
    ///
    /// # Errors
    /// Any stage failure, after every launched service has been signaled.
    /// Configuration errors are returned before anything is started.
    pub async fn run(&mut self, mut shutdown: ShutdownToken) -> Result<RunReport> {
        self.config.validate()?;
        self.history.clear();

        let run_id = self.id_provider.generate_id();
        let span = info_span!("run", run_id = %run_id);
        self.run_guarded(run_id, &mut shutdown).instrument(span).await
    }

    async fn run_guarded(
        &mut self,
        run_id: String,
        shutdown: &mut ShutdownToken,
    ) -> Result<RunReport> {
        info!(services = self.config.services.len(), "Starting test run");

        let mut supervisor = ServiceSupervisor::new(Arc::clone(&self.launcher));
        let outcome = self.drive(&mut supervisor, shutdown).await;
        let launched: Vec<String> = supervisor
            .handles()
            .iter()
            .map(|h| h.name().to_string())
            .collect();

        if let Err(e) = &outcome {
            self.transition(OrchestratorState::Failed);
            error!(error = %e, exit_code = e.exit_code(), "Run failed");
        }

        self.transition(OrchestratorState::Teardown);
        let teardown = supervisor.teardown();
        self.transition(OrchestratorState::Done);

        let probe_attempts = outcome?;
        info!(
            services = launched.len(),
            probe_attempts, "All tests passed"
        );
        Ok(RunReport {
            run_id,
            services: launched,
            probe_attempts,
            teardown,
        })
    }

    async fn drive(
        &mut self,
        supervisor: &mut ServiceSupervisor,
        shutdown: &mut ShutdownToken,
    ) -> Result<u32> {
        self.transition(OrchestratorState::Building);
        for service in &self.config.services {
            let result = interruptible(
                shutdown,
                OrchestratorState::Building,
                self.builder.build(service, &self.config),
            )
            .await?;

            if !result.is_success() {
                return Err(OrchestrationError::BuildFailed {
                    service: service.name().to_string(),
                    code: result.exit_code,
                });
            }
        }

        self.transition(OrchestratorState::Launching);
        for service in &self.config.services {
            if shutdown.is_shutdown() {
                return Err(OrchestrationError::Interrupted {
                    state: OrchestratorState::Launching,
                });
            }
            supervisor.launch(service, &self.config).map_err(|e| {
                OrchestrationError::SpawnFailed {
                    service: service.name().to_string(),
                    reason: e.to_string(),
                }
            })?;
        }

        if self.config.workspace_tests {
            self.transition(OrchestratorState::WorkspaceTesting);
            self.run_tests(StageKind::WorkspaceTests, shutdown).await?;
        } else {
            info!("Skipping workspace tests");
        }

        self.transition(OrchestratorState::WaitingReady);
        info!(url = %self.config.instance_url, "Waiting for the instance to come up...");
        let attempts = self
            .readiness
            .wait_until_ready(&self.config.instance_url, shutdown)
            .await
            .map_err(|e| match e {
                ReadinessError::Interrupted { .. } => OrchestrationError::Interrupted {
                    state: OrchestratorState::WaitingReady,
                },
                ReadinessError::MalformedTarget(reason) => OrchestrationError::ProbeTarget(reason),
            })?;

        self.transition(OrchestratorState::IntegrationTesting);
        self.run_tests(StageKind::IntegrationTests, shutdown).await?;

        Ok(attempts)
    }

    async fn run_tests(&self, stage: StageKind, shutdown: &mut ShutdownToken) -> Result<()> {
        let (command, env, state) = match stage {
            StageKind::WorkspaceTests => (
                &self.config.workspace_test_command,
                self.config.workspace_test_env(),
                OrchestratorState::WorkspaceTesting,
            ),
            _ => (
                &self.config.integration_test_command,
                self.config.integration_test_env(),
                OrchestratorState::IntegrationTesting,
            ),
        };

        let result = interruptible(
            shutdown,
            state,
            self.tests.run(stage, command, &env, &self.config),
        )
        .await?;

        if result.is_success() {
            Ok(())
        } else {
            Err(OrchestrationError::TestsFailed {
                stage,
                code: result.exit_code,
            })
        }
    }

    fn transition(&mut self, next: OrchestratorState) {
        if let Some(current) = self.history.last() {
            if !current.can_transition_to(next) {
                warn!(from = ?current, to = ?next, "Unexpected state transition");
            }
        }
        debug!(state = ?next, "State transition");
        self.history.push(next);
    }
}

/// Race a blocking stage against operator shutdown; the losing stage future
/// is dropped, which stops its child process.
///
/// A terminal Ctrl-C also reaches foreground children, so a stage that fails
/// after shutdown was requested counts as interrupted, not failed.
async fn interruptible<F>(
    shutdown: &mut ShutdownToken,
    state: OrchestratorState,
    stage: F,
) -> Result<StageResult>
where
    F: Future<Output = std::result::Result<StageResult, ExecutionError>>,
{
    let result = tokio::select! {
        biased;
        _ = shutdown.wait() => return Err(OrchestrationError::Interrupted { state }),
        result = stage => result?,
    };

    if !result.is_success() && shutdown.is_shutdown() {
        return Err(OrchestrationError::Interrupted { state });
    }
    Ok(result)
}
