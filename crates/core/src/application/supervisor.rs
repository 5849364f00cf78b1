// Service Supervisor - owns every launched process handle until teardown
use std::sync::Arc;
use tracing::{info, warn};

use super::run_config::RunConfig;
use crate::domain::{ServiceHandle, ServiceSpec};
use crate::port::{ExecutionError, Invocation, ServiceLauncher, SignalOutcome};

/// What teardown did, in signal order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    /// Every handle that was signaled (or found already exited), launch order
    pub stopped: Vec<String>,
    pub already_exited: Vec<String>,
    /// Handles whose signal could not be delivered, with the reason
    pub failed: Vec<(String, String)>,
}

impl TeardownReport {
    pub fn signal_count(&self) -> usize {
        self.stopped.len() + self.failed.len()
    }
}

/// Launches services and guarantees each one is interrupted exactly once.
///
/// Teardown runs either through an explicit `teardown()` call or, as a last
/// resort, when the supervisor is dropped with live handles (early return,
/// cancelled future, panic).
pub struct ServiceSupervisor {
    launcher: Arc<dyn ServiceLauncher>,
    handles: Vec<ServiceHandle>,
}

impl ServiceSupervisor {
    pub fn new(launcher: Arc<dyn ServiceLauncher>) -> Self {
        Self {
            launcher,
            handles: Vec::new(),
        }
    }

    /// Spawn `service` and record its handle; returns the pid without
    /// waiting for readiness
    pub fn launch(
        &mut self,
        service: &ServiceSpec,
        config: &RunConfig,
    ) -> Result<u32, ExecutionError> {
        info!(service = %service.name(), "Starting {}...", service.name());

        let env = config.service_env();
        let handle = self.launcher.launch(
            service.name(),
            Invocation {
                command: service.run_command(),
                env: &env,
                output: config.output,
                working_dir: &config.working_dir,
            },
        )?;

        let pid = handle.pid();
        info!(service = %handle.name(), pid, "Service launched");
        self.handles.push(handle);
        Ok(pid)
    }

    /// Live handles in launch order
    pub fn handles(&self) -> &[ServiceHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Interrupt every recorded service, first launched first, and discard
    /// the handles. A second call finds nothing left and does nothing.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        for handle in self.handles.drain(..) {
            info!(service = %handle.name(), pid = handle.pid(), "Stopping {}...", handle.name());

            match self.launcher.interrupt(&handle) {
                Ok(SignalOutcome::Delivered) => {
                    report.stopped.push(handle.name().to_string());
                }
                Ok(SignalOutcome::AlreadyExited) => {
                    warn!(service = %handle.name(), pid = handle.pid(), "Service had already exited");
                    report.stopped.push(handle.name().to_string());
                    report.already_exited.push(handle.name().to_string());
                }
                Err(e) => {
                    warn!(service = %handle.name(), pid = handle.pid(), error = %e, "Failed to stop service");
                    report.failed.push((handle.name().to_string(), e.to_string()));
                }
            }
        }

        report
    }
}

impl Drop for ServiceSupervisor {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!(
                live = self.handles.len(),
                "Supervisor dropped with live services, tearing down"
            );
            self.teardown();
        }
    }
}
