// Process group launcher - long-running services, interrupted per process group
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::process::Child;
use tracing::{debug, info};

use testbed_core::domain::ServiceHandle;
use testbed_core::port::{ExecutionError, Invocation, ServiceLauncher, SignalOutcome};

use crate::command;

/// Spawns each service as the leader of a new process group.
///
/// `cargo run` forks the service binary, so the interrupt goes to the whole
/// group rather than the pid alone. Must be used inside a tokio runtime.
#[derive(Default)]
pub struct ProcessGroupLauncher {
    children: Mutex<HashMap<u32, Child>>,
}

impl ProcessGroupLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn children(&self) -> MutexGuard<'_, HashMap<u32, Child>> {
        self.children
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ServiceLauncher for ProcessGroupLauncher {
    fn launch(
        &self,
        service: &str,
        invocation: Invocation<'_>,
    ) -> Result<ServiceHandle, ExecutionError> {
        let mut cmd = command::prepare(&invocation);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| {
            ExecutionError::SpawnFailed(format!("{}: {}", invocation.command.program(), e))
        })?;
        let pid = child.id().ok_or_else(|| {
            ExecutionError::SpawnFailed(format!("{} exited before its pid was read", service))
        })?;

        debug!(service = %service, pid = %pid, command = %invocation.command, "Spawned service process group");
        self.children().insert(pid, child);
        Ok(ServiceHandle::new(service, pid))
    }

    fn interrupt(&self, handle: &ServiceHandle) -> Result<SignalOutcome, ExecutionError> {
        // The child is released here; tokio reaps it once it exits.
        let child = self.children().remove(&handle.pid());
        if let Some(mut child) = child {
            if let Ok(Some(status)) = child.try_wait() {
                info!(
                    service = %handle.name(),
                    pid = %handle.pid(),
                    exit_code = command::exit_code(status),
                    "Service leader exited before teardown"
                );
            }
        }

        // The group can outlive its leader; only ESRCH means nothing is left.
        send_interrupt(handle.pid())
    }
}

/// SIGINT to the process group led by `pid`
#[cfg(unix)]
fn send_interrupt(pid: u32) -> Result<SignalOutcome, ExecutionError> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pid)
        .map_err(|_| ExecutionError::Signal(format!("pid {} out of range", pid)))?;

    match killpg(Pid::from_raw(pgid), Signal::SIGINT) {
        Ok(()) => {
            debug!(pgid = %pgid, "Sent SIGINT to process group");
            Ok(SignalOutcome::Delivered)
        }
        Err(Errno::ESRCH) => Ok(SignalOutcome::AlreadyExited),
        Err(e) => Err(ExecutionError::Signal(format!(
            "SIGINT to process group {} failed: {}",
            pgid, e
        ))),
    }
}

/// Windows has no process groups to signal; kill the process tree instead
#[cfg(windows)]
fn send_interrupt(pid: u32) -> Result<SignalOutcome, ExecutionError> {
    use std::process::Command;

    info!(pid = %pid, "Killing process tree on Windows");
    let output = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .output()
        .map_err(|e| ExecutionError::Signal(e.to_string()))?;

    if output.status.success() {
        Ok(SignalOutcome::Delivered)
    } else {
        Err(ExecutionError::Signal(format!(
            "taskkill failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use testbed_core::domain::{CommandSpec, EnvOverrides, OutputMode};

    fn launch(
        launcher: &ProcessGroupLauncher,
        name: &str,
        command: &CommandSpec,
    ) -> Result<ServiceHandle, ExecutionError> {
        launcher.launch(
            name,
            Invocation {
                command,
                env: &EnvOverrides::new(),
                output: OutputMode::Suppressed,
                working_dir: Path::new("."),
            },
        )
    }

    #[tokio::test]
    async fn test_service_leads_its_own_process_group() {
        let launcher = ProcessGroupLauncher::new();
        let handle = launch(&launcher, "oprish", &CommandSpec::new("sleep", ["30"])).unwrap();

        let pgid = nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(handle.pid() as i32)))
            .unwrap();
        assert_eq!(pgid.as_raw(), handle.pid() as i32);

        assert_eq!(launcher.interrupt(&handle).unwrap(), SignalOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_exited_service_reports_already_exited() {
        let launcher = ProcessGroupLauncher::new();
        let command = CommandSpec::new("true", Vec::<String>::new());
        let handle = launch(&launcher, "effis", &command).unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            launcher.interrupt(&handle).unwrap(),
            SignalOutcome::AlreadyExited
        );
    }

    /// Running and not a zombie (orphans may linger unreaped under some inits)
    fn is_running(pid: i32) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), None::<Signal>).is_err() {
            return false;
        }
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .and_then(|rest| rest.split_whitespace().next())
                .map_or(true, |state| state != "Z"),
            Err(_) => true,
        }
    }

    async fn wait_until_stopped(pid: i32) -> bool {
        for _ in 0..40 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_group_member_stopped_after_leader_exits() {
        let pid_file =
            std::env::temp_dir().join(format!("testbed-member-{}.pid", std::process::id()));
        let script = format!(
            "env --default-signal=INT sleep 30 & echo $! > {}; exit 0",
            pid_file.display()
        );
        let launcher = ProcessGroupLauncher::new();
        let command = CommandSpec::new("sh", ["-c", script.as_str()]);
        let handle = launch(&launcher, "pandemonium", &command).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let member: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        std::fs::remove_file(&pid_file).unwrap();
        assert!(is_running(member));

        assert_eq!(launcher.interrupt(&handle).unwrap(), SignalOutcome::Delivered);
        assert!(
            wait_until_stopped(member).await,
            "group member {} survived teardown",
            member
        );
    }

    #[tokio::test]
    async fn test_unknown_group_is_already_exited() {
        let launcher = ProcessGroupLauncher::new();
        let handle = ServiceHandle::new("ghost", i32::MAX as u32);

        assert_eq!(
            launcher.interrupt(&handle).unwrap(),
            SignalOutcome::AlreadyExited
        );
    }

    #[tokio::test]
    async fn test_missing_binary_fails_at_launch() {
        let launcher = ProcessGroupLauncher::new();
        let result = launch(
            &launcher,
            "pandemonium",
            &CommandSpec::new("/nonexistent/pandemonium", Vec::<String>::new()),
        );

        assert!(matches!(result, Err(ExecutionError::SpawnFailed(_))));
    }
}
