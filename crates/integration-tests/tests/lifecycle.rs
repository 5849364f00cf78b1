//! End-to-end lifecycle tests against real processes
//!
//! Services are `sleep` processes, builds and test stages are shell one-liners
//! and the instance is a local TCP listener answering `200 OK`.
#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_test::assert_ok;

use testbed_core::application::{shutdown_channel, Orchestrator, OrchestratorState, RunConfig};
use testbed_core::domain::{CommandSpec, ServiceHandle, ServiceSpec, StageKind};
use testbed_core::port::id_provider::FixedIdProvider;
use testbed_core::port::time_provider::SystemTimeProvider;
use testbed_core::port::{ExecutionError, Invocation, ServiceLauncher, SignalOutcome};
use testbed_core::OrchestrationError;
use testbed_infra_system::{HttpReadinessProbe, ProcessGroupLauncher, SubprocessExecutor};

/// Real launcher that records which groups were interrupted and how
struct RecordingLauncher {
    inner: ProcessGroupLauncher,
    signaled: Mutex<Vec<(String, u32, SignalOutcome)>>,
}

impl RecordingLauncher {
    fn new() -> Self {
        Self {
            inner: ProcessGroupLauncher::new(),
            signaled: Mutex::new(Vec::new()),
        }
    }

    fn signaled(&self) -> Vec<(String, u32, SignalOutcome)> {
        self.signaled.lock().unwrap().clone()
    }

    fn signaled_names(&self) -> Vec<String> {
        self.signaled().into_iter().map(|(name, _, _)| name).collect()
    }
}

impl ServiceLauncher for RecordingLauncher {
    fn launch(
        &self,
        service: &str,
        invocation: Invocation<'_>,
    ) -> Result<ServiceHandle, ExecutionError> {
        self.inner.launch(service, invocation)
    }

    fn interrupt(&self, handle: &ServiceHandle) -> Result<SignalOutcome, ExecutionError> {
        let outcome = self.inner.interrupt(handle)?;
        self.signaled
            .lock()
            .unwrap()
            .push((handle.name().to_string(), handle.pid(), outcome));
        Ok(outcome)
    }
}

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", ["-c", script])
}

fn sleeping_service(name: &str) -> ServiceSpec {
    ServiceSpec::new(name, sh("exit 0"), CommandSpec::new("sleep", ["30"])).unwrap()
}

/// Serve `200 OK` to every request until the test ends
async fn spawn_instance() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            });
        }
    });

    format!("http://{}/", addr)
}

/// A URL nothing listens on
async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

/// Running and not a zombie; orphans may sit unreaped under a minimal init
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

async fn assert_stopped(pid: i32) {
    for _ in 0..40 {
        if !is_running(pid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("process {} survived teardown", pid);
}

/// Service whose leader exits at once, leaving a SIGINT-able child in its group.
/// Background jobs of `sh -c` ignore SIGINT, so the child restores the default.
fn forking_service(name: &str, pid_file: &std::path::Path) -> ServiceSpec {
    let script = format!(
        "env --default-signal=INT sleep 30 & echo $! > {}; exit 0",
        pid_file.display()
    );
    ServiceSpec::new(name, sh("exit 0"), sh(&script)).unwrap()
}

fn read_pid(pid_file: &std::path::Path) -> i32 {
    let pid = std::fs::read_to_string(pid_file).unwrap().trim().parse().unwrap();
    std::fs::remove_file(pid_file).unwrap();
    pid
}

fn config(instance_url: String) -> RunConfig {
    RunConfig {
        services: vec![
            sleeping_service("oprish"),
            sleeping_service("pandemonium"),
            sleeping_service("effis"),
        ],
        instance_url,
        working_dir: std::env::temp_dir(),
        probe_interval: Duration::from_millis(50),
        workspace_test_command: sh("exit 0"),
        integration_test_command: sh(r#"test "$RUST_LOG" = integration_tests=debug"#),
        ..Default::default()
    }
}

fn orchestrator(config: RunConfig, launcher: Arc<RecordingLauncher>) -> Orchestrator {
    Orchestrator::new(
        config,
        Arc::new(SubprocessExecutor::new(Arc::new(SystemTimeProvider))),
        launcher,
        Arc::new(HttpReadinessProbe::new(Duration::from_secs(2)).unwrap()),
        Arc::new(FixedIdProvider("lifecycle".to_string())),
    )
}

/// Full run: three services up, both test stages pass, all three stopped
#[tokio::test]
async fn test_full_run_stops_every_service() {
    let launcher = Arc::new(RecordingLauncher::new());
    let url = spawn_instance().await;
    let mut orchestrator = orchestrator(config(url), launcher.clone());
    let (_tx, token) = shutdown_channel();

    let report = assert_ok!(orchestrator.run(token).await);

    assert_eq!(report.run_id, "lifecycle");
    assert_eq!(report.services, vec!["oprish", "pandemonium", "effis"]);
    assert_eq!(report.teardown.signal_count(), 3);
    assert_eq!(launcher.signaled_names(), vec!["oprish", "pandemonium", "effis"]);
    assert!(launcher
        .signaled()
        .iter()
        .all(|(_, _, outcome)| *outcome == SignalOutcome::Delivered));
    assert_eq!(orchestrator.history().last(), Some(&OrchestratorState::Done));

    for (_, pid, _) in launcher.signaled() {
        assert_stopped(pid as i32).await;
    }
}

/// Integration failure keeps its exit code and still stops the services
#[tokio::test]
async fn test_integration_failure_code_propagates() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut config = config(spawn_instance().await);
    config.integration_test_command = sh("exit 2");
    let mut orchestrator = orchestrator(config, launcher.clone());
    let (_tx, token) = shutdown_channel();

    let err = orchestrator.run(token).await.unwrap_err();

    assert_eq!(
        err,
        OrchestrationError::TestsFailed {
            stage: StageKind::IntegrationTests,
            code: 2
        }
    );
    assert_eq!(err.to_string(), "Integration tests failed with code 2");
    assert_eq!(launcher.signaled_names(), vec!["oprish", "pandemonium", "effis"]);
}

/// A failed build stops the run before anything is launched
#[tokio::test]
async fn test_build_failure_launches_nothing() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut config = config(spawn_instance().await);
    config.services[1] =
        ServiceSpec::new("pandemonium", sh("exit 101"), CommandSpec::new("sleep", ["30"])).unwrap();
    let mut orchestrator = orchestrator(config, launcher.clone());
    let (_tx, token) = shutdown_channel();

    let err = orchestrator.run(token).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to compile pandemonium with error code 101"
    );
    assert!(launcher.signaled().is_empty());
}

/// A service binary that cannot start is reported, earlier services are stopped
#[tokio::test]
async fn test_spawn_failure_stops_earlier_services() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut config = config(spawn_instance().await);
    config.services[2] = ServiceSpec::new(
        "effis",
        sh("exit 0"),
        CommandSpec::new("/nonexistent/effis", Vec::<String>::new()),
    )
    .unwrap();
    let mut orchestrator = orchestrator(config, launcher.clone());
    let (_tx, token) = shutdown_channel();

    let err = orchestrator.run(token).await.unwrap_err();

    assert!(matches!(err, OrchestrationError::SpawnFailed { ref service, .. } if service == "effis"));
    assert_eq!(launcher.signaled_names(), vec!["oprish", "pandemonium"]);
}

/// Interrupt while the instance never answers: teardown still happens
#[tokio::test]
async fn test_interrupt_while_waiting_for_instance() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut config = config(closed_url().await);
    config.workspace_tests = false;
    let mut orchestrator = orchestrator(config, launcher.clone());
    let (tx, token) = shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        tx.shutdown();
    });

    let err = orchestrator.run(token).await.unwrap_err();

    assert_eq!(
        err,
        OrchestrationError::Interrupted {
            state: OrchestratorState::WaitingReady
        }
    );
    assert_eq!(launcher.signaled_names(), vec!["oprish", "pandemonium", "effis"]);
    assert!(!orchestrator
        .history()
        .contains(&OrchestratorState::WorkspaceTesting));
}

/// A service that exits on its own is reported as already exited at teardown;
/// a leader that exits while its group keeps running still gets the group stopped
#[tokio::test]
async fn test_service_exiting_early_is_not_an_error() {
    let launcher = Arc::new(RecordingLauncher::new());
    let pid_file =
        std::env::temp_dir().join(format!("testbed-effis-{}.pid", std::process::id()));
    let mut config = config(spawn_instance().await);
    config.services = vec![
        ServiceSpec::new("oprish", sh("exit 0"), sh("exit 0")).unwrap(),
        forking_service("effis", &pid_file),
    ];
    config.workspace_test_command = sh("sleep 0.5");
    let mut orchestrator = orchestrator(config, launcher.clone());
    let (_tx, token) = shutdown_channel();

    let report = assert_ok!(orchestrator.run(token).await);

    assert_eq!(report.teardown.already_exited, vec!["oprish"]);
    let signaled = launcher.signaled();
    assert_eq!(signaled[0].2, SignalOutcome::AlreadyExited);
    assert_eq!(signaled[1].0, "effis");
    assert_eq!(signaled[1].2, SignalOutcome::Delivered);
    assert_stopped(read_pid(&pid_file)).await;
}

/// Every launched pid and every forked group member is gone after a failed run
#[tokio::test]
async fn test_no_process_survives_failed_run() {
    let launcher = Arc::new(RecordingLauncher::new());
    let pid_file =
        std::env::temp_dir().join(format!("testbed-member-{}.pid", std::process::id()));
    let mut config = config(spawn_instance().await);
    config.services[1] = forking_service("pandemonium", &pid_file);
    config.workspace_test_command = sh("sleep 0.5");
    config.integration_test_command = sh("exit 1");
    let mut orchestrator = orchestrator(config, launcher.clone());
    let (_tx, token) = shutdown_channel();

    let err = orchestrator.run(token).await.unwrap_err();

    assert_eq!(err.to_string(), "Integration tests failed with code 1");
    let signaled = launcher.signaled();
    assert_eq!(signaled.len(), 3);
    for (_, pid, _) in &signaled {
        assert_stopped(*pid as i32).await;
    }
    assert_stopped(read_pid(&pid_file)).await;
}
