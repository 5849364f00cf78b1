//! Testbed CLI - build, launch and test the service workspace
//!
//! Builds every service, starts them in the background, runs the workspace
//! and integration tests once the instance answers, and always stops the
//! services before exiting.

mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use testbed_core::application::constants::{LOGS_HINT, PROBE_REQUEST_TIMEOUT};
use testbed_core::application::{shutdown_channel, Orchestrator};
use testbed_core::port::id_provider::UuidProvider;
use testbed_core::port::time_provider::SystemTimeProvider;
use testbed_core::OrchestrationError;
use testbed_infra_system::{HttpReadinessProbe, ProcessGroupLauncher, SubprocessExecutor};

/// Exit code for configuration and startup errors (nothing was started)
const SETUP_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "testbed")]
#[command(about = "Build, launch and test the service workspace", long_about = None)]
#[command(version)]
struct Cli {
    /// Stream subprocess output instead of suppressing it
    #[arg(long)]
    logs: bool,

    /// Skip the workspace test stage
    #[arg(long)]
    no_workspace: bool,

    /// URL polled until the instance is reachable
    #[arg(long, env = "INSTANCE_URL")]
    instance_url: Option<String>,

    /// Service to build and launch (repeatable, order preserved)
    #[arg(long = "service", value_name = "NAME")]
    services: Vec<String>,

    /// Configuration file handed to the services
    #[arg(long, value_name = "PATH")]
    conf: Option<String>,

    /// Harness file declaring services and commands
    #[arg(long, env = "TESTBED_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory every command runs in (default: current directory)
    #[arg(long, value_name = "DIR")]
    workdir: Option<String>,

    /// Milliseconds between readiness probes
    #[arg(long, value_name = "MS")]
    probe_interval_ms: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> settings::Overrides {
        settings::Overrides {
            logs: self.logs,
            no_workspace: self.no_workspace,
            instance_url: self.instance_url.clone(),
            services: self.services.clone(),
            conf: self.conf.clone(),
            workdir: self.workdir.clone(),
            probe_interval_ms: self.probe_interval_ms,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(SETUP_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // 1. Resolve configuration
    let file = match &cli.config {
        Some(path) => settings::HarnessFile::load(path)?,
        None => settings::HarnessFile::default(),
    };
    let config = settings::resolve(&cli.overrides(), &file)?;
    let streamed = config.output.is_streamed();

    info!(
        version = testbed_core::VERSION,
        services = config.services.len(),
        workdir = %config.working_dir.display(),
        "Testbed starting"
    );

    // 2. Operator interrupt stops the active stage and triggers teardown
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping services...");
            shutdown_tx.shutdown();
        }
    });

    // 3. Setup dependencies (DI wiring)
    let probe = HttpReadinessProbe::new(PROBE_REQUEST_TIMEOUT)
        .context("Failed to build the readiness probe client")?;
    let mut orchestrator = Orchestrator::new(
        config,
        Arc::new(SubprocessExecutor::new(Arc::new(SystemTimeProvider))),
        Arc::new(ProcessGroupLauncher::new()),
        Arc::new(probe),
        Arc::new(UuidProvider),
    );

    // 4. Run the lifecycle
    match orchestrator.run(shutdown_rx).await {
        Ok(report) => {
            println!(
                "{}",
                format!(
                    "All tests passed ({} services stopped)",
                    report.teardown.signal_count()
                )
                .green()
                .bold()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", failure_banner(&e, streamed).red().bold());
            Ok(ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1)))
        }
    }
}

/// The one operator-facing line for a failed run
fn failure_banner(error: &OrchestrationError, streamed: bool) -> String {
    if error.wants_logs_hint() && !streamed {
        format!("{}. {}", error, LOGS_HINT)
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_core::domain::StageKind;

    #[test]
    fn test_banner_hints_logs_once_when_suppressed() {
        let error = OrchestrationError::TestsFailed {
            stage: StageKind::IntegrationTests,
            code: 2,
        };

        let banner = failure_banner(&error, false);

        assert_eq!(
            banner,
            format!("Integration tests failed with code 2. {}", LOGS_HINT)
        );
        assert_eq!(banner.matches(LOGS_HINT).count(), 1);
    }

    #[test]
    fn test_banner_without_hint_when_streamed() {
        let error = OrchestrationError::BuildFailed {
            service: "effis".to_string(),
            code: 101,
        };
        assert_eq!(
            failure_banner(&error, true),
            "Failed to compile effis with error code 101"
        );
    }

    #[test]
    fn test_banner_without_hint_for_interrupt() {
        let error = OrchestrationError::Interrupted {
            state: testbed_core::application::OrchestratorState::WaitingReady,
        };
        assert!(!failure_banner(&error, false).contains(LOGS_HINT));
    }
}
