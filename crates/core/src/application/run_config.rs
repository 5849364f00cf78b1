// Run Configuration - resolved once per run, immutable afterwards

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use super::constants::*;
use crate::domain::{CommandSpec, DomainError, EnvOverrides, OutputMode, ServiceSpec};

/// Everything that controls one orchestration run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Built and launched in this order
    pub services: Vec<ServiceSpec>,
    pub output: OutputMode,
    /// `false` with `--no-workspace`
    pub workspace_tests: bool,
    pub instance_url: String,
    /// Value injected into `conf_env_var` for services and later stages
    pub conf_path: String,
    pub conf_env_var: String,
    /// Every command runs from here
    pub working_dir: PathBuf,
    pub probe_interval: Duration,
    pub workspace_test_command: CommandSpec,
    pub integration_test_command: CommandSpec,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            services: DEFAULT_SERVICES.iter().map(|s| ServiceSpec::cargo(*s)).collect(),
            output: OutputMode::default(),
            workspace_tests: true,
            instance_url: DEFAULT_INSTANCE_URL.to_string(),
            conf_path: DEFAULT_CONF_PATH.to_string(),
            conf_env_var: CONF_ENV_VAR.to_string(),
            working_dir: PathBuf::from("."),
            probe_interval: READINESS_PROBE_INTERVAL,
            workspace_test_command: CommandSpec::cargo(&["test"]),
            integration_test_command: CommandSpec::cargo(&["run", "-p", INTEGRATION_TESTS_PACKAGE]),
        }
    }
}

impl RunConfig {
    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.services.is_empty() {
            return Err(DomainError::Validation(
                "At least one service must be declared".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.name()) {
                return Err(DomainError::DuplicateService(service.name().to_string()));
            }
        }

        if self.instance_url.trim().is_empty() {
            return Err(DomainError::Validation(
                "Instance URL cannot be empty".to_string(),
            ));
        }
        if self.conf_env_var.trim().is_empty() {
            return Err(DomainError::Validation(
                "Configuration variable name cannot be empty".to_string(),
            ));
        }
        if self.probe_interval.is_zero() {
            return Err(DomainError::Validation(
                "Probe interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Environment for build commands: only the RUST_LOG policy
    pub fn build_env(&self) -> EnvOverrides {
        let mut env = EnvOverrides::new();
        match self.output {
            OutputMode::Suppressed => env.remove(RUST_LOG_ENV_VAR),
            OutputMode::Streamed => env.set(RUST_LOG_ENV_VAR, STREAMED_RUST_LOG),
        };
        env
    }

    /// Environment for launched services: RUST_LOG policy plus the config path
    pub fn service_env(&self) -> EnvOverrides {
        let mut env = self.build_env();
        env.set(self.conf_env_var.clone(), self.conf_path.clone());
        env
    }

    /// Workspace tests run after launch and see the same environment as services
    pub fn workspace_test_env(&self) -> EnvOverrides {
        self.service_env()
    }

    /// Integration tests log their own crate at debug level regardless of output mode
    pub fn integration_test_env(&self) -> EnvOverrides {
        let mut env = self.service_env();
        env.set(RUST_LOG_ENV_VAR, INTEGRATION_RUST_LOG);
        env
    }
}
