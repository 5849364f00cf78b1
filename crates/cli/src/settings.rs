//! Run configuration resolution
//!
//! Precedence: command-line flags, then the optional harness file, then the
//! built-in defaults (`oprish`, `pandemonium`, `effis` built with cargo).
//!
//! ```toml
//! instance_url = "http://127.0.0.1:7159"
//! conf_path = "tests/Eludris.toml"
//! integration_test = ["cargo", "run", "-p", "integration-tests"]
//!
//! [[services]]
//! name = "oprish"
//!
//! [[services]]
//! name = "effis"
//! run = ["./target/debug/effis"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use testbed_core::application::RunConfig;
use testbed_core::domain::{CommandSpec, OutputMode, ServiceSpec};

/// Contents of a harness file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HarnessFile {
    pub services: Vec<ServiceEntry>,
    pub instance_url: Option<String>,
    pub conf_path: Option<String>,
    pub conf_env_var: Option<String>,
    pub probe_interval_ms: Option<u64>,
    pub workspace_test: Option<Vec<String>>,
    pub integration_test: Option<Vec<String>>,
}

/// A service declared in the harness file; missing commands default to cargo
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub build: Option<Vec<String>>,
    #[serde(default)]
    pub run: Option<Vec<String>>,
}

impl ServiceEntry {
    fn to_spec(&self) -> Result<ServiceSpec> {
        let defaults = ServiceSpec::cargo(self.name.clone());
        let build = match &self.build {
            Some(argv) => CommandSpec::from_argv(&self.name, argv)?,
            None => defaults.build_command().clone(),
        };
        let run = match &self.run {
            Some(argv) => CommandSpec::from_argv(&self.name, argv)?,
            None => defaults.run_command().clone(),
        };
        Ok(ServiceSpec::new(self.name.clone(), build, run)?)
    }
}

impl HarnessFile {
    /// Load a harness file; the format follows the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .with_context(|| format!("Failed to read harness file {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid harness file {}", path.display()))
    }
}

/// Flag values that feed the run configuration
#[derive(Debug, Default)]
pub struct Overrides {
    pub logs: bool,
    pub no_workspace: bool,
    pub instance_url: Option<String>,
    pub services: Vec<String>,
    pub conf: Option<String>,
    pub workdir: Option<String>,
    pub probe_interval_ms: Option<u64>,
}

/// Merge flags, harness file and defaults into a validated `RunConfig`
pub fn resolve(overrides: &Overrides, file: &HarnessFile) -> Result<RunConfig> {
    let mut config = RunConfig {
        output: OutputMode::from_logs_flag(overrides.logs),
        workspace_tests: !overrides.no_workspace,
        ..Default::default()
    };

    let declared = file
        .services
        .iter()
        .map(ServiceEntry::to_spec)
        .collect::<Result<Vec<_>>>()?;

    if !overrides.services.is_empty() {
        config.services = overrides
            .services
            .iter()
            .map(|name| {
                declared
                    .iter()
                    .find(|spec| spec.name() == name)
                    .cloned()
                    .unwrap_or_else(|| ServiceSpec::cargo(name.clone()))
            })
            .collect();
    } else if !declared.is_empty() {
        config.services = declared;
    }

    if let Some(url) = non_empty(&overrides.instance_url).or_else(|| non_empty(&file.instance_url)) {
        config.instance_url = url.to_string();
    }
    if let Some(conf) = overrides.conf.as_deref().or(file.conf_path.as_deref()) {
        config.conf_path = expand(conf)?;
    }
    if let Some(var) = non_empty(&file.conf_env_var) {
        config.conf_env_var = var.to_string();
    }
    if let Some(ms) = overrides.probe_interval_ms.or(file.probe_interval_ms) {
        config.probe_interval = Duration::from_millis(ms);
    }
    if let Some(argv) = &file.workspace_test {
        config.workspace_test_command = CommandSpec::from_argv("workspace tests", argv)?;
    }
    if let Some(argv) = &file.integration_test {
        config.integration_test_command = CommandSpec::from_argv("integration tests", argv)?;
    }

    config.working_dir = match overrides.workdir.as_deref() {
        Some(dir) => PathBuf::from(expand(dir)?),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    config.validate()?;
    Ok(config)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `~` and `$VAR` expansion for user-supplied paths
fn expand(path: &str) -> Result<String> {
    Ok(shellexpand::full(path)
        .with_context(|| format!("Failed to expand path {}", path))?
        .into_owned())
}
