// Service Domain - Declared services and their running handles

use super::command::CommandSpec;
use super::error::{DomainError, Result};

/// A service the harness builds and launches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    name: String,
    build: CommandSpec,
    run: CommandSpec,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, build: CommandSpec, run: CommandSpec) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::Validation(
                "Service name cannot be empty".to_string(),
            ));
        }
        Ok(Self { name, build, run })
    }

    /// Workspace package built with `cargo build -p` and started with `cargo run -p`
    pub fn cargo(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            build: CommandSpec::cargo(&["build", "-p", &name]),
            run: CommandSpec::cargo(&["run", "-p", &name]),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build_command(&self) -> &CommandSpec {
        &self.build
    }

    pub fn run_command(&self) -> &CommandSpec {
        &self.run
    }
}

/// A launched service: its name bound to the pid leading its process group.
///
/// Deliberately not `Clone`: the supervisor owns each handle and discards it
/// once signaled.
#[derive(Debug, PartialEq, Eq)]
pub struct ServiceHandle {
    name: String,
    pid: u32,
}

impl ServiceHandle {
    pub fn new(name: impl Into<String>, pid: u32) -> Self {
        Self {
            name: name.into(),
            pid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cargo_service_commands() {
        let spec = ServiceSpec::cargo("pandemonium");
        assert_eq!(spec.name(), "pandemonium");
        assert_eq!(spec.build_command().to_string(), "cargo build -p pandemonium");
        assert_eq!(spec.run_command().to_string(), "cargo run -p pandemonium");
    }

    #[test]
    fn test_blank_name_rejected() {
        let cmd = CommandSpec::new("true", Vec::<String>::new());
        assert!(ServiceSpec::new(" ", cmd.clone(), cmd).is_err());
    }
}
