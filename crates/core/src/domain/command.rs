// Command Domain - External invocations and their environment

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::error::{DomainError, Result};

/// An external command: program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `cargo <args..>`
    pub fn cargo(args: &[&str]) -> Self {
        Self::new("cargo", args.iter().copied())
    }

    /// Build from an argv list as written in a harness file
    ///
    /// # Errors
    /// DomainError::EmptyCommand if `argv` is empty or its program is blank
    pub fn from_argv(owner: &str, argv: &[String]) -> Result<Self> {
        match argv.split_first() {
            Some((program, args)) if !program.trim().is_empty() => {
                Ok(Self::new(program.clone(), args.iter().cloned()))
            }
            _ => Err(DomainError::EmptyCommand(owner.to_string())),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Where subprocess stdout/stderr go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Discarded (default)
    #[default]
    Suppressed,
    /// Inherited from the harness (`--logs`)
    Streamed,
}

impl OutputMode {
    pub fn from_logs_flag(logs: bool) -> Self {
        if logs {
            OutputMode::Streamed
        } else {
            OutputMode::Suppressed
        }
    }

    pub fn is_streamed(self) -> bool {
        self == OutputMode::Streamed
    }
}

/// Environment changes applied on top of the inherited environment.
///
/// A key is either set or removed, never both; the last call wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    set: BTreeMap<String, String>,
    removed: BTreeSet<String>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.removed.remove(&key);
        self.set.insert(key, value.into());
        self
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.set.remove(&key);
        self.removed.insert(key);
        self
    }

    /// Value this override assigns to `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.set.get(key).map(String::as_str)
    }

    pub fn is_removed(&self, key: &str) -> bool {
        self.removed.contains(key)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.set.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.removed.is_empty()
    }
}
