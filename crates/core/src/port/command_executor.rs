// Command Executor Port
// Abstraction for running an external command to completion (build and test stages)

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CommandSpec, EnvOverrides, OutputMode, StageResult};

/// Execution errors shared by the executor and launcher ports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Signal delivery failed: {0}")]
    Signal(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// One command invocation: what to run, with which environment, where
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub command: &'a CommandSpec,
    pub env: &'a EnvOverrides,
    pub output: OutputMode,
    pub working_dir: &'a Path,
}

/// Command Executor trait
///
/// Implementations:
/// - SubprocessExecutor: spawns the command as a child process and waits for it
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command and wait for it to exit
    ///
    /// A non-zero exit is NOT an error: it is reported through `StageResult`.
    /// Dropping the returned future must stop the child process.
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the process cannot be started
    /// - ExecutionError::IoError if waiting on the process fails
    async fn run(&self, invocation: Invocation<'_>) -> Result<StageResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Recorded call to the mock executor
    #[derive(Debug, Clone)]
    pub struct RecordedRun {
        pub command: String,
        pub env: EnvOverrides,
        pub output: OutputMode,
    }

    #[derive(Debug, Clone)]
    enum Script {
        Exit(i32),
        SpawnFailure(String),
        Hang,
    }

    /// Mock Command Executor for testing
    ///
    /// Commands are matched by their display form (`cargo build -p oprish`);
    /// unscripted commands exit 0.
    #[derive(Clone, Default)]
    pub struct MockCommandExecutor {
        scripts: Arc<Mutex<HashMap<String, Script>>>,
        calls: Arc<Mutex<Vec<RecordedRun>>>,
    }

    impl MockCommandExecutor {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn exit_with(self, command: impl Into<String>, code: i32) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(command.into(), Script::Exit(code));
            self
        }
        pub fn fail_spawn(self, command: impl Into<String>, message: impl Into<String>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(command.into(), Script::SpawnFailure(message.into()));
            self
        }
        /// Command never finishes (for interrupt testing)
        pub fn hang(self, command: impl Into<String>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(command.into(), Script::Hang);
            self
        }
        pub fn calls(&self) -> Vec<RecordedRun> {
            self.calls.lock().unwrap().clone()
        }
        pub fn commands(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.command).collect()
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommandExecutor for MockCommandExecutor {
        async fn run(&self, invocation: Invocation<'_>) -> Result<StageResult, ExecutionError> {
            let command = invocation.command.to_string();
            self.calls.lock().unwrap().push(RecordedRun {
                command: command.clone(),
                env: invocation.env.clone(),
                output: invocation.output,
            });

            let script = self.scripts.lock().unwrap().get(&command).cloned();
            match script {
                None => Ok(StageResult::new(0, 1)),
                Some(Script::Exit(code)) => Ok(StageResult::new(code, 1)),
                Some(Script::SpawnFailure(msg)) => Err(ExecutionError::SpawnFailed(msg)),
                Some(Script::Hang) => std::future::pending().await,
            }
        }
    }
}
