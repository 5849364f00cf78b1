// Stage Domain - Build/test stages and their outcomes

use std::fmt;

/// A synchronous stage of the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Build,
    WorkspaceTests,
    IntegrationTests,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Build => "Build",
            StageKind::WorkspaceTests => "Workspace",
            StageKind::IntegrationTests => "Integration",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a finished build or test command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    /// Process exit code; `-N` when the process was killed by signal N
    pub exit_code: i32,
    pub duration_ms: i64,
}

impl StageResult {
    pub fn new(exit_code: i32, duration_ms: i64) -> Self {
        Self {
            exit_code,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}
