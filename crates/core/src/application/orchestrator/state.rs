// Orchestrator lifecycle states

use std::fmt;

/// Lifecycle state of one run.
///
/// Success path: Building → Launching → (WorkspaceTesting) → WaitingReady →
/// IntegrationTesting → Teardown → Done. Any failure goes Failed → Teardown → Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestratorState {
    Building,
    Launching,
    WorkspaceTesting,
    WaitingReady,
    IntegrationTesting,
    Failed,
    Teardown,
    Done,
}

impl OrchestratorState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(&self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;

        match (*self, next) {
            (Building, Launching)
            | (Launching, WorkspaceTesting)
            | (Launching, WaitingReady)
            | (WorkspaceTesting, WaitingReady)
            | (WaitingReady, IntegrationTesting)
            | (IntegrationTesting, Teardown)
            | (Failed, Teardown)
            | (Teardown, Done) => true,
            (Teardown | Done | Failed, Failed) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrchestratorState::Building => "building services",
            OrchestratorState::Launching => "launching services",
            OrchestratorState::WorkspaceTesting => "running workspace tests",
            OrchestratorState::WaitingReady => "waiting for the instance",
            OrchestratorState::IntegrationTesting => "running integration tests",
            OrchestratorState::Failed => "failing",
            OrchestratorState::Teardown => "tearing down",
            OrchestratorState::Done => "done",
        };
        f.write_str(text)
    }
}
