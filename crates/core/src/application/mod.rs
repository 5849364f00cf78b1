// Application Layer - Lifecycle services

pub mod build;
pub mod constants;
pub mod orchestrator;
pub mod readiness;
pub mod run_config;
pub mod shutdown;
pub mod supervisor;
pub mod test_stage;

// Re-exports
pub use build::ProcessRunner;
pub use orchestrator::{Orchestrator, OrchestratorState, RunReport};
pub use readiness::{ReadinessError, ReadinessWaiter};
pub use run_config::RunConfig;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use supervisor::{ServiceSupervisor, TeardownReport};
pub use test_stage::TestStageRunner;
