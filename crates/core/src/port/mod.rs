// Port Layer - Interfaces for external dependencies

pub mod command_executor;
pub mod id_provider; // For deterministic testing
pub mod readiness_probe;
pub mod service_launcher;
pub mod time_provider;

// Re-exports
pub use command_executor::{CommandExecutor, ExecutionError, Invocation};
pub use id_provider::IdProvider;
pub use readiness_probe::{ProbeError, ReadinessProbe};
pub use service_launcher::{ServiceLauncher, SignalOutcome};
pub use time_provider::TimeProvider;
