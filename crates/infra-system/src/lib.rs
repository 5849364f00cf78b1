// Testbed Infrastructure - System Adapters
// Implements: CommandExecutor, ServiceLauncher, ReadinessProbe

mod command;
pub mod http_probe;
pub mod process_group_launcher;
pub mod subprocess_executor;

pub use http_probe::HttpReadinessProbe;
pub use process_group_launcher::ProcessGroupLauncher;
pub use subprocess_executor::SubprocessExecutor;
