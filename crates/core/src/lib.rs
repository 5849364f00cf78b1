// Testbed Core - Lifecycle Logic & Ports
// NO infrastructure dependencies: processes, signals and HTTP live in infra-system

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{OrchestrationError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
