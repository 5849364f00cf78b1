// Domain Layer - Services, commands and stage outcomes

pub mod command;
pub mod error;
pub mod service;
pub mod stage;

// Re-exports
pub use command::{CommandSpec, EnvOverrides, OutputMode};
pub use error::DomainError;
pub use service::{ServiceHandle, ServiceSpec};
pub use stage::{StageKind, StageResult};
