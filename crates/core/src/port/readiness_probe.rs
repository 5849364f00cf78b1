// Readiness Probe Port
// One best-effort reachability check against the running system

use async_trait::async_trait;
use thiserror::Error;

/// Classified probe failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Expected while services start up (refused, timeout, error status)
    #[error("Not ready: {0}")]
    NotReady(String),

    /// The target itself is invalid; retrying cannot help
    #[error("Malformed probe target: {0}")]
    MalformedTarget(String),
}

impl ProbeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeError::NotReady(_))
    }
}

/// Readiness probe port
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Issue a single request to `url`
    ///
    /// # Returns
    /// Ok(()) when the target answered successfully
    async fn probe(&self, url: &str) -> Result<(), ProbeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    enum Behavior {
        /// Fail with NotReady this many more times, then succeed
        ReadyAfter(u32),
        Malformed(String),
        NeverReady,
    }

    /// Mock ReadinessProbe for testing
    #[derive(Clone)]
    pub struct MockReadinessProbe {
        behavior: Arc<Mutex<Behavior>>,
        attempts: Arc<Mutex<u32>>,
    }

    impl MockReadinessProbe {
        fn with(behavior: Behavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                attempts: Arc::new(Mutex::new(0)),
            }
        }
        pub fn ready() -> Self {
            Self::with(Behavior::ReadyAfter(0))
        }
        pub fn failing_then_ready(failures: u32) -> Self {
            Self::with(Behavior::ReadyAfter(failures))
        }
        pub fn malformed(message: impl Into<String>) -> Self {
            Self::with(Behavior::Malformed(message.into()))
        }
        pub fn never_ready() -> Self {
            Self::with(Behavior::NeverReady)
        }
        pub fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl ReadinessProbe for MockReadinessProbe {
        async fn probe(&self, _url: &str) -> Result<(), ProbeError> {
            *self.attempts.lock().unwrap() += 1;

            let mut behavior = self.behavior.lock().unwrap();
            match &mut *behavior {
                Behavior::ReadyAfter(0) => Ok(()),
                Behavior::ReadyAfter(remaining) => {
                    *remaining -= 1;
                    Err(ProbeError::NotReady("Connection refused".to_string()))
                }
                Behavior::Malformed(msg) => Err(ProbeError::MalformedTarget(msg.clone())),
                Behavior::NeverReady => Err(ProbeError::NotReady("Connection refused".to_string())),
            }
        }
    }
}
