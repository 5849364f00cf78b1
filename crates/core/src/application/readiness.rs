// Readiness Waiter - blocks until the launched system answers
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use super::shutdown::ShutdownToken;
use crate::port::ReadinessProbe;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("Readiness wait interrupted after {attempts} attempts")]
    Interrupted { attempts: u32 },

    #[error("{0}")]
    MalformedTarget(String),
}

/// Polls the probe at a fixed interval with no attempt limit; only the
/// shutdown token ends a wait on an instance that never comes up.
pub struct ReadinessWaiter {
    probe: Arc<dyn ReadinessProbe>,
    interval: Duration,
}

impl ReadinessWaiter {
    pub fn new(probe: Arc<dyn ReadinessProbe>, interval: Duration) -> Self {
        Self { probe, interval }
    }

    /// Block until `url` answers; returns the number of attempts made
    ///
    /// # Errors
    /// - ReadinessError::MalformedTarget if the probe rejects the target itself
    /// - ReadinessError::Interrupted if `shutdown` fires first
    pub async fn wait_until_ready(
        &self,
        url: &str,
        shutdown: &mut ShutdownToken,
    ) -> Result<u32, ReadinessError> {
        let mut attempts: u32 = 0;

        loop {
            if shutdown.is_shutdown() {
                return Err(ReadinessError::Interrupted { attempts });
            }
            attempts = attempts.saturating_add(1);

            let outcome = tokio::select! {
                biased;
                _ = shutdown.wait() => return Err(ReadinessError::Interrupted { attempts }),
                outcome = self.probe.probe(url) => outcome,
            };

            match outcome {
                Ok(()) => {
                    info!(url = %url, attempts, "Instance is reachable");
                    return Ok(attempts);
                }
                Err(e) if e.is_retryable() => {
                    debug!(url = %url, attempts, reason = %e, "Instance not ready yet");
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => return Err(ReadinessError::Interrupted { attempts }),
                        _ = sleep(self.interval) => {},
                    }
                }
                Err(e) => return Err(ReadinessError::MalformedTarget(e.to_string())),
            }
        }
    }
}
