// Service Launcher Port
// Starts long-running service processes and interrupts them

use crate::domain::ServiceHandle;

use super::command_executor::{ExecutionError, Invocation};

/// What happened when a handle was signaled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Interrupt delivered to the process group
    Delivered,
    /// Process had already exited; nothing to signal
    AlreadyExited,
}

/// Service Launcher trait
///
/// Both operations are synchronous: spawning does not wait for the service,
/// and signal delivery must be possible from `Drop`.
pub trait ServiceLauncher: Send + Sync {
    /// Spawn `invocation` in its own process group without waiting on it
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the process cannot be started
    fn launch(&self, service: &str, invocation: Invocation<'_>)
        -> Result<ServiceHandle, ExecutionError>;

    /// Send an interrupt to the handle's process group
    ///
    /// Must be safe to call for a process that already exited.
    ///
    /// # Errors
    /// - ExecutionError::Signal if the signal cannot be delivered
    fn interrupt(&self, handle: &ServiceHandle) -> Result<SignalOutcome, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Mock ServiceLauncher recording launches and signals in call order
    #[derive(Clone)]
    pub struct MockServiceLauncher {
        next_pid: Arc<Mutex<u32>>,
        failing: Arc<Mutex<HashSet<String>>>,
        exited: Arc<Mutex<HashSet<String>>>,
        launched: Arc<Mutex<Vec<(String, u32)>>>,
        signaled: Arc<Mutex<Vec<(String, u32)>>>,
    }

    impl Default for MockServiceLauncher {
        fn default() -> Self {
            Self {
                next_pid: Arc::new(Mutex::new(1000)),
                failing: Arc::default(),
                exited: Arc::default(),
                launched: Arc::default(),
                signaled: Arc::default(),
            }
        }
    }

    impl MockServiceLauncher {
        pub fn new() -> Self {
            Self::default()
        }
        /// Launching `service` fails with SpawnFailed
        pub fn fail_launch(self, service: impl Into<String>) -> Self {
            self.failing.lock().unwrap().insert(service.into());
            self
        }
        /// `service` reports AlreadyExited when signaled
        pub fn exit_early(self, service: impl Into<String>) -> Self {
            self.exited.lock().unwrap().insert(service.into());
            self
        }
        pub fn launched(&self) -> Vec<String> {
            self.launched
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
        pub fn signaled(&self) -> Vec<String> {
            self.signaled
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
        pub fn signaled_pids(&self) -> Vec<u32> {
            self.signaled.lock().unwrap().iter().map(|(_, pid)| *pid).collect()
        }
    }

    impl ServiceLauncher for MockServiceLauncher {
        fn launch(
            &self,
            service: &str,
            _invocation: Invocation<'_>,
        ) -> Result<ServiceHandle, ExecutionError> {
            if self.failing.lock().unwrap().contains(service) {
                return Err(ExecutionError::SpawnFailed(format!(
                    "No such file or directory ({})",
                    service
                )));
            }
            let mut next_pid = self.next_pid.lock().unwrap();
            let pid = *next_pid;
            *next_pid += 1;
            self.launched.lock().unwrap().push((service.to_string(), pid));
            Ok(ServiceHandle::new(service, pid))
        }

        fn interrupt(&self, handle: &ServiceHandle) -> Result<SignalOutcome, ExecutionError> {
            self.signaled
                .lock()
                .unwrap()
                .push((handle.name().to_string(), handle.pid()));
            if self.exited.lock().unwrap().contains(handle.name()) {
                Ok(SignalOutcome::AlreadyExited)
            } else {
                Ok(SignalOutcome::Delivered)
            }
        }
    }
}
