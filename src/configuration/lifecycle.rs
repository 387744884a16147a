use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{PropertyError, Result};

/// Two-phase startup states.
///
/// `Initializing` covers the whole window between `initialize` starting and
/// `ready` completing; `Initialized` marks that `initialize` finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Initializing = 1,
    Initialized = 2,
    Ready = 3,
    Failed = 4,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Initializing,
            2 => Self::Initialized,
            3 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Initializing => "INITIALIZING",
            Self::Initialized => "INITIALIZED",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Lock-free state holder enforcing `initialize` -> `ready` -> reads.
#[derive(Debug)]
pub struct Lifecycle {
    owner: String,
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new(owner: impl Into<String>) -> Self {
        Self { owner: owner.into(), state: AtomicU8::new(LifecycleState::Created as u8) }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    pub fn begin_initialize(&self) -> Result<()> {
        self.transition(LifecycleState::Created, LifecycleState::Initializing, "initialize")
    }

    pub fn end_initialize(&self) -> Result<()> {
        self.transition(LifecycleState::Initializing, LifecycleState::Initialized, "initialize")
    }

    pub fn begin_ready(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Initialized => Ok(()),
            state => Err(self.violation("ready", state)),
        }
    }

    pub fn end_ready(&self) -> Result<()> {
        self.transition(LifecycleState::Initialized, LifecycleState::Ready, "ready")
    }

    /// Terminal; every later phase or read fails.
    pub fn fail(&self) {
        self.state.store(LifecycleState::Failed as u8, Ordering::Release);
    }

    /// Reads are only legal once `ready` completed.
    pub fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state() {
            LifecycleState::Ready => Ok(()),
            state => Err(self.violation(operation, state)),
        }
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState, operation: &str) -> Result<()> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| self.violation(operation, LifecycleState::from_u8(current)))
    }

    fn violation(&self, operation: &str, state: LifecycleState) -> PropertyError {
        PropertyError::lifecycle(format!("{}: '{}' is not allowed in state {}", self.owner, operation, state))
    }
}
