//! Daemon lifecycle state machine.
//!
//! ```text
//! Unlaunched ──launch──▶ Launched
//!     │                     │
//!     └──close/signal──▶ Closing ◀──close/signal
//!                           │
//!                      Terminated
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

use crate::error::DaemonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Listening; no browser yet.
    Unlaunched = 0,
    /// Browser running.
    Launched = 1,
    /// No new commands accepted; draining connections.
    Closing = 2,
    /// Engine and listener released.
    Terminated = 3,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Unlaunched, Launched)
                | (Unlaunched, Closing)
                | (Launched, Closing)
                | (Closing, Terminated)
        )
    }

    /// Whether commands are still executed in this state.
    pub fn accepts_commands(self) -> bool {
        matches!(self, LifecycleState::Unlaunched | LifecycleState::Launched)
    }
}

impl From<u8> for LifecycleState {
    fn from(value: u8) -> Self {
        match value {
            0 => LifecycleState::Unlaunched,
            1 => LifecycleState::Launched,
            2 => LifecycleState::Closing,
            _ => LifecycleState::Terminated,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Unlaunched => write!(f, "unlaunched"),
            LifecycleState::Launched => write!(f, "launched"),
            LifecycleState::Closing => write!(f, "closing"),
            LifecycleState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Shared, lock-free lifecycle cell.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Unlaunched as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::SeqCst))
    }

    /// Move to `next`, failing if the edge is not part of the machine.
    pub fn transition(&self, next: LifecycleState) -> Result<(), DaemonError> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                LifecycleState::from(current)
                    .can_transition_to(next)
                    .then_some(next as u8)
            })
            .map(|previous| {
                debug!("Lifecycle {} -> {}", LifecycleState::from(previous), next);
            })
            .map_err(|current| DaemonError::InvalidStateTransition {
                from: LifecycleState::from(current),
                to: next,
            })
    }

    /// Record that a browser is up. A no-op unless still Unlaunched.
    pub fn mark_launched(&self) {
        let _ = self.transition(LifecycleState::Launched);
    }

    /// Enter Closing. Returns false if shutdown had already begun.
    pub fn begin_close(&self) -> bool {
        self.transition(LifecycleState::Closing).is_ok()
    }

    pub fn accepts_commands(&self) -> bool {
        self.state().accepts_commands()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Unlaunched);
        assert!(lifecycle.accepts_commands());
    }

    #[test]
    fn test_full_lifecycle() {
        let lifecycle = Lifecycle::new();
        lifecycle.transition(LifecycleState::Launched).unwrap();
        lifecycle.transition(LifecycleState::Closing).unwrap();
        assert!(!lifecycle.accepts_commands());
        lifecycle.transition(LifecycleState::Terminated).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Terminated);
    }

    #[test]
    fn test_close_before_launch() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_close());
        assert_eq!(lifecycle.state(), LifecycleState::Closing);
    }

    #[test]
    fn test_begin_close_twice() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_close());
        assert!(!lifecycle.begin_close());
    }

    #[test]
    fn test_mark_launched_is_idempotent() {
        let lifecycle = Lifecycle::new();
        lifecycle.mark_launched();
        lifecycle.mark_launched();
        assert_eq!(lifecycle.state(), LifecycleState::Launched);
    }

    #[test]
    fn test_mark_launched_does_not_revive_closing() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_close();
        lifecycle.mark_launched();
        assert_eq!(lifecycle.state(), LifecycleState::Closing);
    }

    #[test]
    fn test_invalid_transitions() {
        let lifecycle = Lifecycle::new();
        let err = lifecycle
            .transition(LifecycleState::Terminated)
            .unwrap_err();
        assert!(matches!(
            err,
            DaemonError::InvalidStateTransition {
                from: LifecycleState::Unlaunched,
                to: LifecycleState::Terminated
            }
        ));

        lifecycle.begin_close();
        assert!(lifecycle.transition(LifecycleState::Launched).is_err());
        assert!(lifecycle.transition(LifecycleState::Unlaunched).is_err());
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(LifecycleState::from(0), LifecycleState::Unlaunched);
        assert_eq!(LifecycleState::from(1), LifecycleState::Launched);
        assert_eq!(LifecycleState::from(2), LifecycleState::Closing);
        assert_eq!(LifecycleState::from(3), LifecycleState::Terminated);
        assert_eq!(LifecycleState::from(200), LifecycleState::Terminated);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LifecycleState::Unlaunched.to_string(), "unlaunched");
        assert_eq!(LifecycleState::Closing.to_string(), "closing");
    }
}
