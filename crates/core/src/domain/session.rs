use crate::error::{CoreError, Result};
use std::fmt;

/// Lifecycle of the rotation loop.
///
/// `Idle -> Running -> Stopping -> Idle`. A new template may only be installed
/// while `Idle`, so the loop never observes a half-replaced session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Stopping,
}

impl SessionState {
    pub fn start(self) -> Result<Self> {
        match self {
            SessionState::Idle => Ok(SessionState::Running),
            other => Err(other.invalid(SessionState::Running)),
        }
    }

    pub fn begin_stop(self) -> Result<Self> {
        match self {
            SessionState::Running => Ok(SessionState::Stopping),
            other => Err(other.invalid(SessionState::Stopping)),
        }
    }

    pub fn finish_stop(self) -> Result<Self> {
        match self {
            SessionState::Stopping => Ok(SessionState::Idle),
            other => Err(other.invalid(SessionState::Idle)),
        }
    }

    pub fn is_idle(self) -> bool {
        self == SessionState::Idle
    }

    pub fn is_running(self) -> bool {
        self == SessionState::Running
    }

    fn invalid(self, to: SessionState) -> CoreError {
        CoreError::InvalidTransition {
            from: self.to_string(),
            to: to.to_string(),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() -> Result<()> {
        let state = SessionState::default();
        assert!(state.is_idle());

        let state = state.start()?;
        assert!(state.is_running());

        let state = state.begin_stop()?;
        assert_eq!(state, SessionState::Stopping);

        let state = state.finish_stop()?;
        assert!(state.is_idle());
        Ok(())
    }

    #[test]
    fn test_cannot_start_twice() {
        let running = SessionState::Running;
        match running.start() {
            Err(CoreError::InvalidTransition { from, to }) => {
                assert_eq!(from, "running");
                assert_eq!(to, "running");
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn test_cannot_skip_stopping() {
        assert!(SessionState::Idle.begin_stop().is_err());
        assert!(SessionState::Running.finish_stop().is_err());
        assert!(SessionState::Stopping.start().is_err());
    }
}
