//! Run lifecycle states.

use std::fmt;

/// State of the supervisor's single process slot.
///
/// ```text
/// Idle ──► Starting ──► Running ──► Succeeded ─┐
///  ▲          │                 ├─► Failed ────┤
///  │          │                 └─► Killed ────┤
///  └──────────┴────────────────────────────────┘
/// ```
///
/// `Starting → Idle` only happens when the spawn itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
    Killed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Idle)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Killed)
                | (Succeeded | Failed | Killed, Idle)
        )
    }

    /// Whether this is one of the end-of-run states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code 0.
    Succeeded,
    /// Nonzero exit (or death by signal), with stderr or a synthesized detail.
    Failed { code: Option<i32>, detail: String },
    /// Terminated by [`ProcessSupervisor::kill`](super::ProcessSupervisor::kill).
    Killed,
}

impl RunOutcome {
    /// The terminal state this outcome passes through.
    pub fn state(&self) -> RunState {
        match self {
            Self::Succeeded => RunState::Succeeded,
            Self::Failed { .. } => RunState::Failed,
            Self::Killed => RunState::Killed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RunState; 6] = [
        RunState::Idle,
        RunState::Starting,
        RunState::Running,
        RunState::Succeeded,
        RunState::Failed,
        RunState::Killed,
    ];

    #[test]
    fn test_every_state_returns_to_idle() {
        for state in ALL {
            if state == RunState::Idle || state == RunState::Running {
                continue;
            }
            assert!(state.can_transition_to(RunState::Idle), "{state}");
        }
        assert!(!RunState::Running.can_transition_to(RunState::Idle));
    }

    #[test]
    fn test_no_second_start() {
        for state in ALL {
            let allowed = state.can_transition_to(RunState::Starting);
            assert_eq!(allowed, state == RunState::Idle, "{state}");
        }
    }

    #[test]
    fn test_terminal_only_from_running() {
        for state in ALL {
            for terminal in [RunState::Succeeded, RunState::Failed, RunState::Killed] {
                assert_eq!(
                    state.can_transition_to(terminal),
                    state == RunState::Running,
                    "{state} -> {terminal}"
                );
            }
        }
    }

    #[test]
    fn test_outcome_state() {
        assert_eq!(RunOutcome::Killed.state(), RunState::Killed);
        let failed = RunOutcome::Failed {
            code: Some(2),
            detail: "bad".into(),
        };
        assert_eq!(failed.state(), RunState::Failed);
        assert!(failed.state().is_terminal());
        assert!(RunOutcome::Succeeded.is_success());
    }
}
