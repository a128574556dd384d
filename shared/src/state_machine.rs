//! Execution Engine State Machine
//!
//! Defines the Idle/Running lifecycle of the command engine. At most one
//! execution session may be active, so a run request while Running is
//! rejected rather than queued.

use thiserror::Error;

/// Lifecycle state of the execution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No session active
    #[default]
    Idle,
    /// A session owns the action queue
    Running,
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// `run()` entered with a new action list
    RunRequested,
    /// Every queued action executed
    Completed,
    /// Queue unwound after a cancel request
    CancelSettled,
    /// Encoding or transmission failure aborted the run
    Failed,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(EngineState),
    /// Transition was invalid from current state
    Rejected { from: EngineState, event: EngineEvent },
}

impl TransitionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionResult::Success(_))
    }

    /// Convert into a `Result`, for callers that propagate with `?`
    pub fn into_result(self) -> Result<EngineState, TransitionError> {
        match self {
            TransitionResult::Success(state) => Ok(state),
            TransitionResult::Rejected { from, event } => Err(TransitionError { from, event }),
        }
    }
}

/// A rejected transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{event:?} is not valid while {from:?}")]
pub struct TransitionError {
    pub from: EngineState,
    pub event: EngineEvent,
}

/// The engine lifecycle state machine
#[derive(Debug, Default)]
pub struct EngineStateMachine {
    current_state: EngineState,
}

impl EngineStateMachine {
    /// Create a new state machine in Idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> EngineState {
        self.current_state
    }

    pub fn is_running(&self) -> bool {
        self.current_state == EngineState::Running
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: EngineEvent) -> TransitionResult {
        match next_state(self.current_state, event) {
            Some(state) => {
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => TransitionResult::Rejected {
                from: self.current_state,
                event,
            },
        }
    }
}

/// Get the next state for a given event, if the transition is valid
fn next_state(from: EngineState, event: EngineEvent) -> Option<EngineState> {
    use EngineEvent::*;
    use EngineState::*;

    match (from, event) {
        (Idle, RunRequested) => Some(Running),
        (Running, Completed | CancelSettled | Failed) => Some(Idle),
        // Reentrant run and stray completions are rejected
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let fsm = EngineStateMachine::new();
        assert_eq!(fsm.state(), EngineState::Idle);
        assert!(!fsm.is_running());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut fsm = EngineStateMachine::new();

        let result = fsm.process_event(EngineEvent::RunRequested);
        assert_eq!(result, TransitionResult::Success(EngineState::Running));

        let result = fsm.process_event(EngineEvent::Completed);
        assert_eq!(result, TransitionResult::Success(EngineState::Idle));
    }

    #[test]
    fn test_reentrant_run_rejected() {
        let mut fsm = EngineStateMachine::new();
        fsm.process_event(EngineEvent::RunRequested);

        let result = fsm.process_event(EngineEvent::RunRequested);
        assert!(matches!(
            result,
            TransitionResult::Rejected {
                from: EngineState::Running,
                event: EngineEvent::RunRequested
            }
        ));
        assert_eq!(fsm.state(), EngineState::Running);
    }

    #[test]
    fn test_every_exit_returns_to_idle() {
        for exit in [EngineEvent::Completed, EngineEvent::CancelSettled, EngineEvent::Failed] {
            let mut fsm = EngineStateMachine::new();
            fsm.process_event(EngineEvent::RunRequested);
            assert!(fsm.process_event(exit).is_success());
            assert_eq!(fsm.state(), EngineState::Idle);
        }
    }

    #[test]
    fn test_exit_from_idle_rejected() {
        let mut fsm = EngineStateMachine::new();
        let err = fsm
            .process_event(EngineEvent::Completed)
            .into_result()
            .unwrap_err();
        assert_eq!(err.from, EngineState::Idle);
    }
}
