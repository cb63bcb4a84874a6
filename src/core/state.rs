use crate::utils::error::{EtlError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Connected,
    StorageEnabled,
    SecretSet,
    DbEnabled,
    Attached,
    Counted,
    Exported,
    Closed,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Init => "INIT",
            PipelineState::Connected => "CONNECTED",
            PipelineState::StorageEnabled => "STORAGE_ENABLED",
            PipelineState::SecretSet => "SECRET_SET",
            PipelineState::DbEnabled => "DB_ENABLED",
            PipelineState::Attached => "ATTACHED",
            PipelineState::Counted => "COUNTED",
            PipelineState::Exported => "EXPORTED",
            PipelineState::Closed => "CLOSED",
            PipelineState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Closed)
    }

    /// State a forward step must start from to reach `self`.
    fn predecessor(self) -> Option<PipelineState> {
        match self {
            PipelineState::Init | PipelineState::Failed | PipelineState::Closed => None,
            PipelineState::Connected => Some(PipelineState::Init),
            PipelineState::StorageEnabled => Some(PipelineState::Connected),
            PipelineState::SecretSet => Some(PipelineState::StorageEnabled),
            PipelineState::DbEnabled => Some(PipelineState::SecretSet),
            PipelineState::Attached => Some(PipelineState::DbEnabled),
            PipelineState::Counted => Some(PipelineState::Attached),
            PipelineState::Exported => Some(PipelineState::Counted),
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current state and every state visited during one run.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: PipelineState,
    history: Vec<PipelineState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: PipelineState::Init,
            history: vec![PipelineState::Init],
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Checks that `step` may run now, i.e. the machine sits in the predecessor of `next`.
    pub fn require(&self, step: &str, next: PipelineState) -> Result<()> {
        match next.predecessor() {
            Some(expected) if expected == self.current => Ok(()),
            Some(expected) => Err(EtlError::InvalidState {
                step: step.to_string(),
                expected: expected.to_string(),
                actual: self.current.to_string(),
            }),
            None => Err(EtlError::InvalidState {
                step: step.to_string(),
                expected: "a forward state".to_string(),
                actual: next.to_string(),
            }),
        }
    }

    pub fn advance(&mut self, step: &str, next: PipelineState) -> Result<()> {
        self.require(step, next)?;
        self.enter(next);
        Ok(())
    }

    /// Any non-terminal state may fail.
    pub fn fail(&mut self) {
        if !self.current.is_terminal() && self.current != PipelineState::Failed {
            self.enter(PipelineState::Failed);
        }
    }

    /// `EXPORTED` closes normally; every other state gets there through `FAILED`.
    pub fn close(&mut self) {
        if self.current.is_terminal() {
            return;
        }
        if self.current != PipelineState::Exported {
            self.fail();
        }
        self.enter(PipelineState::Closed);
    }

    fn enter(&mut self, next: PipelineState) {
        tracing::debug!("State {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_sequence() {
        let mut machine = StateMachine::new();
        for next in [
            PipelineState::Connected,
            PipelineState::StorageEnabled,
            PipelineState::SecretSet,
            PipelineState::DbEnabled,
            PipelineState::Attached,
            PipelineState::Counted,
            PipelineState::Exported,
        ] {
            machine.advance("step", next).unwrap();
        }
        machine.close();

        assert_eq!(machine.current(), PipelineState::Closed);
        assert_eq!(machine.history().len(), 9);
        assert!(!machine.history().contains(&PipelineState::Failed));
    }

    #[test]
    fn test_out_of_order_step_is_rejected() {
        let mut machine = StateMachine::new();
        machine.advance("acquire", PipelineState::Connected).unwrap();

        let err = machine
            .advance("attach", PipelineState::Attached)
            .unwrap_err();
        match err {
            EtlError::InvalidState {
                expected, actual, ..
            } => {
                assert_eq!(expected, "DB_ENABLED");
                assert_eq!(actual, "CONNECTED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(machine.current(), PipelineState::Connected);
    }

    #[test]
    fn test_close_after_failure_goes_through_failed() {
        let mut machine = StateMachine::new();
        machine.advance("acquire", PipelineState::Connected).unwrap();
        machine.close();

        assert_eq!(
            machine.history(),
            &[
                PipelineState::Init,
                PipelineState::Connected,
                PipelineState::Failed,
                PipelineState::Closed
            ]
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut machine = StateMachine::new();
        machine.fail();
        machine.fail();
        machine.close();
        machine.close();
        assert_eq!(
            machine.history(),
            &[PipelineState::Init, PipelineState::Failed, PipelineState::Closed]
        );
    }
}
