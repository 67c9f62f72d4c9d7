use thiserror::Error;

/// Lifecycle of the supervised engine process.
///
/// `Idle → Running → {Exited | Terminated}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Nothing spawned yet.
    Idle,
    /// Child spawned and not yet reaped.
    Running,
    /// Child exited on its own.
    Exited,
    /// Supervisor was interrupted and ran the termination cascade.
    Terminated,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("illegal job state transition: {from:?} -> {to:?}")]
    IllegalTransition { from: JobState, to: JobState },
}

impl JobState {
    /// Validate a move to `next`, returning the new state.
    pub fn advance(self, next: JobState) -> Result<JobState, StateError> {
        match (self, next) {
            (JobState::Idle, JobState::Running)
            | (JobState::Running, JobState::Exited)
            | (JobState::Running, JobState::Terminated) => Ok(next),
            (from, to) => Err(StateError::IllegalTransition { from, to }),
        }
    }
}

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Child exited by itself. Death by signal `n` is reported as `128 + n`.
    Exited(i32),
    /// Supervisor was cancelled while the child ran.
    ///
    /// `observed` is the child's exit code if it was already known when the cancellation was handled.
    Terminated { observed: Option<i32> },
}
