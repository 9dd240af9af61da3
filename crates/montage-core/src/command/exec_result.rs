//! Outcome of handing a command to a handling pattern

use crate::errors::{Result, SessionError};

/// What became of a command invocation
///
/// Failures are captured rather than raised so that patterns which must
/// not unwind (dispatch loops, diagnostics) can still report them.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResult {
    /// Ran to completion on the calling thread
    Done,
    /// Handed to the dispatcher, runs later
    Dispatched,
    /// Deliberately not run (diagnostic pattern)
    Skipped,
    /// Ran and failed; session state is unchanged
    Failed(SessionError),
}

impl ExecResult {
    /// Anything but a failure
    pub fn is_valid(&self) -> bool {
        !matches!(self, ExecResult::Failed(_))
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            ExecResult::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Turn a captured failure back into an error
    ///
    /// # Errors
    ///
    /// The captured error of a `Failed` result.
    pub fn maybe_throw(self) -> Result<()> {
        match self {
            ExecResult::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for ExecResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecResult::Done => write!(f, "done"),
            ExecResult::Dispatched => write!(f, "dispatched"),
            ExecResult::Skipped => write!(f, "skipped"),
            ExecResult::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}
