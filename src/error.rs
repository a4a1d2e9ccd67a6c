//! Error types used by executors, registries and stream bridges.
//!
//! [`ExecutorError`] is the single error type delivered to callers awaiting a
//! job or consuming a stream. Failures coming from outside the crate (trigger
//! side effects, stream hooks, external completion events) are carried opaquely
//! in [`ExecutorError::External`].
//!
//! Like the rest of the runtime, every variant has a stable label
//! ([`ExecutorError::as_label`]) for logs and a human-readable message
//! ([`ExecutorError::as_message`]).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result delivered to the caller awaiting a job.
pub type JobResult<V> = Result<V, ExecutorError>;

/// # Errors produced by executors and stream bridges.
///
/// - `NoJobToExecute` and `ExecutorNotFound` are *diagnostics*: they describe a
///   stray external event, not a failure of any waiting caller.
/// - `JobCancelled` is delivered only to the caller whose job was cancelled.
/// - `ExecutorDestroyed` fans out to every caller still waiting on a torn down executor.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    /// A completion arrived while no job was executing.
    #[error("no job to execute")]
    NoJobToExecute,

    /// The job was cancelled before it was resolved.
    #[error("job cancelled")]
    JobCancelled,

    /// The executor was torn down while the job was still pending.
    #[error("executor destroyed")]
    ExecutorDestroyed,

    /// No executor is registered for the requested key.
    #[error("executor not found")]
    ExecutorNotFound,

    /// A stream is already active on this bridge.
    #[error("operation already in progress")]
    OperationInProgress,

    /// A callback slot is already owned by someone else.
    #[error("callback slot already owned by {owner}")]
    SlotOccupied {
        /// Description of the current owner.
        owner: String,
    },

    /// Opaque failure raised outside this crate.
    #[error("external failure: {0}")]
    External(Arc<dyn StdError + Send + Sync>),
}

impl ExecutorError {
    /// Wraps a foreign error.
    ///
    /// # Example
    /// ```
    /// use callbridge::ExecutorError;
    ///
    /// let io = std::io::Error::other("link lost");
    /// let err = ExecutorError::external(io);
    /// assert_eq!(err.as_label(), "external");
    /// assert_eq!(err.to_string(), "external failure: link lost");
    /// ```
    pub fn external<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ExecutorError::External(Arc::new(error))
    }

    /// Wraps a plain message as an external failure.
    pub fn msg(message: impl Into<String>) -> Self {
        ExecutorError::External(Arc::new(Message(message.into())))
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use callbridge::ExecutorError;
    ///
    /// assert_eq!(ExecutorError::NoJobToExecute.as_label(), "no_job_to_execute");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecutorError::NoJobToExecute => "no_job_to_execute",
            ExecutorError::JobCancelled => "job_cancelled",
            ExecutorError::ExecutorDestroyed => "executor_destroyed",
            ExecutorError::ExecutorNotFound => "executor_not_found",
            ExecutorError::OperationInProgress => "operation_in_progress",
            ExecutorError::SlotOccupied { .. } => "slot_occupied",
            ExecutorError::External(_) => "external",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ExecutorError::NoJobToExecute => "completion without an executing job".to_string(),
            ExecutorError::JobCancelled => "job has been cancelled".to_string(),
            ExecutorError::ExecutorDestroyed => "executor has been torn down".to_string(),
            ExecutorError::ExecutorNotFound => "no executor for key".to_string(),
            ExecutorError::OperationInProgress => "a stream is already active".to_string(),
            ExecutorError::SlotOccupied { owner } => format!("slot owned by {owner}"),
            ExecutorError::External(e) => format!("external: {e}"),
        }
    }

    /// Returns `true` for [`ExecutorError::JobCancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::JobCancelled)
    }

    /// Indicates whether the error describes a stray external event rather than
    /// a failure of a waiting caller.
    ///
    /// # Example
    /// ```
    /// use callbridge::ExecutorError;
    ///
    /// assert!(ExecutorError::ExecutorNotFound.is_diagnostic());
    /// assert!(!ExecutorError::JobCancelled.is_diagnostic());
    /// ```
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            ExecutorError::NoJobToExecute | ExecutorError::ExecutorNotFound
        )
    }
}

/// Plain-text external failure.
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_is_external() {
        let err = ExecutorError::msg("boom");
        assert!(matches!(err, ExecutorError::External(_)));
        assert_eq!(err.to_string(), "external failure: boom");
        assert_eq!(err.as_message(), "external: boom");
    }

    #[test]
    fn test_external_clone_shares_source() {
        let err = ExecutorError::external(std::io::Error::other("gone"));
        let copy = err.clone();
        match (err, copy) {
            (ExecutorError::External(a), ExecutorError::External(b)) => {
                assert!(Arc::ptr_eq(&a, &b));
            }
            _ => panic!("expected external errors"),
        }
    }

    #[test]
    fn test_slot_occupied_message() {
        let err = ExecutorError::SlotOccupied {
            owner: "scanner".into(),
        };
        assert_eq!(err.to_string(), "callback slot already owned by scanner");
        assert_eq!(err.as_label(), "slot_occupied");
    }
}
