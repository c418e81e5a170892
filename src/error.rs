//! Error types for background task execution.
//!
//! Every failure in this crate is non-fatal: scheduling submissions that the
//! OS refuses are logged and skipped, and anything that goes wrong inside a
//! work unit is converted into a `success = false` completion report at the
//! work-unit boundary. [`TaskError`] exists so those conversions carry
//! enough context to produce a useful log line.

use std::time::Duration;

use thiserror::Error;

use crate::channel::ScanMethod;
use crate::types::WorkPhase;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors that can occur while scheduling or executing a background task.
///
/// [`is_cancellation`](TaskError::is_cancellation) distinguishes the two
/// variants that mark a work unit cancelled (deadline and expiration) from
/// plain execution failures such as an error payload from the collaborator.
///
/// # Examples
///
/// ```
/// use bgscan::channel::ScanMethod;
/// use bgscan::error::TaskError;
///
/// let err = TaskError::ScanFailed {
///     method: ScanMethod::BackgroundScan,
///     message: "adapter busy".to_string(),
/// };
/// assert!(err.to_string().contains("performBackgroundScan"));
/// assert!(!err.is_cancellation());
/// ```
#[derive(Debug, Error)]
pub enum TaskError {
    /// The OS refused a scheduling submission. Non-fatal: the task is simply
    /// not scheduled until the next opportunity.
    #[error("could not submit background task {identifier}: {message}")]
    SubmitFailed {
        /// Identifier of the task that was being submitted.
        identifier: &'static str,
        /// Reason reported by the scheduler.
        message: String,
    },

    /// The collaborator answered with an explicit error payload.
    #[error("scan request {method} failed: {message}")]
    ScanFailed {
        /// The method that was invoked.
        method: ScanMethod,
        /// Message from the error payload.
        message: String,
    },

    /// No response arrived within the wait budget.
    #[error("no response to {method} within {budget:?}")]
    Timeout {
        /// The method that was invoked.
        method: ScanMethod,
        /// The budget that elapsed.
        budget: Duration,
    },

    /// The OS signalled that the execution window is ending early.
    #[error("background task {identifier} expired before the scan finished")]
    Expired {
        /// Identifier of the expiring task.
        identifier: &'static str,
    },

    /// A work unit was driven through an invalid state transition.
    #[error("invalid work-unit transition from {from} to {to}")]
    InvalidTransition {
        /// The phase the unit was in.
        from: WorkPhase,
        /// The phase that was rejected.
        to: WorkPhase,
    },

    /// The collaborator went away; a response will never arrive.
    #[error("scan channel closed before a response arrived")]
    ChannelClosed,
}

impl TaskError {
    /// Returns `true` for the variants that mark a work unit cancelled
    /// (deadline elapsed or expiration signal) rather than merely failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Expired { .. })
    }
}
