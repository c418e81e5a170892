//! Work-unit lifecycle and the single-execution algorithm.
//!
//! One OS trigger produces one [`WorkUnit`] and one call to
//! [`TaskExecutor::execute`]. The executor reschedules the next occurrence
//! first, sends the kind's scan request, and races the response against the
//! wait budget and the expiration signal in a single `select!`. Whichever
//! arm wins, exactly one completion report goes back through the granted
//! handle, and the unit ends in the `Finished` phase.
//!
//! Each unit owns its `{phase, cancelled}` state exclusively; the two task
//! kinds may execute concurrently but the OS never re-enters a still-running
//! kind, so no locking is needed here.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channel::ScanChannel;
use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::scheduler::{BackgroundScheduler, GrantedTask};
use crate::types::{TaskCompletion, TaskKind, TaskSubmission, WorkPhase};

/// One execution instance of a background task handler.
///
/// Lifecycle per the state machine on [`WorkPhase`]: `start` moves an idle
/// unit to `Executing` unless it was already cancelled, in which case the
/// unit goes straight to `Finished` with the cancelled flag set. `cancel`
/// may arrive at any time while executing; it never terminates the unit by
/// itself -- the unit still resolves to `Finished` and still reports, with
/// `success = false`.
///
/// # Examples
///
/// ```
/// use bgscan::executor::WorkUnit;
/// use bgscan::types::{TaskKind, WorkPhase};
///
/// let mut unit = WorkUnit::new(TaskKind::Refresh);
/// assert!(unit.start().unwrap().is_none());
/// assert_eq!(unit.phase(), WorkPhase::Executing);
///
/// let completion = unit.finish(true).unwrap();
/// assert!(completion.success);
/// assert_eq!(unit.phase(), WorkPhase::Finished);
/// ```
#[derive(Debug)]
pub struct WorkUnit {
    kind: TaskKind,
    phase: WorkPhase,
    cancelled: bool,
}

impl WorkUnit {
    /// Creates an idle unit for `kind`.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            phase: WorkPhase::Idle,
            cancelled: false,
        }
    }

    /// The kind this unit executes.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> WorkPhase {
        self.phase
    }

    /// Whether the cancellation flag has been set.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Sets the cancellation flag. Idempotent; valid in any phase.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Starts the unit.
    ///
    /// Returns `Ok(None)` when the unit entered `Executing`. When the unit
    /// was cancelled before it ever started, it goes directly to `Finished`
    /// and the short-circuit completion (`success = false`,
    /// `cancelled = true`) is returned for the caller to report.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] if the unit is not idle.
    pub fn start(&mut self) -> Result<Option<TaskCompletion>, TaskError> {
        if self.cancelled {
            self.phase.validate_transition(&WorkPhase::Finished)?;
            self.phase = WorkPhase::Finished;
            return Ok(Some(self.completion(false)));
        }
        self.phase.validate_transition(&WorkPhase::Executing)?;
        self.phase = WorkPhase::Executing;
        Ok(None)
    }

    /// Finishes an executing unit and produces its completion report.
    ///
    /// `success` is what the wait outcome suggests; a set cancellation flag
    /// overrides it to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] if the unit is not
    /// executing. The `Idle -> Finished` edge is reserved for the
    /// pre-cancelled shortcut inside [`start`](Self::start).
    pub fn finish(&mut self, success: bool) -> Result<TaskCompletion, TaskError> {
        if self.phase != WorkPhase::Executing {
            return Err(TaskError::InvalidTransition {
                from: self.phase,
                to: WorkPhase::Finished,
            });
        }
        self.phase = WorkPhase::Finished;
        Ok(self.completion(success))
    }

    fn completion(&self, success: bool) -> TaskCompletion {
        TaskCompletion {
            kind: self.kind,
            success: success && !self.cancelled,
            cancelled: self.cancelled,
        }
    }
}

/// Executes granted background tasks against the scheduler and channel
/// seams.
///
/// Cheap to clone: two `Arc`s and a small config. The registrar clones one
/// executor into each registered handler.
#[derive(Clone)]
pub struct TaskExecutor {
    scheduler: Arc<dyn BackgroundScheduler>,
    channel: Arc<dyn ScanChannel>,
    config: TaskConfig,
}

impl TaskExecutor {
    /// Creates an executor over the given scheduler and channel.
    pub fn new(
        scheduler: Arc<dyn BackgroundScheduler>,
        channel: Arc<dyn ScanChannel>,
        config: TaskConfig,
    ) -> Self {
        Self {
            scheduler,
            channel,
            config,
        }
    }

    /// The configuration this executor runs with.
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Requests the next occurrence of `kind` at its configured offset.
    ///
    /// Submission failure is logged and swallowed: the task is simply not
    /// scheduled until the next opportunity (for example the next
    /// app-foreground event).
    pub fn schedule(&self, kind: TaskKind) {
        let offset = self.config.earliest_begin_offset(kind);
        let submission = TaskSubmission::new(kind, offset);
        match self.scheduler.submit(submission) {
            Ok(()) => info!(task = kind.identifier(), ?offset, "task scheduled"),
            Err(err) => warn!(task = kind.identifier(), %err, "could not schedule task"),
        }
    }

    /// Runs one execution window end to end.
    ///
    /// Steps, in order: reschedule the same kind (before the wait, so the
    /// self-renewal happens even on timeout), start the work unit, send the
    /// scan request, wait for response/deadline/expiration -- whichever
    /// comes first -- and report completion exactly once.
    pub async fn execute(&self, granted: GrantedTask) {
        let kind = granted.kind();
        info!(task = kind.identifier(), "background task started");

        self.schedule(kind);

        let mut unit = WorkUnit::new(kind);
        let expiration = granted.expiration();
        if expiration.is_cancelled() {
            unit.cancel();
        }

        match unit.start() {
            Ok(None) => {},
            Ok(Some(completion)) => {
                warn!(
                    task = kind.identifier(),
                    "window expired before the unit started"
                );
                granted.set_completed(completion);
                return;
            },
            Err(err) => {
                error!(task = kind.identifier(), %err, "work unit refused to start");
                granted.set_completed(TaskCompletion {
                    kind,
                    success: false,
                    cancelled: true,
                });
                return;
            },
        }

        let method = kind.scan_method();
        let budget = self.config.scan_wait_budget();
        debug!(
            task = kind.identifier(),
            %method,
            channel = self.config.channel_name(),
            "requesting scan from collaborator"
        );

        // Losing arms drop the in-flight invoke future, so an expired or
        // timed-out request is actually cancelled rather than left running
        // against a dead waiter.
        let outcome = tokio::select! {
            response = self.channel.invoke(method) => response,
            () = tokio::time::sleep(budget) => Err(TaskError::Timeout { method, budget }),
            () = expiration.cancelled() => Err(TaskError::Expired {
                identifier: kind.identifier(),
            }),
        };

        let success = match outcome.and_then(|response| response.into_result(method)) {
            Ok(()) => {
                info!(task = kind.identifier(), %method, "scan completed");
                true
            },
            Err(err) => {
                if err.is_cancellation() {
                    unit.cancel();
                    warn!(task = kind.identifier(), %err, "scan abandoned");
                } else {
                    error!(task = kind.identifier(), %err, "scan failed");
                }
                false
            },
        };

        let completion = match unit.finish(success) {
            Ok(completion) => completion,
            Err(err) => {
                error!(task = kind.identifier(), %err, "work unit finished out of order");
                TaskCompletion {
                    kind,
                    success: false,
                    cancelled: unit.is_cancelled(),
                }
            },
        };

        granted.set_completed(completion);
        info!(
            task = kind.identifier(),
            success = completion.success,
            cancelled = completion.cancelled,
            "background task finished"
        );
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_enters_executing() {
        let mut unit = WorkUnit::new(TaskKind::Refresh);
        assert_eq!(unit.phase(), WorkPhase::Idle);
        assert!(unit.start().unwrap().is_none());
        assert_eq!(unit.phase(), WorkPhase::Executing);
        assert!(!unit.is_cancelled());
    }

    #[test]
    fn start_on_precancelled_unit_short_circuits() {
        let mut unit = WorkUnit::new(TaskKind::Processing);
        unit.cancel();

        let completion = unit.start().unwrap().expect("short-circuit completion");
        assert_eq!(unit.phase(), WorkPhase::Finished);
        assert!(!completion.success);
        assert!(completion.cancelled);
    }

    #[test]
    fn finish_reports_success() {
        let mut unit = WorkUnit::new(TaskKind::Refresh);
        unit.start().unwrap();
        let completion = unit.finish(true).unwrap();
        assert!(completion.success);
        assert!(!completion.cancelled);
        assert_eq!(unit.phase(), WorkPhase::Finished);
    }

    #[test]
    fn cancellation_overrides_success() {
        let mut unit = WorkUnit::new(TaskKind::Refresh);
        unit.start().unwrap();
        unit.cancel();
        let completion = unit.finish(true).unwrap();
        assert!(!completion.success);
        assert!(completion.cancelled);
    }

    #[test]
    fn double_start_is_rejected() {
        let mut unit = WorkUnit::new(TaskKind::Refresh);
        unit.start().unwrap();
        let err = unit.start().unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
    }

    #[test]
    fn finish_without_start_is_rejected() {
        // Idle -> Finished is only legal through the pre-cancelled start path.
        let mut unit = WorkUnit::new(TaskKind::Refresh);
        let err = unit.finish(true).unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
    }

    #[test]
    fn double_finish_is_rejected() {
        let mut unit = WorkUnit::new(TaskKind::Refresh);
        unit.start().unwrap();
        unit.finish(true).unwrap();
        let err = unit.finish(true).unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut unit = WorkUnit::new(TaskKind::Processing);
        unit.start().unwrap();
        unit.cancel();
        unit.cancel();
        assert!(unit.is_cancelled());
        assert_eq!(unit.phase(), WorkPhase::Executing);
    }
}
