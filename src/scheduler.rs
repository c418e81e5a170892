//! Abstract OS background-task scheduler and the granted-task handle.
//!
//! The real scheduler belongs to the operating system; this crate only ever
//! sees it through [`BackgroundScheduler`]. Registration binds a task
//! identifier to a [`TaskHandler`] once at startup; submissions request --
//! never guarantee -- a future run. When the OS grants a window it hands the
//! handler a [`GrantedTask`]: the task kind, an out-of-band expiration
//! signal, and a completion setter that must be called exactly once.
//!
//! [`MockScheduler`] implements the trait in-process for tests: it records
//! submissions, can be told to deny registration or fail submissions, and
//! can trigger a registered handler on demand.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, TaskError};
use crate::types::{TaskCompletion, TaskKind, TaskSubmission};

/// Handler bound to a task identifier at registration time.
///
/// The OS (or the [`MockScheduler`]) invokes it with a fresh
/// [`GrantedTask`] every time the task fires.
pub type TaskHandler = Arc<dyn Fn(GrantedTask) -> BoxFuture<'static, ()> + Send + Sync>;

/// The OS background-task API, reduced to the two calls this crate needs.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the registrar and every executor
/// hold shared handles.
pub trait BackgroundScheduler: Send + Sync {
    /// Binds `handler` to `identifier`.
    ///
    /// Returns `false` when the OS denies the registration (for example an
    /// identifier missing from the host manifest). There is no recovery
    /// path; callers log and move on.
    fn register(&self, identifier: &'static str, handler: TaskHandler) -> bool;

    /// Requests that the task run no earlier than the submission's
    /// earliest-begin date. A request, not a guarantee: the OS decides
    /// actual timing from system policy.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubmitFailed`] when the scheduler refuses the
    /// request. Non-fatal; the task is simply not scheduled this cycle.
    fn submit(&self, submission: TaskSubmission) -> Result<()>;
}

/// The handle a triggered handler receives for one execution window.
///
/// Carries the task kind, the expiration signal (delivered out-of-band as a
/// [`CancellationToken`] so it can interrupt a wait instead of queueing
/// behind it), and the completion setter. [`set_completed`](Self::set_completed)
/// consumes the handle, so a unit can only ever report once.
///
/// # Examples
///
/// ```
/// use bgscan::scheduler::GrantedTask;
/// use bgscan::types::{TaskCompletion, TaskKind};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let (granted, control) = GrantedTask::new(TaskKind::Refresh);
/// granted.set_completed(TaskCompletion {
///     kind: TaskKind::Refresh,
///     success: true,
///     cancelled: false,
/// });
/// let completion = control.completed().await.unwrap();
/// assert!(completion.success);
/// # });
/// ```
#[derive(Debug)]
pub struct GrantedTask {
    kind: TaskKind,
    expiration: CancellationToken,
    completion: oneshot::Sender<TaskCompletion>,
}

impl GrantedTask {
    /// Creates a granted task and the [`GrantControl`] the granting side
    /// keeps to expire it and observe its completion.
    pub fn new(kind: TaskKind) -> (Self, GrantControl) {
        let expiration = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        (
            Self {
                kind,
                expiration: expiration.clone(),
                completion: tx,
            },
            GrantControl {
                expiration,
                completion: rx,
            },
        )
    }

    /// The kind of task this window was granted for.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// A handle on the expiration signal. Cancelled when the OS ends the
    /// window early.
    pub fn expiration(&self) -> CancellationToken {
        self.expiration.clone()
    }

    /// Reports the execution outcome to the OS. Consumes the handle:
    /// reporting twice is unrepresentable.
    pub fn set_completed(self, completion: TaskCompletion) {
        debug!(
            task = self.kind.identifier(),
            success = completion.success,
            cancelled = completion.cancelled,
            "reporting task completion"
        );
        if self.completion.send(completion).is_err() {
            warn!(
                task = self.kind.identifier(),
                "completion receiver dropped before the report"
            );
        }
    }
}

/// The granting side's handle on one execution window.
///
/// Tests (and the [`MockScheduler`]) use it to deliver the expiration
/// signal and to await the unit's single completion report.
#[derive(Debug)]
pub struct GrantControl {
    expiration: CancellationToken,
    completion: oneshot::Receiver<TaskCompletion>,
}

impl GrantControl {
    /// Fires the expiration signal: the execution window is ending early.
    pub fn expire(&self) {
        self.expiration.cancel();
    }

    /// Waits for the completion report. Returns `None` only if the handler
    /// dropped its [`GrantedTask`] without reporting, which the executor
    /// never does.
    pub async fn completed(self) -> Option<TaskCompletion> {
        self.completion.await.ok()
    }
}

// ---- MockScheduler: in-process scheduler for tests ----

/// In-process [`BackgroundScheduler`] for tests and examples.
///
/// Records every submission, remembers registered handlers, and lets tests
/// play the OS: [`trigger`](Self::trigger) spawns a registered handler with
/// a fresh [`GrantedTask`] and returns the matching [`GrantControl`].
///
/// # Examples
///
/// ```
/// use bgscan::scheduler::{BackgroundScheduler, MockScheduler};
/// use bgscan::types::{TaskKind, TaskSubmission};
/// use std::time::Duration;
///
/// let scheduler = MockScheduler::new();
/// let submission = TaskSubmission::new(TaskKind::Refresh, Duration::from_secs(900));
/// scheduler.submit(submission).unwrap();
/// assert_eq!(scheduler.submissions().len(), 1);
/// ```
#[derive(Default)]
pub struct MockScheduler {
    handlers: Mutex<HashMap<&'static str, TaskHandler>>,
    submissions: Mutex<Vec<TaskSubmission>>,
    deny_registration: bool,
    submit_failure: Mutex<Option<String>>,
}

impl MockScheduler {
    /// A scheduler that accepts registrations and submissions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler that denies every registration.
    pub fn denying_registration() -> Self {
        Self {
            deny_registration: true,
            ..Self::default()
        }
    }

    /// Makes every subsequent submission fail with `message`.
    pub fn fail_submissions(&self, message: impl Into<String>) {
        *self.submit_failure.lock() = Some(message.into());
    }

    /// Every submission accepted so far, in order.
    pub fn submissions(&self) -> Vec<TaskSubmission> {
        self.submissions.lock().clone()
    }

    /// Accepted submissions for one kind.
    pub fn submissions_for(&self, kind: TaskKind) -> Vec<TaskSubmission> {
        self.submissions
            .lock()
            .iter()
            .filter(|s| s.identifier == kind.identifier())
            .cloned()
            .collect()
    }

    /// Identifiers with a bound handler.
    pub fn registered_identifiers(&self) -> Vec<&'static str> {
        let mut identifiers: Vec<_> = self.handlers.lock().keys().copied().collect();
        identifiers.sort_unstable();
        identifiers
    }

    /// Plays the OS: grants `kind` an execution window and spawns its
    /// registered handler. Returns `None` when no handler is bound.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, kind: TaskKind) -> Option<GrantControl> {
        let handler = self.handlers.lock().get(kind.identifier()).cloned()?;
        let (granted, control) = GrantedTask::new(kind);
        tokio::spawn(handler(granted));
        Some(control)
    }
}

impl std::fmt::Debug for MockScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScheduler")
            .field("deny_registration", &self.deny_registration)
            .field("submissions", &self.submissions.lock().len())
            .finish_non_exhaustive()
    }
}

impl BackgroundScheduler for MockScheduler {
    fn register(&self, identifier: &'static str, handler: TaskHandler) -> bool {
        if self.deny_registration {
            return false;
        }
        self.handlers.lock().insert(identifier, handler);
        true
    }

    fn submit(&self, submission: TaskSubmission) -> Result<()> {
        if let Some(message) = self.submit_failure.lock().clone() {
            return Err(TaskError::SubmitFailed {
                identifier: submission.identifier,
                message,
            });
        }
        self.submissions.lock().push(submission);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn completion_report_reaches_control() {
        let (granted, control) = GrantedTask::new(TaskKind::Processing);
        assert_eq!(granted.kind(), TaskKind::Processing);
        granted.set_completed(TaskCompletion {
            kind: TaskKind::Processing,
            success: false,
            cancelled: true,
        });
        let completion = control.completed().await.unwrap();
        assert!(!completion.success);
        assert!(completion.cancelled);
    }

    #[tokio::test]
    async fn expire_cancels_the_token() {
        let (granted, control) = GrantedTask::new(TaskKind::Refresh);
        let token = granted.expiration();
        assert!(!token.is_cancelled());
        control.expire();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_handler_resolves_completed_to_none() {
        let (granted, control) = GrantedTask::new(TaskKind::Refresh);
        drop(granted);
        assert!(control.completed().await.is_none());
    }

    #[test]
    fn mock_records_submissions_per_kind() {
        let scheduler = MockScheduler::new();
        scheduler
            .submit(TaskSubmission::new(
                TaskKind::Refresh,
                Duration::from_secs(1),
            ))
            .unwrap();
        scheduler
            .submit(TaskSubmission::new(
                TaskKind::Processing,
                Duration::from_secs(2),
            ))
            .unwrap();
        assert_eq!(scheduler.submissions().len(), 2);
        assert_eq!(scheduler.submissions_for(TaskKind::Refresh).len(), 1);
        assert_eq!(scheduler.submissions_for(TaskKind::Processing).len(), 1);
    }

    #[test]
    fn mock_submit_failure() {
        let scheduler = MockScheduler::new();
        scheduler.fail_submissions("too many pending task requests");
        let err = scheduler
            .submit(TaskSubmission::new(
                TaskKind::Refresh,
                Duration::from_secs(1),
            ))
            .unwrap_err();
        assert!(matches!(err, TaskError::SubmitFailed { .. }));
        assert!(scheduler.submissions().is_empty());
    }

    #[test]
    fn mock_denies_registration() {
        let scheduler = MockScheduler::denying_registration();
        let handler: TaskHandler = Arc::new(|granted| {
            Box::pin(async move {
                drop(granted);
            })
        });
        assert!(!scheduler.register(TaskKind::Refresh.identifier(), handler));
        assert!(scheduler.registered_identifiers().is_empty());
    }
}
