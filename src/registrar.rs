//! Registration of the two task kinds and the host lifecycle hooks.
//!
//! A [`TaskRegistrar`] is constructed explicitly, once, by whatever owns the
//! OS integration lifecycle -- there is no process-wide singleton. It binds
//! both task kinds to handlers at startup and re-arms scheduling from the
//! host lifecycle events (entering background, launching).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bluetooth::CentralMonitor;
use crate::channel::ScanChannel;
use crate::config::TaskConfig;
use crate::executor::TaskExecutor;
use crate::scheduler::{BackgroundScheduler, TaskHandler};
use crate::types::TaskKind;

/// Options the host observed at process launch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    /// Whether the process was launched to restore Bluetooth central state.
    pub bluetooth_restoration: bool,
}

/// Registers and schedules the two background task kinds.
///
/// `register` is idempotent and meant to be called exactly once at startup;
/// the scheduling methods may be called whenever the host wants to re-arm a
/// task (submission failures are logged, never fatal).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use bgscan::channel::MockScanChannel;
/// use bgscan::config::TaskConfig;
/// use bgscan::registrar::TaskRegistrar;
/// use bgscan::scheduler::MockScheduler;
///
/// let scheduler = Arc::new(MockScheduler::new());
/// let channel = Arc::new(MockScanChannel::acknowledging());
/// let registrar = TaskRegistrar::new(scheduler.clone(), channel, TaskConfig::default());
///
/// registrar.register();
/// assert_eq!(scheduler.registered_identifiers().len(), 2);
///
/// registrar.schedule_refresh();
/// assert_eq!(scheduler.submissions().len(), 1);
/// ```
pub struct TaskRegistrar {
    scheduler: Arc<dyn BackgroundScheduler>,
    executor: TaskExecutor,
    registered: AtomicBool,
}

impl TaskRegistrar {
    /// Creates a registrar over the given scheduler and channel.
    pub fn new(
        scheduler: Arc<dyn BackgroundScheduler>,
        channel: Arc<dyn ScanChannel>,
        config: TaskConfig,
    ) -> Self {
        let executor = TaskExecutor::new(scheduler.clone(), channel, config);
        Self {
            scheduler,
            executor,
            registered: AtomicBool::new(false),
        }
    }

    /// Binds both task kinds to handlers with the OS scheduler.
    ///
    /// Idempotent: a second call is a logged no-op. A denied registration
    /// is logged per kind; there is no recovery path available to the app.
    pub fn register(&self) {
        if self.registered.swap(true, Ordering::SeqCst) {
            debug!("background tasks already registered");
            return;
        }

        info!("registering background tasks");
        for kind in TaskKind::ALL {
            let executor = self.executor.clone();
            let handler: TaskHandler = Arc::new(move |granted| {
                let executor = executor.clone();
                Box::pin(async move { executor.execute(granted).await })
            });
            if self.scheduler.register(kind.identifier(), handler) {
                debug!(task = kind.identifier(), "task registered");
            } else {
                warn!(task = kind.identifier(), "task registration denied");
            }
        }
    }

    /// Requests the next refresh run at its configured offset.
    pub fn schedule_refresh(&self) {
        self.executor.schedule(TaskKind::Refresh);
    }

    /// Requests the next processing run at its configured offset.
    pub fn schedule_processing(&self) {
        self.executor.schedule(TaskKind::Processing);
    }

    // --- Host lifecycle hooks ---

    /// Process launch: registers the task kinds and, when the process was
    /// woken to restore Bluetooth state, hands back a [`CentralMonitor`]
    /// for the host to forward central events to.
    pub fn on_launch(&self, options: LaunchOptions) -> Option<CentralMonitor> {
        let monitor = if options.bluetooth_restoration {
            info!("launched for Bluetooth background event");
            Some(CentralMonitor::new())
        } else {
            None
        };
        self.register();
        monitor
    }

    /// App moved to the background: scanning continues externally, and the
    /// next refresh window is requested.
    pub fn on_enter_background(&self) {
        info!("app entered background");
        self.schedule_refresh();
    }

    /// App became active again. Log-only.
    pub fn on_become_active(&self) {
        info!("app became active");
    }
}

impl std::fmt::Debug for TaskRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistrar")
            .field("registered", &self.registered.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockScanChannel;
    use crate::scheduler::MockScheduler;
    use pretty_assertions::assert_eq;

    fn registrar_with(scheduler: Arc<MockScheduler>) -> TaskRegistrar {
        TaskRegistrar::new(
            scheduler,
            Arc::new(MockScanChannel::acknowledging()),
            TaskConfig::default(),
        )
    }

    #[test]
    fn register_binds_both_kinds() {
        let scheduler = Arc::new(MockScheduler::new());
        let registrar = registrar_with(scheduler.clone());
        registrar.register();
        assert_eq!(
            scheduler.registered_identifiers(),
            vec![
                TaskKind::Processing.identifier(),
                TaskKind::Refresh.identifier(),
            ]
        );
    }

    #[test]
    fn register_is_idempotent() {
        let scheduler = Arc::new(MockScheduler::new());
        let registrar = registrar_with(scheduler.clone());
        registrar.register();
        registrar.register();
        assert_eq!(scheduler.registered_identifiers().len(), 2);
    }

    #[test]
    fn registration_denial_is_not_fatal() {
        let scheduler = Arc::new(MockScheduler::denying_registration());
        let registrar = registrar_with(scheduler.clone());
        registrar.register();
        assert!(scheduler.registered_identifiers().is_empty());
        // Scheduling still works; the OS just has nothing to dispatch to.
        registrar.schedule_refresh();
        assert_eq!(scheduler.submissions().len(), 1);
    }

    #[test]
    fn schedule_failure_is_swallowed() {
        let scheduler = Arc::new(MockScheduler::new());
        scheduler.fail_submissions("too many pending task requests");
        let registrar = registrar_with(scheduler.clone());
        registrar.schedule_refresh();
        registrar.schedule_processing();
        assert!(scheduler.submissions().is_empty());
    }

    #[test]
    fn enter_background_requests_refresh() {
        let scheduler = Arc::new(MockScheduler::new());
        let registrar = registrar_with(scheduler.clone());
        registrar.on_enter_background();
        let submissions = scheduler.submissions_for(TaskKind::Refresh);
        assert_eq!(submissions.len(), 1);
        assert!(scheduler.submissions_for(TaskKind::Processing).is_empty());
    }

    #[test]
    fn launch_without_restoration_registers_only() {
        let scheduler = Arc::new(MockScheduler::new());
        let registrar = registrar_with(scheduler.clone());
        let monitor = registrar.on_launch(LaunchOptions::default());
        assert!(monitor.is_none());
        assert_eq!(scheduler.registered_identifiers().len(), 2);
        assert!(scheduler.submissions().is_empty());
    }

    #[test]
    fn launch_with_restoration_returns_monitor() {
        let scheduler = Arc::new(MockScheduler::new());
        let registrar = registrar_with(scheduler);
        let monitor = registrar.on_launch(LaunchOptions {
            bluetooth_restoration: true,
        });
        assert!(monitor.is_some());
    }
}
