//! Configuration for scheduling offsets and the scan wait budget.

use std::time::Duration;

use crate::constants::{
    BLE_CHANNEL_NAME, PROCESSING_EARLIEST_BEGIN, REFRESH_EARLIEST_BEGIN, SCAN_WAIT_BUDGET,
};
use crate::types::TaskKind;

/// Tunables for task scheduling and execution.
///
/// Defaults come from [`constants`](crate::constants) and match the values
/// the host application ships with. The builder methods exist mainly so
/// tests can shrink the budgets; production hosts normally use
/// [`TaskConfig::default`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bgscan::config::TaskConfig;
/// use bgscan::types::TaskKind;
///
/// let config = TaskConfig::default().with_scan_wait_budget(Duration::from_secs(5));
/// assert_eq!(config.scan_wait_budget(), Duration::from_secs(5));
/// assert_eq!(
///     config.earliest_begin_offset(TaskKind::Processing),
///     Duration::from_secs(20 * 60)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TaskConfig {
    refresh_earliest_begin: Duration,
    processing_earliest_begin: Duration,
    scan_wait_budget: Duration,
    channel_name: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            refresh_earliest_begin: REFRESH_EARLIEST_BEGIN,
            processing_earliest_begin: PROCESSING_EARLIEST_BEGIN,
            scan_wait_budget: SCAN_WAIT_BUDGET,
            channel_name: BLE_CHANNEL_NAME.to_string(),
        }
    }
}

impl TaskConfig {
    /// Overrides the refresh task's earliest-begin offset.
    #[must_use]
    pub fn with_refresh_earliest_begin(mut self, offset: Duration) -> Self {
        self.refresh_earliest_begin = offset;
        self
    }

    /// Overrides the processing task's earliest-begin offset.
    #[must_use]
    pub fn with_processing_earliest_begin(mut self, offset: Duration) -> Self {
        self.processing_earliest_begin = offset;
        self
    }

    /// Overrides the wall-clock budget for one scan round trip.
    #[must_use]
    pub fn with_scan_wait_budget(mut self, budget: Duration) -> Self {
        self.scan_wait_budget = budget;
        self
    }

    /// Overrides the logical channel name.
    #[must_use]
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// The earliest-begin offset used when rescheduling `kind`.
    pub fn earliest_begin_offset(&self, kind: TaskKind) -> Duration {
        match kind {
            TaskKind::Refresh => self.refresh_earliest_begin,
            TaskKind::Processing => self.processing_earliest_begin,
        }
    }

    /// The wall-clock budget for one scan round trip.
    pub fn scan_wait_budget(&self) -> Duration {
        self.scan_wait_budget
    }

    /// The logical channel name requests are sent over.
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_constants() {
        let config = TaskConfig::default();
        assert_eq!(
            config.earliest_begin_offset(TaskKind::Refresh),
            Duration::from_secs(15 * 60)
        );
        assert_eq!(
            config.earliest_begin_offset(TaskKind::Processing),
            Duration::from_secs(20 * 60)
        );
        assert_eq!(config.scan_wait_budget(), Duration::from_secs(25));
        assert_eq!(config.channel_name(), "com.smartattendance.app/ble");
    }

    #[test]
    fn builders_override_defaults() {
        let config = TaskConfig::default()
            .with_refresh_earliest_begin(Duration::from_secs(1))
            .with_processing_earliest_begin(Duration::from_secs(2))
            .with_scan_wait_budget(Duration::from_secs(3))
            .with_channel_name("test/ble");
        assert_eq!(
            config.earliest_begin_offset(TaskKind::Refresh),
            Duration::from_secs(1)
        );
        assert_eq!(
            config.earliest_begin_offset(TaskKind::Processing),
            Duration::from_secs(2)
        );
        assert_eq!(config.scan_wait_budget(), Duration::from_secs(3));
        assert_eq!(config.channel_name(), "test/ble");
    }
}
