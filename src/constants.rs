//! Identifiers and time budgets shared across the crate.
//!
//! The string constants mirror what the host application registers with the
//! OS; the durations are the default scheduling offsets and the wall-clock
//! budget for one scan round trip. All of them can be overridden through
//! [`TaskConfig`](crate::config::TaskConfig) except the identifiers, which
//! must match the host's manifest entries exactly.

use std::time::Duration;

/// Identifier of the app-refresh background task.
pub const REFRESH_TASK_IDENTIFIER: &str = "com.smartattendance.app.refresh";

/// Identifier of the processing background task (longer BLE operations).
pub const PROCESSING_TASK_IDENTIFIER: &str = "com.smartattendance.app.bleProcessing";

/// Name of the logical channel to the external BLE collaborator.
pub const BLE_CHANNEL_NAME: &str = "com.smartattendance.app/ble";

/// Restoration identifier handed to the Bluetooth central manager.
pub const BLE_RESTORE_IDENTIFIER: &str = "com.smartattendance.app.ble";

/// Default earliest-begin offset for the refresh task (OS minimum).
pub const REFRESH_EARLIEST_BEGIN: Duration = Duration::from_secs(15 * 60);

/// Default earliest-begin offset for the processing task.
pub const PROCESSING_EARLIEST_BEGIN: Duration = Duration::from_secs(20 * 60);

/// Wall-clock budget for one scan round trip. The OS grants roughly 30
/// seconds per window; 25 leaves headroom to report completion.
pub const SCAN_WAIT_BUDGET: Duration = Duration::from_secs(25);
