//! Self-renewing background task execution bridging BLE scans to an
//! external collaborator.
//!
//! Mobile operating systems grant suspended applications short, bounded
//! execution windows ("background tasks"). This crate implements the
//! lifecycle wrapper around those windows for an application whose actual
//! BLE scanning lives in a separate runtime reachable only through a named
//! request/response channel: it registers two task kinds (app-refresh and
//! processing) against an abstract scheduler, and on each trigger runs one
//! cancellable work unit that requests a scan from the collaborator, waits
//! up to a fixed budget, and reports success or failure back to the OS
//! handle exactly once.
//!
//! The OS background-task API and the cross-boundary channel are modelled
//! as traits ([`BackgroundScheduler`], [`ScanChannel`]), so the crate never
//! touches platform APIs directly and every path is testable in-process.
//!
//! # Overview
//!
//! - [`registrar`] - explicit registration of the two task kinds plus the
//!   host lifecycle hooks that re-arm scheduling.
//! - [`executor`] - the work-unit state machine and the single-execution
//!   algorithm (reschedule, request, bounded wait, report).
//! - [`scheduler`] - the abstract OS scheduler seam and the granted-task
//!   handle with its out-of-band expiration signal.
//! - [`channel`] - the request/response seam to the external BLE
//!   collaborator.
//! - [`bluetooth`] - log-only observer for Bluetooth central state changes
//!   and restoration payloads.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bgscan::channel::MockScanChannel;
//! use bgscan::config::TaskConfig;
//! use bgscan::registrar::TaskRegistrar;
//! use bgscan::scheduler::MockScheduler;
//! use bgscan::types::TaskKind;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let scheduler = Arc::new(MockScheduler::new());
//! let channel = Arc::new(MockScanChannel::acknowledging());
//! let registrar = TaskRegistrar::new(scheduler.clone(), channel, TaskConfig::default());
//!
//! registrar.register();
//!
//! let control = scheduler.trigger(TaskKind::Refresh).expect("handler bound");
//! let completion = control.completed().await.expect("reported once");
//! assert!(completion.success);
//! # });
//! ```

pub mod bluetooth;
pub mod channel;
pub mod config;
pub mod constants;
pub mod error;
pub mod executor;
pub mod registrar;
pub mod scheduler;
pub mod types;

// Re-exports for ergonomic access
pub use channel::{ScanChannel, ScanMethod, ScanResponse};
pub use config::TaskConfig;
pub use error::{Result, TaskError};
pub use executor::{TaskExecutor, WorkUnit};
pub use registrar::TaskRegistrar;
pub use scheduler::{BackgroundScheduler, GrantControl, GrantedTask};
pub use types::{TaskCompletion, TaskKind, TaskSubmission, WorkPhase};
