//! Task descriptors, the work-unit state machine, and the wire-shaped
//! submission/completion types.
//!
//! # Serialization
//!
//! [`TaskSubmission`] and [`TaskCompletion`] use
//! `#[serde(rename_all = "camelCase")]` so they match the field naming the
//! host runtime speaks on its side of the boundary.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::ScanMethod;
use crate::constants::{PROCESSING_TASK_IDENTIFIER, REFRESH_TASK_IDENTIFIER};
use crate::error::TaskError;

/// The two background task kinds the OS can grant to this application.
///
/// A kind is an immutable, compile-time descriptor: it maps to the OS task
/// identifier and to the channel method a triggered execution invokes.
///
/// # Examples
///
/// ```
/// use bgscan::channel::ScanMethod;
/// use bgscan::types::TaskKind;
///
/// assert_eq!(TaskKind::Refresh.identifier(), "com.smartattendance.app.refresh");
/// assert_eq!(TaskKind::Processing.scan_method(), ScanMethod::ExtendedBackgroundScan);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Short app-refresh window (plain scan).
    Refresh,
    /// Longer processing window (extended scan).
    Processing,
}

impl TaskKind {
    /// Both kinds, in registration order.
    pub const ALL: [TaskKind; 2] = [Self::Refresh, Self::Processing];

    /// The OS task identifier this kind registers and submits under.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Refresh => REFRESH_TASK_IDENTIFIER,
            Self::Processing => PROCESSING_TASK_IDENTIFIER,
        }
    }

    /// The channel method one execution of this kind invokes.
    pub fn scan_method(&self) -> ScanMethod {
        match self {
            Self::Refresh => ScanMethod::BackgroundScan,
            Self::Processing => ScanMethod::ExtendedBackgroundScan,
        }
    }

    /// Resolves a kind from its OS task identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.identifier() == identifier)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => write!(f, "refresh"),
            Self::Processing => write!(f, "processing"),
        }
    }
}

/// Work-unit lifecycle phase.
///
/// A work unit progresses `Idle -> Executing -> Finished`, with one guarded
/// shortcut: a unit cancelled before it ever started goes `Idle -> Finished`
/// directly. `Finished` is terminal; cancellation is not a separate terminal
/// state, it is a flag on the unit that always resolves to `Finished`.
///
/// # State Machine
///
/// ```text
/// Idle      -> Executing, Finished (pre-cancelled shortcut)
/// Executing -> Finished
/// Finished  -> (terminal, no transitions)
/// ```
///
/// # Examples
///
/// ```
/// use bgscan::types::WorkPhase;
///
/// assert!(WorkPhase::Idle.can_transition_to(&WorkPhase::Executing));
/// assert!(WorkPhase::Idle.can_transition_to(&WorkPhase::Finished));
/// assert!(!WorkPhase::Finished.can_transition_to(&WorkPhase::Executing));
/// assert!(!WorkPhase::Executing.can_transition_to(&WorkPhase::Executing));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPhase {
    /// Created, not yet started.
    Idle,
    /// Actively waiting on the scan round trip.
    Executing,
    /// Done; the completion report has been (or is about to be) issued.
    Finished,
}

impl fmt::Display for WorkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Executing => write!(f, "executing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

impl WorkPhase {
    /// Returns `true` if this phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns `true` if transitioning from this phase to `next` is valid.
    ///
    /// Self-transitions are rejected.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        if self == next {
            return false;
        }

        match self {
            Self::Idle => matches!(next, Self::Executing | Self::Finished),
            Self::Executing => matches!(next, Self::Finished),
            Self::Finished => false,
        }
    }

    /// Validates a transition from this phase to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] when the transition is not
    /// part of the state machine.
    pub fn validate_transition(&self, next: &Self) -> Result<(), TaskError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TaskError::InvalidTransition {
                from: *self,
                to: *next,
            })
        }
    }
}

/// A scheduling request handed to the OS scheduler.
///
/// Submissions are requests, not guarantees: the OS decides actual timing
/// from system policy. The two `requires_*` flags are always `false` here --
/// scans must run regardless of charger or network state.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bgscan::types::{TaskKind, TaskSubmission};
///
/// let submission = TaskSubmission::new(TaskKind::Processing, Duration::from_secs(20 * 60));
/// assert_eq!(submission.identifier, "com.smartattendance.app.bleProcessing");
///
/// let json = serde_json::to_value(&submission).unwrap();
/// assert_eq!(json["requiresExternalPower"], false);
/// assert!(json.get("earliestBegin").is_some());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    /// The OS task identifier being requested.
    pub identifier: &'static str,

    /// Earliest point in time the OS may run the task.
    pub earliest_begin: DateTime<Utc>,

    /// Whether the task needs network connectivity. Always `false`.
    pub requires_network_connectivity: bool,

    /// Whether the task needs the device on external power. Always `false`.
    pub requires_external_power: bool,
}

impl TaskSubmission {
    /// Builds a submission for `kind` beginning no earlier than `offset`
    /// from now.
    pub fn new(kind: TaskKind, offset: Duration) -> Self {
        let offset = TimeDelta::from_std(offset).unwrap_or(TimeDelta::MAX);
        Self {
            identifier: kind.identifier(),
            earliest_begin: Utc::now()
                .checked_add_signed(offset)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            requires_network_connectivity: false,
            requires_external_power: false,
        }
    }

    /// The kind this submission requests, resolved from its identifier.
    pub fn kind(&self) -> Option<TaskKind> {
        TaskKind::from_identifier(self.identifier)
    }
}

/// The single completion report one execution delivers to the OS handle.
///
/// `cancelled` implies `success == false`; a cancelled unit still reports
/// completion, it never just disappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    /// The kind that was executed.
    pub kind: TaskKind,

    /// Whether the execution succeeded (response arrived in time with no
    /// error payload).
    pub success: bool,

    /// Whether the unit was cancelled (deadline or expiration signal).
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_identifiers_match_manifest_entries() {
        assert_eq!(
            TaskKind::Refresh.identifier(),
            "com.smartattendance.app.refresh"
        );
        assert_eq!(
            TaskKind::Processing.identifier(),
            "com.smartattendance.app.bleProcessing"
        );
    }

    #[test]
    fn kind_round_trips_through_identifier() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskKind::from_identifier(kind.identifier()), Some(kind));
        }
        assert_eq!(TaskKind::from_identifier("com.example.other"), None);
    }

    #[test]
    fn kind_maps_to_scan_method() {
        assert_eq!(TaskKind::Refresh.scan_method(), ScanMethod::BackgroundScan);
        assert_eq!(
            TaskKind::Processing.scan_method(),
            ScanMethod::ExtendedBackgroundScan
        );
    }

    #[test]
    fn phase_display_matches_serde() {
        assert_eq!(WorkPhase::Idle.to_string(), "idle");
        assert_eq!(WorkPhase::Executing.to_string(), "executing");
        assert_eq!(WorkPhase::Finished.to_string(), "finished");
        assert_eq!(serde_json::to_value(WorkPhase::Idle).unwrap(), "idle");
        assert_eq!(
            serde_json::to_value(WorkPhase::Executing).unwrap(),
            "executing"
        );
    }

    #[test]
    fn valid_transitions() {
        assert!(WorkPhase::Idle.can_transition_to(&WorkPhase::Executing));
        assert!(WorkPhase::Idle.can_transition_to(&WorkPhase::Finished));
        assert!(WorkPhase::Executing.can_transition_to(&WorkPhase::Finished));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!WorkPhase::Executing.can_transition_to(&WorkPhase::Idle));
        assert!(!WorkPhase::Finished.can_transition_to(&WorkPhase::Idle));
        assert!(!WorkPhase::Finished.can_transition_to(&WorkPhase::Executing));
        for phase in [WorkPhase::Idle, WorkPhase::Executing, WorkPhase::Finished] {
            assert!(!phase.can_transition_to(&phase), "{phase} -> {phase}");
        }
    }

    #[test]
    fn validate_transition_reports_both_phases() {
        let err = WorkPhase::Finished
            .validate_transition(&WorkPhase::Executing)
            .unwrap_err();
        assert!(err.to_string().contains("finished"));
        assert!(err.to_string().contains("executing"));
    }

    #[test]
    fn submission_earliest_begin_respects_offset() {
        let before = Utc::now();
        let submission = TaskSubmission::new(TaskKind::Refresh, Duration::from_secs(15 * 60));
        assert!(submission.earliest_begin >= before + TimeDelta::seconds(15 * 60));
        assert_eq!(submission.kind(), Some(TaskKind::Refresh));
    }

    #[test]
    fn submission_serializes_camel_case() {
        let submission = TaskSubmission::new(TaskKind::Processing, Duration::from_secs(60));
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["identifier"], "com.smartattendance.app.bleProcessing");
        assert_eq!(json["requiresNetworkConnectivity"], false);
        assert_eq!(json["requiresExternalPower"], false);
        assert!(json.get("earliestBegin").is_some());
    }

    #[test]
    fn completion_serializes_camel_case() {
        let completion = TaskCompletion {
            kind: TaskKind::Refresh,
            success: false,
            cancelled: true,
        };
        let json = serde_json::to_value(completion).unwrap();
        assert_eq!(json["kind"], "refresh");
        assert_eq!(json["success"], false);
        assert_eq!(json["cancelled"], true);
    }
}
