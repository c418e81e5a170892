//! Log-only observer for Bluetooth central events.
//!
//! The host runtime owns the actual central manager; this crate only
//! receives its notifications -- power/authorization state changes, the
//! restoration payload when the process is relaunched for a Bluetooth
//! event, and peripheral discoveries -- and records them in the log.
//! There is deliberately no behavior here beyond logging; the scanning
//! logic that would react to these events lives on the collaborator side
//! of the channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::constants::BLE_RESTORE_IDENTIFIER;

/// Bluetooth central manager state, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralState {
    /// Radio is on and usable.
    PoweredOn,
    /// Radio is off.
    PoweredOff,
    /// The app lacks Bluetooth permission.
    Unauthorized,
    /// The device has no usable Bluetooth hardware.
    Unsupported,
    /// The stack is resetting; a new state will follow.
    Resetting,
    /// State not yet known.
    Unknown,
}

impl fmt::Display for CentralState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoweredOn => write!(f, "powered_on"),
            Self::PoweredOff => write!(f, "powered_off"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Resetting => write!(f, "resetting"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A previously-known peripheral handed back during state restoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeripheralHandle {
    /// Host-assigned peripheral identifier.
    pub id: Uuid,
    /// Advertised name, when known.
    pub name: Option<String>,
}

/// Restoration payload delivered when the process is relaunched for a
/// Bluetooth background event: the peripherals the central was tracking
/// and the service identifiers it was scanning for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationState {
    /// Previously-known peripheral handles.
    pub peripherals: Vec<PeripheralHandle>,
    /// Service identifiers the central was scanning for.
    pub service_ids: Vec<Uuid>,
}

/// Receives central events from the host and logs them.
///
/// # Examples
///
/// ```
/// use bgscan::bluetooth::{CentralMonitor, CentralState};
///
/// let monitor = CentralMonitor::new();
/// assert_eq!(monitor.restore_identifier(), "com.smartattendance.app.ble");
/// monitor.state_changed(CentralState::PoweredOn);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CentralMonitor {
    _private: (),
}

impl CentralMonitor {
    /// Creates a monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The restoration identifier the host should create its central
    /// manager with.
    pub fn restore_identifier(&self) -> &'static str {
        BLE_RESTORE_IDENTIFIER
    }

    /// Central manager state changed.
    pub fn state_changed(&self, state: CentralState) {
        match state {
            CentralState::PoweredOn => info!("bluetooth is powered on"),
            CentralState::PoweredOff => warn!("bluetooth is powered off"),
            CentralState::Unauthorized => error!("bluetooth unauthorized"),
            CentralState::Unsupported => error!("bluetooth unsupported"),
            CentralState::Resetting => warn!("bluetooth resetting"),
            CentralState::Unknown => warn!("bluetooth state unknown"),
        }
    }

    /// State restoration triggered; the payload describes what the central
    /// was doing before the process was killed.
    pub fn will_restore(&self, state: &RestorationState) {
        info!(
            peripherals = state.peripherals.len(),
            services = state.service_ids.len(),
            "bluetooth state restoration triggered"
        );
        for service in &state.service_ids {
            debug!(%service, "restored scan service");
        }
    }

    /// A peripheral was discovered while scanning.
    pub fn discovered(&self, peripheral: &PeripheralHandle, rssi: i16) {
        debug!(
            name = peripheral.name.as_deref().unwrap_or("unknown"),
            id = %peripheral.id,
            rssi,
            "discovered peripheral"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_display_matches_serde() {
        for state in [
            CentralState::PoweredOn,
            CentralState::PoweredOff,
            CentralState::Unauthorized,
            CentralState::Unsupported,
            CentralState::Resetting,
            CentralState::Unknown,
        ] {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, state.to_string(), "serde/display drift for {state}");
        }
    }

    #[test]
    fn restoration_payload_round_trip() {
        let state = RestorationState {
            peripherals: vec![PeripheralHandle {
                id: Uuid::new_v4(),
                name: Some("beacon-12".to_string()),
            }],
            service_ids: vec![Uuid::new_v4()],
        };
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("serviceIds").is_some());
        let back: RestorationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn monitor_events_do_not_panic() {
        let monitor = CentralMonitor::new();
        monitor.state_changed(CentralState::PoweredOff);
        monitor.will_restore(&RestorationState::default());
        monitor.discovered(
            &PeripheralHandle {
                id: Uuid::new_v4(),
                name: None,
            },
            -63,
        );
    }
}
