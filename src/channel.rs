//! Request/response seam to the external BLE collaborator.
//!
//! The collaborator that performs the actual scanning lives in a separate
//! runtime and is reachable only through a named logical channel
//! ([`BLE_CHANNEL_NAME`](crate::constants::BLE_CHANNEL_NAME)). This module
//! defines the two request kinds, the response payload, the [`ScanChannel`]
//! trait implementations bridge through, and a scriptable
//! [`MockScanChannel`] for tests.
//!
//! One work unit performs exactly one [`invoke`](ScanChannel::invoke) per
//! execution; enforcing the wait budget is the executor's job, not the
//! channel's.

use std::fmt;
use std::future::pending;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// The two request kinds the channel understands.
///
/// Neither carries a payload; the method name alone tells the collaborator
/// whether to run a plain or an extended scan.
///
/// # Examples
///
/// ```
/// use bgscan::channel::ScanMethod;
///
/// assert_eq!(ScanMethod::BackgroundScan.wire_name(), "performBackgroundScan");
/// assert_eq!(
///     serde_json::to_value(ScanMethod::ExtendedBackgroundScan).unwrap(),
///     "performExtendedBackgroundScan"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanMethod {
    /// Short scan, invoked by the refresh task.
    #[serde(rename = "performBackgroundScan")]
    BackgroundScan,
    /// Extended scan, invoked by the processing task.
    #[serde(rename = "performExtendedBackgroundScan")]
    ExtendedBackgroundScan,
}

impl ScanMethod {
    /// The method name as it appears on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::BackgroundScan => "performBackgroundScan",
            Self::ExtendedBackgroundScan => "performExtendedBackgroundScan",
        }
    }
}

impl fmt::Display for ScanMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Response from the collaborator: a bare acknowledgment or an error
/// payload carrying a message string.
///
/// # Examples
///
/// ```
/// use bgscan::channel::ScanResponse;
///
/// let ack: ScanResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
/// assert!(!ack.is_error());
///
/// let err = ScanResponse::error("bluetooth powered off");
/// let json = serde_json::to_value(&err).unwrap();
/// assert_eq!(json["status"], "error");
/// assert_eq!(json["message"], "bluetooth powered off");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScanResponse {
    /// The scan completed with no error.
    Ok,
    /// The scan failed on the collaborator's side.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl ScanResponse {
    /// Builds an error response with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns `true` if this response carries an error payload.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Converts the response into a result, attributing failures to `method`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ScanFailed`] for error payloads.
    pub fn into_result(self, method: ScanMethod) -> Result<()> {
        match self {
            Self::Ok => Ok(()),
            Self::Error { message } => Err(TaskError::ScanFailed { method, message }),
        }
    }
}

/// The boundary to the external BLE collaborator.
///
/// Implementations bridge a single request to whatever runtime owns the
/// scanning logic and resolve with its response. They must not enforce a
/// deadline of their own -- the executor races `invoke` against the wait
/// budget and the expiration signal, and drops the future when either wins.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the two task kinds may execute
/// concurrently and each holds a shared handle to the channel.
#[async_trait]
pub trait ScanChannel: Send + Sync {
    /// Sends one request and waits for the collaborator's response.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ChannelClosed`] when the collaborator is gone
    /// and a response can never arrive.
    async fn invoke(&self, method: ScanMethod) -> Result<ScanResponse>;
}

// ---- MockScanChannel: scriptable collaborator for tests ----

/// What the mock does with an invocation.
#[derive(Debug, Clone)]
enum MockBehavior {
    /// Respond with the payload after the delay.
    Respond(Duration, ScanResponse),
    /// Never respond; the caller's deadline or expiration must fire.
    Silent,
    /// Fail the invocation itself, as if the collaborator vanished.
    Closed,
}

/// Scriptable [`ScanChannel`] for tests and examples.
///
/// Records every invoked method and answers according to a fixed script:
/// acknowledge, fail, stay silent, or report the channel closed -- each
/// optionally after a delay (driven by `tokio::time`, so paused-time tests
/// stay fast).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bgscan::channel::{MockScanChannel, ScanChannel, ScanMethod, ScanResponse};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let channel = MockScanChannel::acknowledging();
/// let response = channel.invoke(ScanMethod::BackgroundScan).await.unwrap();
/// assert_eq!(response, ScanResponse::Ok);
/// assert_eq!(channel.invocations(), vec![ScanMethod::BackgroundScan]);
/// # });
/// ```
#[derive(Debug)]
pub struct MockScanChannel {
    behavior: MockBehavior,
    invocations: Mutex<Vec<ScanMethod>>,
}

impl MockScanChannel {
    /// A channel that acknowledges every request immediately.
    pub fn acknowledging() -> Self {
        Self::responding(ScanResponse::Ok, Duration::ZERO)
    }

    /// A channel that sends `response` after `delay`.
    pub fn responding(response: ScanResponse, delay: Duration) -> Self {
        Self {
            behavior: MockBehavior::Respond(delay, response),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// A channel that accepts requests but never responds.
    pub fn silent() -> Self {
        Self {
            behavior: MockBehavior::Silent,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// A channel whose collaborator has gone away.
    pub fn closed() -> Self {
        Self {
            behavior: MockBehavior::Closed,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Every method invoked so far, in order.
    pub fn invocations(&self) -> Vec<ScanMethod> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl ScanChannel for MockScanChannel {
    async fn invoke(&self, method: ScanMethod) -> Result<ScanResponse> {
        self.invocations.lock().push(method);
        match &self.behavior {
            MockBehavior::Respond(delay, response) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(response.clone())
            },
            MockBehavior::Silent => pending().await,
            MockBehavior::Closed => Err(TaskError::ChannelClosed),
        }
    }
}
