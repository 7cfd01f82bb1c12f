//! Error types for bridge operations.

use std::time::Duration;

use listing::{ListingError, Outcome};
use thiserror::Error;

/// Errors surfaced by [`Android`](crate::Android) operations.
///
/// Callers that only care about the empty value of an operation can use
/// `unwrap_or_default()`; the variants let everyone else tell "no devices"
/// apart from "adb is not installed".
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The adb executable is not configured or missing.
    #[error("adb is not available: {0}")]
    Unavailable(String),

    /// The adb process could not be launched.
    #[error("failed to launch adb: {0}")]
    Spawn(#[source] std::io::Error),

    /// adb did not exit before the configured deadline and was killed.
    #[error("adb did not finish within {0:?}")]
    Timeout(Duration),

    /// The serial is unknown to adb.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The adb server could not be started or reached.
    #[error("adb daemon is not running and could not be started")]
    DaemonUnavailable,

    /// A device path does not exist.
    #[error("path not found on device: {0}")]
    PathNotFound(String),

    /// adb printed an error this crate has no variant for.
    #[error("unrecognized adb output: {0}")]
    Unrecognized(String),

    /// The listing could not be reconciled.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// Reading output or waiting on the process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Maps an outcome that means the device or daemon is unusable.
    ///
    /// `Success` and `PathNotFound` return `None`: what a missing path means
    /// depends on the operation.
    pub fn from_outcome(outcome: Outcome, device_id: &str) -> Option<Self> {
        match outcome {
            Outcome::Success | Outcome::PathNotFound => None,
            Outcome::DeviceNotFound => Some(BridgeError::DeviceNotFound(device_id.to_string())),
            Outcome::DaemonUnavailable => Some(BridgeError::DaemonUnavailable),
            Outcome::Unrecognized(line) => Some(BridgeError::Unrecognized(line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = BridgeError::Unavailable("adb path is empty".to_string());
        assert_eq!(err.to_string(), "adb is not available: adb path is empty");
    }

    #[test]
    fn test_timeout_display() {
        let err = BridgeError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "adb did not finish within 60s");
    }

    #[test]
    fn test_device_not_found_display() {
        let err = BridgeError::DeviceNotFound("ABC123".to_string());
        assert_eq!(err.to_string(), "device not found: ABC123");
    }

    #[test]
    fn test_listing_error_is_transparent() {
        let err: BridgeError = ListingError::ReconciliationMismatch {
            folder: ".".to_string(),
            expected: 1,
            found: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "reconciliation mismatch in '.': 1 reference names, 2 entries"
        );
    }

    #[test]
    fn test_from_outcome() {
        assert!(BridgeError::from_outcome(Outcome::Success, "A").is_none());
        assert!(BridgeError::from_outcome(Outcome::PathNotFound, "A").is_none());
        assert!(matches!(
            BridgeError::from_outcome(Outcome::DeviceNotFound, "A"),
            Some(BridgeError::DeviceNotFound(id)) if id == "A"
        ));
        assert!(matches!(
            BridgeError::from_outcome(Outcome::DaemonUnavailable, "A"),
            Some(BridgeError::DaemonUnavailable)
        ));
        assert!(matches!(
            BridgeError::from_outcome(Outcome::Unrecognized("error: closed".into()), "A"),
            Some(BridgeError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgeError>();
    }
}
