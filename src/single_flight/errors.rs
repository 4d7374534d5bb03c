//! Single-flight error types

use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`SingleFlightCoordinator::execute`](super::SingleFlightCoordinator::execute)
///
/// Every caller of the same flight observes the same variant: a leader's
/// failure is replayed to followers as [`FlightError::Failed`] with the
/// leader's code and message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlightError {
    /// No envelope appeared within the wait budget
    #[error("Timed out after {waited:?} waiting for flight '{flight_key}'")]
    Timeout { flight_key: String, waited: Duration },

    /// The leader's operation failed
    #[error("Flight '{flight_key}' failed [{code}]: {message}")]
    Failed {
        flight_key: String,
        code: String,
        message: String,
    },

    /// Envelope present but unusable
    #[error("Corrupt result envelope for flight '{flight_key}': {reason}")]
    Corrupted { flight_key: String, reason: String },

    /// Store failed while electing a leader or polling for the result
    #[error("Store error while coordinating flight '{flight_key}': {source}")]
    Store {
        flight_key: String,
        #[source]
        source: StoreError,
    },

    /// Local leader went away before settling
    #[error("Flight '{flight_key}' was abandoned before completing")]
    Cancelled { flight_key: String },
}

impl FlightError {
    pub fn flight_key(&self) -> &str {
        match self {
            FlightError::Timeout { flight_key, .. }
            | FlightError::Failed { flight_key, .. }
            | FlightError::Corrupted { flight_key, .. }
            | FlightError::Store { flight_key, .. }
            | FlightError::Cancelled { flight_key } => flight_key,
        }
    }
}

/// Classification attached to a failed operation
///
/// Published in the failure envelope so followers can rebuild the same
/// error kind the leader saw.
pub trait FailureCode {
    fn failure_code(&self) -> &str;
}

impl FailureCode for anyhow::Error {
    fn failure_code(&self) -> &str {
        "OPERATION_FAILED"
    }
}
