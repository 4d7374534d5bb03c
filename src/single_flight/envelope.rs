//! Result envelope published by a flight leader

use super::errors::{FailureCode, FlightError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Longest failure message kept in an envelope, in chars
pub const MAX_MESSAGE_CHARS: usize = 256;

/// Longest error code kept in an envelope, in chars
pub const MAX_CODE_CHARS: usize = 64;

/// Code used when a leader's value cannot be encoded for followers
pub const SERIALIZATION_ERROR_CODE: &str = "SERIALIZATION_ERROR";

/// Outcome of one flight, written once by the leader at `result:<flight key>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultEnvelope {
    pub fn success(payload: String) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error_code: None,
            message: None,
        }
    }

    /// Failure envelope with code and message truncated to their limits
    pub fn failure(code: &str, message: &str) -> Self {
        Self {
            success: false,
            payload: None,
            error_code: Some(truncate_chars(code, MAX_CODE_CHARS)),
            message: Some(truncate_chars(message, MAX_MESSAGE_CHARS)),
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str, flight_key: &str) -> Result<Self, FlightError> {
        serde_json::from_str(raw).map_err(|e| FlightError::Corrupted {
            flight_key: flight_key.to_string(),
            reason: format!("envelope is not valid JSON: {e}"),
        })
    }

    /// Replay the envelope as the flight's result
    pub fn into_result<T: DeserializeOwned>(self, flight_key: &str) -> Result<T, FlightError> {
        if !self.success {
            return Err(FlightError::Failed {
                flight_key: flight_key.to_string(),
                code: self.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: self.message.unwrap_or_default(),
            });
        }

        let payload = self.payload.ok_or_else(|| FlightError::Corrupted {
            flight_key: flight_key.to_string(),
            reason: "success envelope without payload".to_string(),
        })?;

        serde_json::from_str(&payload).map_err(|e| FlightError::Corrupted {
            flight_key: flight_key.to_string(),
            reason: format!("payload does not decode: {e}"),
        })
    }
}

/// Turn a leader's result into what the leader returns and what it publishes
///
/// A failure comes back as the same [`FlightError::Failed`] followers will
/// decode from the envelope. A value that cannot be encoded is still returned
/// to the leader, while followers receive a serialization failure.
pub(crate) fn settle<T, E>(flight_key: &str, result: Result<T, E>) -> (Result<T, FlightError>, ResultEnvelope)
where
    T: Serialize,
    E: Display + FailureCode,
{
    match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(payload) => (Ok(value), ResultEnvelope::success(payload)),
            Err(e) => (
                Ok(value),
                ResultEnvelope::failure(SERIALIZATION_ERROR_CODE, &e.to_string()),
            ),
        },
        Err(error) => {
            let envelope = ResultEnvelope::failure(error.failure_code(), &error.to_string());
            let replayed = FlightError::Failed {
                flight_key: flight_key.to_string(),
                code: envelope.error_code.clone().unwrap_or_default(),
                message: envelope.message.clone().unwrap_or_default(),
            };
            (Err(replayed), envelope)
        }
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}
