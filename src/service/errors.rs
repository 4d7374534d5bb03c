//! Summary service errors

use crate::cache::CacheError;
use crate::single_flight::envelope::SERIALIZATION_ERROR_CODE;
use crate::single_flight::{FailureCode, FlightError};
use std::time::Duration;
use thiserror::Error;

pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const CACHE_UNAVAILABLE: &str = "CACHE_UNAVAILABLE";
pub const GENERATOR_UNAVAILABLE: &str = "GENERATOR_UNAVAILABLE";
pub const GENERATION_FAILED: &str = "GENERATION_FAILED";
pub const EMPTY_SUMMARY: &str = "EMPTY_SUMMARY";
pub const TIMEOUT: &str = "TIMEOUT";
pub const COORDINATION_FAILED: &str = "COORDINATION_FAILED";
pub const CORRUPT_RESULT: &str = "CORRUPT_RESULT";
pub const CANCELLED: &str = "CANCELLED";

/// How a caller should react to a [`SummaryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself is wrong; retrying will not help
    BadInput,
    /// A dependency is degraded; retry later
    TemporarilyUnavailable,
    /// The summary could not be produced
    Failure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadInput => "bad_input",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::Failure => "failure",
        }
    }
}

/// Errors returned by [`SummaryService::get`](super::SummaryService::get)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SummaryError {
    #[error("Invalid summary request: {0}")]
    InvalidInput(String),

    /// The cache pre-check failed, so generation was refused
    #[error("Summary cache unavailable: {0}")]
    CacheUnavailable(#[source] CacheError),

    #[error("Summary generator '{generator}' is unavailable")]
    GeneratorUnavailable { generator: String },

    /// Generator call failed; `message` is already user-facing
    #[error("{message}")]
    GenerationFailed { code: String, message: String },

    #[error("Summary generator returned an empty summary")]
    EmptySummary,

    #[error("Timed out after {0:?} waiting for an in-flight summary")]
    Timeout(Duration),

    #[error("Summary coordination failed: {0}")]
    Coordination(String),

    #[error("Coalesced summary result is corrupt: {0}")]
    CorruptResult(String),

    #[error("Summary generation was abandoned before completing")]
    Cancelled,
}

impl SummaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::BadInput,
            Self::CacheUnavailable(_)
            | Self::GeneratorUnavailable { .. }
            | Self::Timeout(_)
            | Self::Coordination(_)
            | Self::Cancelled => ErrorKind::TemporarilyUnavailable,
            Self::GenerationFailed { .. } | Self::EmptySummary | Self::CorruptResult(_) => {
                ErrorKind::Failure
            }
        }
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            code: GENERATION_FAILED.to_string(),
            message: message.into(),
        }
    }

    /// Rebuild the error a flight leader published
    ///
    /// Leader and followers both pass through here, so every caller of one
    /// flight sees the same variant. `generator` names the local generator,
    /// since envelopes only carry a code and a message.
    pub fn from_flight(error: FlightError, generator: &str) -> Self {
        match error {
            FlightError::Failed { code, message, .. } => match code.as_str() {
                GENERATOR_UNAVAILABLE => Self::GeneratorUnavailable {
                    generator: generator.to_string(),
                },
                EMPTY_SUMMARY => Self::EmptySummary,
                INVALID_INPUT => Self::InvalidInput(message),
                SERIALIZATION_ERROR_CODE | CORRUPT_RESULT => Self::CorruptResult(message),
                _ => Self::GenerationFailed { code, message },
            },
            FlightError::Timeout { waited, .. } => Self::Timeout(waited),
            FlightError::Corrupted { reason, .. } => Self::CorruptResult(reason),
            FlightError::Store { source, .. } => Self::Coordination(source.to_string()),
            FlightError::Cancelled { .. } => Self::Cancelled,
        }
    }
}

impl FailureCode for SummaryError {
    fn failure_code(&self) -> &str {
        match self {
            Self::InvalidInput(_) => INVALID_INPUT,
            Self::CacheUnavailable(_) => CACHE_UNAVAILABLE,
            Self::GeneratorUnavailable { .. } => GENERATOR_UNAVAILABLE,
            Self::GenerationFailed { code, .. } => code,
            Self::EmptySummary => EMPTY_SUMMARY,
            Self::Timeout(_) => TIMEOUT,
            Self::Coordination(_) => COORDINATION_FAILED,
            Self::CorruptResult(_) => CORRUPT_RESULT,
            Self::Cancelled => CANCELLED,
        }
    }
}
