//! Store error types

use thiserror::Error;

/// Reason a guarded store call was refused before reaching the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// Circuit breaker is open
    CircuitOpen,
    /// Bulkhead had no free permit within the wait budget
    BulkheadFull,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CircuitOpen => "circuit_open",
            Self::BulkheadFull => "bulkhead_full",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during key-value store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to connect to the store backend
    #[error("Store connection error: {0}")]
    ConnectionError(String),

    /// Store call exceeded the per-call timeout
    #[error("Store operation timed out: {0}")]
    Timeout(String),

    /// Backend answered with an error
    #[error("Store backend error: {0}")]
    BackendError(String),

    /// Call shed by the store policy without a round trip
    #[error("Store unavailable ({reason}) for {component}")]
    Unavailable {
        component: String,
        reason: RejectionReason,
    },
}

impl StoreError {
    /// True when the call never reached the backend
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
