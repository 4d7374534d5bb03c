//! Crate-level errors
//!
//! Each layer has its own error enum; this one covers wiring the layers
//! together at startup.

use crate::config::ConfigurationError;
use crate::store::StoreError;
use thiserror::Error;

pub use crate::cache::CacheError;
pub use crate::service::{ErrorKind, SummaryError};
pub use crate::single_flight::FlightError;

#[derive(Debug, Error)]
pub enum SummaryCacheError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Store initialization failed: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SummaryCacheError>;
