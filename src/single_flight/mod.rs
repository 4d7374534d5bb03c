//! # Single-Flight Coordination
//!
//! Collapses concurrent requests for the same flight key into one execution,
//! across every process sharing the store. The leader is elected with an
//! atomic set-if-absent lock, publishes a [`ResultEnvelope`], and followers
//! poll for it with exponential backoff. When the store cannot be read the
//! coordinator falls back to [`LocalFlights`], which coalesces within the
//! current process only.
//!
//! Operation failures are published too, so followers fail fast with the
//! leader's code instead of retrying the work.

pub mod coordinator;
pub mod envelope;
pub mod errors;
pub mod local;

pub use coordinator::{lock_key, result_key, SingleFlightCoordinator};
pub use envelope::ResultEnvelope;
pub use errors::{FailureCode, FlightError};
pub use local::LocalFlights;
