//! # Summary Service
//!
//! Read-through article summaries. [`SummaryService`] composes the
//! [`Cache`](crate::cache::Cache), the
//! [`SingleFlightCoordinator`](crate::single_flight::SingleFlightCoordinator)
//! and a pluggable [`SummaryGenerator`].
//!
//! ```text
//! get(id, input)
//!   validate ──────────────── InvalidInput
//!   cache pre-check ───────── Hit → served_from_cache
//!                  └───────── Error → CacheUnavailable
//!   single flight (Miss)
//!     leader: double-check → generate → put (best-effort)
//!     follower: wait for the leader's result
//! ```

pub mod errors;
pub mod generator;
pub mod summary_service;

pub use errors::{ErrorKind, SummaryError};
pub use generator::{SummaryGenerator, SummaryInput, SummaryResult};
pub use summary_service::{HealthReport, SummaryService};
