//! Metric names for courier, recorded through the `metrics` crate facade.
//!
//! Nothing is exported until the embedding application installs a recorder;
//! without one every call is a no-op.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_metrics::{auto_reply, counter, labels};
//!
//! counter!(auto_reply::REPLIES_SKIPPED_TOTAL, labels::REASON => "empty").increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
