//! Dashboard analytics.
//!
//! Filtering, summary statistics and chart aggregates derived from a
//! decoded record batch.

pub mod aggregator;
pub mod buckets;

pub use aggregator::*;
