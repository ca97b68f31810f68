//! Signed reputation graph.
//!
//! This module provides graph construction (node intake, signed link
//! ingestion with opposite-edge cancellation) and the negative-rank
//! preprocessing step that runs before ranking.

pub mod builder;
pub mod negatives;

pub use builder::{Graph, NodeInput, NodeKind, DEFAULT_MAX_ITERATIONS, NEG_CONSUMER_ID};
