//! `srs-metrics` — routing-quality evaluation.
//!
//! Metrics compare what routers *claim* against ground truth derived from the
//! fabric itself: a [`CostGraph`] adjacency snapshot, Warshall reachability,
//! and Floyd–Warshall all-pairs distances.  Routers never see any of this;
//! they only ever learn through control messages.

pub mod calculator;
pub mod error;
pub mod graph;

#[cfg(test)]
mod tests;

pub use calculator::{Metric, MetricsCalculator};
pub use error::{MetricsError, MetricsResult};
pub use graph::{CostGraph, distances, from_links, reachabilities};
