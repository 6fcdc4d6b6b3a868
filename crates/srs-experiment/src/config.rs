//! Experiment configuration.
//!
//! A prepared [`ExperimentConfig`] value is all the driver accepts; loading
//! it from a file is an application concern (everything here derives
//! `Deserialize`, so `serde_json`/`toml` readers bolt on directly).

use std::collections::BTreeMap;

use serde::Deserialize;
use srs_core::{Cost, SimRng};
use srs_routing::RoutingConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    /// Root seed; every stream in the experiment derives from it.
    pub seed: u64,
    /// Independently simulated candidates, keyed by display name.
    pub candidates: BTreeMap<String, CandidateConfig>,
    pub measurement: MeasurementConfig,
    /// Metric names to scrape; empty means all known metrics.
    #[serde(default)]
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MeasurementConfig {
    /// Total simulation ticks.
    pub steps: u64,
    /// Number of scrapes across the run (`1 ≤ samples ≤ steps`).
    pub samples: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateConfig {
    pub network: NetworkConfig,
    pub routing: RoutingConfig,
    /// Per-tick probability that each connected link is ruined and replaced.
    #[serde(default)]
    pub link_fail_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub node_count: usize,
    #[serde(flatten)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub cost_distribution: CostDistribution,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TopologyConfig {
    /// G(n, p): every directed pair gets a link with probability `density`.
    Gilbert { density: f64 },
    /// Ring lattice of `degree` neighbors, each edge rewired with
    /// probability `beta`.
    WattsStrogatz { degree: usize, beta: f64 },
}

/// How link costs are drawn, one value per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostDistribution {
    /// Every hop costs 1.
    #[default]
    Same,
    /// Uniform in `[0, 1)` per direction.
    Uniform,
}

impl CostDistribution {
    pub fn sample(self, rng: &mut SimRng) -> (Cost, Cost) {
        match self {
            CostDistribution::Same => (1.0, 1.0),
            CostDistribution::Uniform => (rng.random_f64(), rng.random_f64()),
        }
    }
}
