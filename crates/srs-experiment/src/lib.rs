//! `srs-experiment` — drives candidates through ticks, perturbation, and
//! scrapes.
//!
//! | Module        | Contents                                            |
//! |---------------|-----------------------------------------------------|
//! | [`config`]    | `ExperimentConfig` and friends (serde)              |
//! | [`graphgen`]  | Gilbert / Watts–Strogatz topology generators        |
//! | [`candidate`] | `Candidate`: fabric + routers + ruin-and-recreate   |
//! | [`driver`]    | `Experiment` tick loop, `Sample`, `SampleSink`      |
//! | [`sink`]      | JSON-lines / CSV / in-memory sinks                  |

pub mod candidate;
pub mod config;
pub mod driver;
pub mod error;
pub mod graphgen;
pub mod sink;

#[cfg(test)]
mod tests;

pub use candidate::Candidate;
pub use config::{
    CandidateConfig, CostDistribution, ExperimentConfig, MeasurementConfig, NetworkConfig,
    TopologyConfig,
};
pub use driver::{Experiment, Sample, SampleSink};
pub use error::{ExperimentError, ExperimentResult};
pub use sink::{CsvSink, JsonLinesSink, MemorySink, SinkError};
