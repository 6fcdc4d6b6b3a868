//! The experiment tick loop.

use std::collections::BTreeMap;

use serde::Serialize;
use srs_core::SimRng;
use srs_metrics::Metric;
use tracing::info;

use crate::candidate::Candidate;
use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, ExperimentResult};

/// One scrape across all candidates, as emitted to the sample sink.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Sample {
    pub candidates: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Receives sample records as the experiment runs.
///
/// Sinks keep their own failure state (an I/O error must not abort the
/// simulation mid-run); check it after `run` returns.
pub trait SampleSink {
    fn emit(&mut self, step: u64, sample: &Sample);

    /// Called once after the final sample.
    fn finish(&mut self) {}
}

pub struct Experiment {
    candidates: BTreeMap<String, Candidate>,
    metrics: Vec<Metric>,
    steps: u64,
    scrape_interval: u64,
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment").finish_non_exhaustive()
    }
}

impl Experiment {
    /// Validate the configuration and assemble every candidate, each with a
    /// child stream of the root seed.
    pub fn from_config(config: &ExperimentConfig) -> ExperimentResult<Experiment> {
        let steps = config.measurement.steps;
        let samples = config.measurement.samples;
        if steps == 0 {
            return Err(ExperimentError::Config("steps must be positive".into()));
        }
        if samples == 0 || samples > steps {
            return Err(ExperimentError::Config(format!(
                "samples must lie in 1..={steps}, got {samples}"
            )));
        }
        if config.candidates.is_empty() {
            return Err(ExperimentError::Config("no candidates configured".into()));
        }

        let metrics = if config.metrics.is_empty() {
            Metric::ALL.to_vec()
        } else {
            config
                .metrics
                .iter()
                .map(|name| Metric::from_name(name))
                .collect::<Result<_, _>>()?
        };

        let mut rng = SimRng::new(config.seed);
        let mut candidates = BTreeMap::new();
        for (offset, (name, candidate_config)) in config.candidates.iter().enumerate() {
            let candidate = Candidate::from_config(candidate_config, rng.child(offset as u64))?;
            candidates.insert(name.clone(), candidate);
        }

        Ok(Experiment {
            candidates,
            metrics,
            steps,
            scrape_interval: steps / samples,
        })
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn candidate(&self, name: &str) -> Option<&Candidate> {
        self.candidates.get(name)
    }

    /// Run to the configured step count, scraping every `scrape_interval`
    /// steps and once more after the loop.
    pub fn run(&mut self, sink: &mut dyn SampleSink) -> ExperimentResult<()> {
        info!(steps = self.steps, candidates = self.candidates.len(), "experiment start");
        for step in 0..self.steps {
            if step % self.scrape_interval == 0 {
                let sample = self.scrape()?;
                sink.emit(step, &sample);
            }
            self.run_step()?;
        }
        let sample = self.scrape()?;
        sink.emit(self.steps, &sample);
        sink.finish();
        info!("experiment complete");
        Ok(())
    }

    /// Tick every candidate once, in name order.
    pub fn run_step(&mut self) -> ExperimentResult<()> {
        for candidate in self.candidates.values_mut() {
            candidate.run_step()?;
        }
        Ok(())
    }

    pub fn scrape(&self) -> ExperimentResult<Sample> {
        let mut candidates = BTreeMap::new();
        for (name, candidate) in &self.candidates {
            candidates.insert(name.clone(), candidate.scrape(&self.metrics)?);
        }
        Ok(Sample { candidates })
    }
}
