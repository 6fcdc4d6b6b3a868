//! smallworld — smallest complete experiment for the stack-route simulator.
//!
//! Races two candidates on the same class of small-world topology: a pure
//! flooding strategy against a search-assisted one, under mild link churn.
//! Samples land in `output/smallworld/` as JSON-lines and long-format CSV.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use srs_experiment::{
    CandidateConfig, CostDistribution, CsvSink, Experiment, ExperimentConfig, JsonLinesSink,
    MeasurementConfig, NetworkConfig, SampleSink, TopologyConfig,
};
use srs_routing::{PropagationConfig, RandomRouteParams, RoutingConfig, ShortestRouteParams,
    StoreConfig};

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED: u64 = 42;
const NODE_COUNT: usize = 24;
const STEPS: u64 = 400;
const SAMPLES: u64 = 40;
const LINK_FAIL_RATE: f64 = 0.002;

// ── Candidate definitions ─────────────────────────────────────────────────────

fn network_config() -> NetworkConfig {
    NetworkConfig {
        node_count: NODE_COUNT,
        topology: TopologyConfig::WattsStrogatz {
            degree: 4,
            beta: 0.2,
        },
        cost_distribution: CostDistribution::Uniform,
    }
}

/// Flood-everything: every router advertises itself and a random known
/// route each tick, and passes received advertisements on.
fn flooding_candidate() -> CandidateConfig {
    CandidateConfig {
        network: network_config(),
        routing: RoutingConfig {
            broadcast_forwarding_rate: 0.8,
            random_walk_broadcasting: false,
            route_propagation: true,
            self_propagation: true,
            auto_forward_propagations: true,
            searching: false,
            advertise_link_failures: true,
            propagation: PropagationConfig::RandomRoute { cutoff_rate: 0.3 },
            store: StoreConfig {
                eliminate_cycles: true,
                eliminate_cycles_eagerly: false,
            },
        },
        link_fail_rate: LINK_FAIL_RATE,
    }
}

/// Search-assisted: quieter background advertising plus demand-driven
/// searches, mixing random-walk and shortest-route advertisements.
fn searching_candidate() -> CandidateConfig {
    CandidateConfig {
        network: network_config(),
        routing: RoutingConfig {
            broadcast_forwarding_rate: 0.6,
            random_walk_broadcasting: true,
            route_propagation: true,
            self_propagation: true,
            auto_forward_propagations: true,
            searching: true,
            advertise_link_failures: true,
            propagation: PropagationConfig::Alternate {
                ratio: 0.5,
                random: RandomRouteParams { cutoff_rate: 0.3 },
                shortest: ShortestRouteParams {},
            },
            store: StoreConfig {
                eliminate_cycles: true,
                eliminate_cycles_eagerly: false,
            },
        },
        link_fail_rate: LINK_FAIL_RATE,
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== smallworld — stack-route simulator ===");
    println!("Nodes: {NODE_COUNT}  |  Steps: {STEPS}  |  Seed: {SEED}");
    println!();

    // 1. Assemble the experiment.
    let mut candidates = BTreeMap::new();
    candidates.insert("flooding".to_owned(), flooding_candidate());
    candidates.insert("searching".to_owned(), searching_candidate());
    let config = ExperimentConfig {
        seed: SEED,
        candidates,
        measurement: MeasurementConfig {
            steps: STEPS,
            samples: SAMPLES,
        },
        metrics: Vec::new(), // all of them
    };
    let mut experiment = Experiment::from_config(&config)?;

    // 2. Open the sample sinks.
    let out_dir = Path::new("output/smallworld");
    std::fs::create_dir_all(out_dir)?;
    let json_file = File::create(out_dir.join("samples.jsonl"))
        .context("creating samples.jsonl")?;
    let csv_file = File::create(out_dir.join("samples.csv")).context("creating samples.csv")?;
    let mut sink = TeeSink {
        json: JsonLinesSink::new(BufWriter::new(json_file)),
        csv: CsvSink::new(BufWriter::new(csv_file)),
        last: None,
    };

    // 3. Run.
    let started = Instant::now();
    experiment.run(&mut sink)?;
    let elapsed = started.elapsed();

    if let Some(error) = sink.json.take_error() {
        eprintln!("jsonl sink error: {error}");
    }
    if let Some(error) = sink.csv.take_error() {
        eprintln!("csv sink error: {error}");
    }

    // 4. Final summary table.
    println!("Completed in {:.3} s", elapsed.as_secs_f64());
    println!();
    if let Some(sample) = sink.last {
        let metrics = [
            "routability",
            "efficiency",
            "efficient_routability",
            "transmissions_per_node",
            "route_failures",
        ];
        print!("{:<28}", "metric");
        for name in sample.candidates.keys() {
            print!("{name:>14}");
        }
        println!();
        println!("{}", "-".repeat(28 + 14 * sample.candidates.len()));
        for metric in metrics {
            print!("{metric:<28}");
            for values in sample.candidates.values() {
                print!("{:>14.4}", values.get(metric).copied().unwrap_or(f64::NAN));
            }
            println!();
        }
    }
    println!();
    println!("Samples: output/smallworld/samples.jsonl, samples.csv");

    Ok(())
}

// ── Tee sink ──────────────────────────────────────────────────────────────────

/// Fans each sample out to both file sinks and keeps the latest for the
/// summary table.
struct TeeSink {
    json: JsonLinesSink<BufWriter<File>>,
    csv: CsvSink<BufWriter<File>>,
    last: Option<srs_experiment::Sample>,
}

impl SampleSink for TeeSink {
    fn emit(&mut self, step: u64, sample: &srs_experiment::Sample) {
        self.json.emit(step, sample);
        self.csv.emit(step, sample);
        self.last = Some(sample.clone());
    }

    fn finish(&mut self) {
        self.json.finish();
        self.csv.finish();
    }
}
