//! One independently simulated candidate: fabric + routers + perturbation.

use std::collections::BTreeMap;
use std::rc::Rc;

use srs_core::{MeasurementReader, NodeId, SimRng, Tracker};
use srs_metrics::{CostGraph, Metric, MetricsCalculator};
use srs_net::Network;
use srs_routing::{RouterFactory, StackRouter};
use tracing::debug;

use crate::config::{CandidateConfig, CostDistribution};
use crate::error::{ExperimentError, ExperimentResult};
use crate::graphgen;

pub struct Candidate {
    network: Network<StackRouter>,
    reader: MeasurementReader,
    rng: SimRng,
    link_fail_rate: f64,
    cost_distribution: CostDistribution,
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate").finish_non_exhaustive()
    }
}

impl Candidate {
    /// Assemble a candidate: generate its topology, wire one router per
    /// node, and share one tracker across fabric, routers, and metrics.
    pub fn from_config(config: &CandidateConfig, mut rng: SimRng) -> ExperimentResult<Candidate> {
        validate(config)?;

        let tracker = Rc::new(Tracker::new());
        let graph = graphgen::generate(&config.network, &mut rng);
        let mut network = graph_to_network(&graph, &tracker)?;

        let node_count = network.node_count();
        let mut factory = RouterFactory::new(config.routing.clone(), node_count, rng.child(0));
        for index in 0..node_count {
            let node = NodeId(index as u32);
            let router = factory.build_router(node, &tracker);
            network.register(node, router).map_err(srs_routing::RoutingError::from)?;
        }

        debug!(
            nodes = node_count,
            links = network.links().canonical_links().len(),
            "candidate assembled"
        );
        Ok(Candidate {
            network,
            reader: MeasurementReader::new(tracker),
            rng,
            link_fail_rate: config.link_fail_rate,
            cost_distribution: config.network.cost_distribution,
        })
    }

    pub fn network(&self) -> &Network<StackRouter> {
        &self.network
    }

    /// One tick: run every router's scheduled tasks in node order (each
    /// task's cascade drains before the next fires), then perturb topology.
    pub fn run_step(&mut self) -> ExperimentResult<()> {
        for index in 0..self.network.node_count() {
            let node = NodeId(index as u32);
            let task_count = self
                .network
                .handler(node)
                .ok_or(ExperimentError::MissingRouter(node))?
                .task_count();
            for task in 0..task_count {
                self.network
                    .drive(node, |router, links| router.run_task(links, task))?;
            }
        }
        self.ruin_and_recreate()
    }

    /// Each connected link fails independently with `link_fail_rate` and is
    /// replaced by a fresh link between two uniformly chosen nodes (possibly
    /// the same one).  The failing set is fixed before any mutation.
    fn ruin_and_recreate(&mut self) -> ExperimentResult<()> {
        if self.link_fail_rate <= 0.0 {
            return Ok(());
        }
        let failing: Vec<_> = self
            .network
            .links()
            .canonical_links()
            .into_iter()
            .filter(|_| self.link_fail_rate > self.rng.random_f64())
            .collect();

        let node_count = self.network.node_count();
        for (node, port) in failing {
            self.network.disconnect(node, port)?;
            let a = NodeId(self.rng.pick_index(node_count) as u32);
            let b = NodeId(self.rng.pick_index(node_count) as u32);
            let (forward, backward) = self.cost_distribution.sample(&mut self.rng);
            self.network.connect(a, b, forward, backward)?;
        }
        Ok(())
    }

    /// Evaluate `metrics` against the current fabric and router claims.
    pub fn scrape(&self, metrics: &[Metric]) -> ExperimentResult<BTreeMap<String, f64>> {
        let routers: Vec<&StackRouter> = (0..self.network.node_count())
            .map(|index| {
                let node = NodeId(index as u32);
                self.network
                    .handler(node)
                    .ok_or(ExperimentError::MissingRouter(node))
            })
            .collect::<ExperimentResult<_>>()?;
        let calculator = MetricsCalculator::new(self.network.links(), routers, &self.reader);
        Ok(calculator.scrape(metrics)?)
    }
}

// ── Assembly helpers ──────────────────────────────────────────────────────────

fn validate(config: &CandidateConfig) -> ExperimentResult<()> {
    if config.network.node_count == 0 {
        return Err(ExperimentError::Config("node_count must be positive".into()));
    }
    check_rate("link_fail_rate", config.link_fail_rate)?;
    check_rate(
        "broadcast_forwarding_rate",
        config.routing.broadcast_forwarding_rate,
    )?;
    match config.network.topology {
        crate::config::TopologyConfig::Gilbert { density } => check_rate("density", density)?,
        crate::config::TopologyConfig::WattsStrogatz { beta, .. } => check_rate("beta", beta)?,
    }
    Ok(())
}

fn check_rate(name: &str, value: f64) -> ExperimentResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ExperimentError::Config(format!(
            "{name} must lie in [0, 1], got {value}"
        )));
    }
    Ok(())
}

/// Install one bidirectional link per undirected graph edge, visiting each
/// edge from its lower endpoint.  Self-loop entries are ignored.
fn graph_to_network(
    graph: &CostGraph,
    tracker: &Tracker,
) -> ExperimentResult<Network<StackRouter>> {
    let mut network = Network::new(graph.len(), tracker);
    for (index, neighbors) in graph.iter().enumerate() {
        let node = NodeId(index as u32);
        for (&peer, &forward) in neighbors {
            if peer.index() <= index {
                continue;
            }
            let backward = graph[peer.index()]
                .get(&node)
                .copied()
                .ok_or(ExperimentError::AsymmetricGraph {
                    from: node,
                    to: peer,
                })?;
            network.connect(node, peer, forward, backward)?;
        }
    }
    Ok(network)
}
