//! Random cost-graph generators used to seed candidate fabrics.
//!
//! Generators produce the symmetric [`CostGraph`] the assembly step turns
//! into a network; routers never see the graph itself.

use std::collections::BTreeMap;

use srs_core::{NodeId, SimRng};
use srs_metrics::CostGraph;

use crate::config::{CostDistribution, NetworkConfig, TopologyConfig};

pub fn generate(config: &NetworkConfig, rng: &mut SimRng) -> CostGraph {
    match config.topology {
        TopologyConfig::Gilbert { density } => gilbert(
            config.node_count,
            density,
            config.cost_distribution,
            rng,
        ),
        TopologyConfig::WattsStrogatz { degree, beta } => watts_strogatz(
            config.node_count,
            degree,
            beta,
            config.cost_distribution,
            rng,
        ),
    }
}

fn add_edge(graph: &mut CostGraph, a: usize, b: usize, costs: (f64, f64)) {
    graph[a].insert(NodeId(b as u32), costs.0);
    graph[b].insert(NodeId(a as u32), costs.1);
}

/// Gilbert G(n, p): each ordered pair is considered once with probability
/// `density`; a hit installs both directions with freshly drawn costs.
pub fn gilbert(
    node_count: usize,
    density: f64,
    costs: CostDistribution,
    rng: &mut SimRng,
) -> CostGraph {
    let mut graph: CostGraph = vec![BTreeMap::new(); node_count];
    for i in 0..node_count {
        for j in 0..node_count {
            if density > rng.random_f64() {
                add_edge(&mut graph, i, j, costs.sample(rng));
            }
        }
    }
    graph
}

/// Watts–Strogatz: ring lattice of `degree` nearest neighbors, then each
/// lattice edge is rewired with probability `beta` to a uniformly random
/// endpoint (skipped when no free endpoint turns up).
pub fn watts_strogatz(
    node_count: usize,
    degree: usize,
    beta: f64,
    costs: CostDistribution,
    rng: &mut SimRng,
) -> CostGraph {
    let mut graph: CostGraph = vec![BTreeMap::new(); node_count];
    let half = degree / 2;

    let mut lattice: Vec<(usize, usize)> = Vec::new();
    for i in 0..node_count {
        for step in 1..=half {
            let j = (i + step) % node_count;
            if i == j || graph[i].contains_key(&NodeId(j as u32)) {
                continue;
            }
            add_edge(&mut graph, i, j, costs.sample(rng));
            lattice.push((i, j));
        }
    }

    for (i, j) in lattice {
        if beta <= rng.random_f64() {
            continue;
        }
        let replacement = pick_free_endpoint(&graph, i, rng);
        let Some(new_j) = replacement else {
            continue;
        };
        graph[i].remove(&NodeId(j as u32));
        graph[j].remove(&NodeId(i as u32));
        add_edge(&mut graph, i, new_j, costs.sample(rng));
    }
    graph
}

fn pick_free_endpoint(graph: &CostGraph, from: usize, rng: &mut SimRng) -> Option<usize> {
    let node_count = graph.len();
    for _ in 0..node_count {
        let candidate = rng.pick_index(node_count);
        if candidate != from && !graph[from].contains_key(&NodeId(candidate as u32)) {
            return Some(candidate);
        }
    }
    None
}
