//! Ground-truth graph derived from the fabric.

use std::collections::BTreeMap;

use srs_core::{Cost, NodeId};
use srs_net::Links;

/// Adjacency with per-direction costs: `graph[i][j]` is the cost of the
/// direct hop `i → j`, absent when no link connects them.
pub type CostGraph = Vec<BTreeMap<NodeId, Cost>>;

/// Snapshot the fabric's current links into a [`CostGraph`].
///
/// Parallel links between the same pair collapse to the last port seen, like
/// the adjacency they stand for.
pub fn from_links<F>(links: &Links<F>) -> CostGraph {
    let mut graph: CostGraph = vec![BTreeMap::new(); links.node_count()];
    for index in 0..links.node_count() {
        let node = NodeId(index as u32);
        for port in links.ports(node) {
            if let Some(record) = links.port_record(node, port) {
                graph[index].insert(record.peer, record.cost);
            }
        }
    }
    graph
}

/// Warshall's transitive closure: `result[i][j]` ⇔ a path `i ↝ j` exists.
/// Every node reaches itself.
pub fn reachabilities(graph: &CostGraph) -> Vec<Vec<bool>> {
    let n = graph.len();
    let mut cover = vec![vec![false; n]; n];
    for (i, row) in cover.iter_mut().enumerate() {
        row[i] = true;
        for neighbor in graph[i].keys() {
            row[neighbor.index()] = true;
        }
    }
    for k in 0..n {
        for i in 0..n {
            if !cover[i][k] {
                continue;
            }
            for j in 0..n {
                if cover[k][j] {
                    cover[i][j] = true;
                }
            }
        }
    }
    cover
}

/// Floyd–Warshall all-pairs distances with `f64::INFINITY` for unreachable
/// pairs and 0 on the diagonal.
pub fn distances(graph: &CostGraph) -> Vec<Vec<Cost>> {
    let n = graph.len();
    let mut dist = vec![vec![f64::INFINITY; n]; n];
    for (i, row) in dist.iter_mut().enumerate() {
        for (neighbor, &cost) in &graph[i] {
            row[neighbor.index()] = cost;
        }
        row[i] = 0.0;
    }
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                let detour = dist[i][k] + dist[k][j];
                if detour < dist[i][j] {
                    dist[i][j] = detour;
                }
            }
        }
    }
    dist
}
