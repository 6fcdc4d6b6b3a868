//! The compressed per-node route store.
//!
//! The store is a reachability graph rooted at its owner.  Each edge is a
//! "macro-hop": a bag of priced port sequences whose execution from the
//! edge's source lands on its target.  Among the edges leaving one node, no
//! stored segment is a proper prefix of a sibling's — inserts that would
//! violate this *redirect* the prefixed segments through the newly learned
//! intermediate node instead.  A Dijkstra pass over the compressed graph
//! maintains `distance`/`predecessor` per node, which makes route-existence
//! queries O(1) and shortest-route queries a predecessor-chain walk.

use std::collections::BTreeMap;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use srs_core::instrument::names;
use srs_core::{
    Cost, Counter, NodeId, PortNumber, PricedRoute, Route, Timer, Tracker, is_prefix,
    is_real_prefix,
};
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::error::StoreError;

// ── Edge ──────────────────────────────────────────────────────────────────────

/// Bag of priced routes between two store nodes, ascending by cost.
#[derive(Default)]
pub(crate) struct Edge {
    priced_routes: Vec<PricedRoute>,
}

impl Edge {
    /// Insert keeping the cost order; among equal costs the newcomer goes
    /// first (`bisect_left`).
    fn insert_path(&mut self, path: Route, cost: Cost) {
        let at = self.priced_routes.partition_point(|pr| pr.cost < cost);
        self.priced_routes.insert(at, PricedRoute::new(path, cost));
    }

    fn cost(&self) -> Cost {
        self.priced_routes.first().map_or(f64::INFINITY, |pr| pr.cost)
    }

    pub(crate) fn routes(&self) -> &[PricedRoute] {
        &self.priced_routes
    }

    fn is_empty(&self) -> bool {
        self.priced_routes.is_empty()
    }
}

// ── EdgeMap ───────────────────────────────────────────────────────────────────

/// Successor map preserving insertion order.
///
/// The prefix walk resolves ties by taking the first match in the order the
/// edges were created, so the order must survive arbitrary insert/remove
/// interleavings; the entry count per node is small enough for linear scans.
#[derive(Default)]
pub(crate) struct EdgeMap {
    entries: Vec<(NodeId, Edge)>,
}

impl EdgeMap {
    fn get(&self, target: NodeId) -> Option<&Edge> {
        self.entries
            .iter()
            .find(|(id, _)| *id == target)
            .map(|(_, edge)| edge)
    }

    fn get_mut(&mut self, target: NodeId) -> Option<&mut Edge> {
        self.entries
            .iter_mut()
            .find(|(id, _)| *id == target)
            .map(|(_, edge)| edge)
    }

    fn get_or_insert(&mut self, target: NodeId) -> &mut Edge {
        if let Some(at) = self.entries.iter().position(|(id, _)| *id == target) {
            return &mut self.entries[at].1;
        }
        self.entries.push((target, Edge::default()));
        &mut self.entries.last_mut().expect("just pushed").1
    }

    fn remove(&mut self, target: NodeId) {
        self.entries.retain(|(id, _)| *id != target);
    }

    fn successors(&self) -> Vec<NodeId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &Edge)> {
        self.entries.iter().map(|(id, edge)| (*id, edge))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ── StoreNode ─────────────────────────────────────────────────────────────────

pub(crate) struct StoreNode {
    distance: Cost,
    predecessor: Option<NodeId>,
    edges: EdgeMap,
}

impl StoreNode {
    fn new() -> Self {
        Self {
            distance: f64::INFINITY,
            predecessor: None,
            edges: EdgeMap::default(),
        }
    }
}

// ── Measurements ──────────────────────────────────────────────────────────────

struct Measurements {
    insertions: Rc<Counter>,
    received_route_length: Rc<Counter>,
    route_update_timer: Timer,
    distance_update_timer: Timer,
}

impl Measurements {
    fn new(tracker: &Tracker) -> Self {
        Self {
            insertions: tracker.counter(names::ROUTE_INSERTION_COUNT),
            received_route_length: tracker.counter(names::RECEIVED_ROUTE_LENGTH),
            route_update_timer: tracker.timer(names::ROUTE_UPDATE_SECONDS_SUM),
            distance_update_timer: tracker.timer(names::DISTANCE_UPDATE_SECONDS_SUM),
        }
    }
}

// ── RouteStore ────────────────────────────────────────────────────────────────

pub struct RouteStore {
    source: NodeId,
    config: StoreConfig,
    nodes: BTreeMap<NodeId, StoreNode>,
    measurements: Measurements,
}

impl RouteStore {
    pub fn new(source: NodeId, config: StoreConfig, tracker: &Tracker) -> Self {
        let mut nodes = BTreeMap::new();
        let mut owner = StoreNode::new();
        owner.distance = 0.0;
        nodes.insert(source, owner);
        Self {
            source,
            config,
            nodes,
            measurements: Measurements::new(tracker),
        }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    /// `target` is known to the store.
    pub fn has_route(&self, target: NodeId) -> bool {
        self.nodes.contains_key(&target)
    }

    /// Every node the store has heard of, including the owner.
    pub fn known_targets(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Cheapest concrete route to `target`: walk the predecessor chain back
    /// to the owner and concatenate each edge's best priced path.
    ///
    /// Returns `None` for unknown targets and for known targets that are
    /// currently unreachable through the compressed graph (possible after
    /// failure pruning, which keeps nodes).  A *finite-distance* node with a
    /// broken chain is a store inconsistency and errors.
    pub fn shortest_route(&self, target: NodeId) -> Result<Option<PricedRoute>, StoreError> {
        if target == self.source {
            return Ok(Some(PricedRoute::new(Vec::new(), 0.0)));
        }
        let Some(node) = self.nodes.get(&target) else {
            return Ok(None);
        };
        if node.distance.is_infinite() {
            return Ok(None);
        }

        let mut segments: Vec<&PricedRoute> = Vec::new();
        let mut current = target;
        while current != self.source {
            if segments.len() > self.nodes.len() {
                return Err(StoreError::PredecessorCycle {
                    owner: self.source,
                    target,
                });
            }
            let pred = self
                .nodes
                .get(&current)
                .and_then(|n| n.predecessor)
                .ok_or(StoreError::MissingPredecessor {
                    owner: self.source,
                    target: current,
                })?;
            let edge = self
                .nodes
                .get(&pred)
                .ok_or(StoreError::MissingEdge {
                    owner: self.source,
                    pred,
                    target: current,
                })?
                .edges
                .get(current)
                .ok_or(StoreError::MissingEdge {
                    owner: self.source,
                    pred,
                    target: current,
                })?;
            let best = edge.routes().first().ok_or(StoreError::EmptyEdge {
                owner: self.source,
                pred,
                target: current,
            })?;
            segments.push(best);
            current = pred;
        }

        let mut path = Vec::new();
        let mut cost = 0.0;
        for segment in segments.iter().rev() {
            path.extend_from_slice(&segment.path);
            cost += segment.cost;
        }
        Ok(Some(PricedRoute::new(path, cost)))
    }

    // ── Insertion ─────────────────────────────────────────────────────────

    /// Learn that `target` is reachable by executing `route` from the owner
    /// at `cost`.
    ///
    /// Preconditions: `cost` finite and non-negative; a non-owner target
    /// needs a non-empty route.
    pub fn insert(&mut self, target: NodeId, route: Route, cost: Cost) -> Result<(), StoreError> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(StoreError::InvalidCost { cost });
        }
        if route.is_empty() && target != self.source {
            return Err(StoreError::EmptyRoute {
                owner: self.source,
                target,
            });
        }
        self.measurements.received_route_length.add(route.len() as f64);
        self.measurements.insertions.add(1.0);

        let mut modified: Vec<(NodeId, NodeId)> = Vec::new();
        {
            let _timer = self.measurements.route_update_timer.start();
            self.store_segment(self.source, target, &route, cost, &mut modified)?;
        }
        if !modified.is_empty() {
            let _timer = self.measurements.distance_update_timer.start();
            self.update_distances(true);
        }
        trace!(
            owner = %self.source,
            %target,
            edges_touched = modified.len(),
            "route inserted"
        );
        Ok(())
    }

    /// Recursive structural update: consume known prefixes, then insert the
    /// remainder as a raw edge and redirect any segments it prefixes.
    fn store_segment(
        &mut self,
        src: NodeId,
        target: NodeId,
        path: &[PortNumber],
        cost: Cost,
        modified: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<(), StoreError> {
        if self.config.eliminate_cycles {
            if self.config.eliminate_cycles_eagerly {
                if target == src {
                    return Ok(());
                }
            } else if target == self.source {
                return Ok(());
            }
        }
        if target == src {
            return Ok(());
        }
        if path.is_empty() {
            return Err(StoreError::RouteTargetContradiction {
                owner: self.source,
                at: src,
                target,
            });
        }

        // Walk an existing prefix: first match in edge-insertion order wins.
        let hop = {
            let node = self.nodes.get(&src).ok_or(StoreError::UnknownNode {
                owner: self.source,
                node: src,
            })?;
            let mut hop = None;
            'edges: for (successor, edge) in node.edges.iter() {
                for priced in edge.routes() {
                    if is_prefix(&priced.path, path) {
                        hop = Some((successor, priced.path.len(), priced.cost));
                        break 'edges;
                    }
                }
            }
            hop
        };
        if let Some((successor, consumed, consumed_cost)) = hop {
            return self.store_segment(
                successor,
                target,
                &path[consumed..],
                cost - consumed_cost,
                modified,
            );
        }

        // No prefix known: insert the remainder as a raw edge src → target.
        self.nodes.entry(target).or_insert_with(StoreNode::new);
        self.nodes
            .get_mut(&src)
            .expect("segment source verified above")
            .edges
            .get_or_insert(target)
            .insert_path(path.to_vec(), cost);
        modified.push((src, target));

        // Redirect sibling segments the new one prefixes through `target`.
        let successors = self.nodes[&src].edges.successors();
        for successor in successors {
            self.redirect_prefixed(src, successor, target, path, cost, modified)?;
        }
        Ok(())
    }

    /// Move every priced route on `src → successor` that `path` properly
    /// prefixes onto `target → successor`, chopped by `path`.
    fn redirect_prefixed(
        &mut self,
        src: NodeId,
        successor: NodeId,
        target: NodeId,
        path: &[PortNumber],
        cost: Cost,
        modified: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<(), StoreError> {
        let moved: Vec<PricedRoute> = {
            let Some(edge) = self
                .nodes
                .get_mut(&src)
                .and_then(|node| node.edges.get_mut(successor))
            else {
                return Ok(());
            };
            let (moved, kept): (Vec<_>, Vec<_>) = edge
                .priced_routes
                .drain(..)
                .partition(|pr| is_real_prefix(path, &pr.path));
            edge.priced_routes = kept;
            if moved.is_empty() {
                return Ok(());
            }
            moved
        };

        if self.nodes[&src].edges.get(successor).is_some_and(Edge::is_empty) {
            self.nodes.get_mut(&src).expect("present").edges.remove(successor);
        }
        modified.push((src, successor));

        self.nodes.entry(target).or_insert_with(StoreNode::new);
        for priced in &moved {
            let remainder = priced.path[path.len()..].to_vec();
            if remainder.is_empty() {
                return Err(StoreError::EmptyRemainder {
                    owner: self.source,
                    via: target,
                });
            }
            let remainder_cost = priced.cost - cost;
            self.nodes
                .get_mut(&target)
                .expect("created above")
                .edges
                .get_or_insert(successor)
                .insert_path(remainder, remainder_cost);
        }
        modified.push((target, successor));
        trace!(
            owner = %self.source,
            %src,
            %successor,
            via = %target,
            segments = moved.len(),
            "redirected prefixed segments"
        );
        Ok(())
    }

    // ── Distances ─────────────────────────────────────────────────────────

    /// Rebuild `distance`/`predecessor` for every known node from scratch.
    ///
    /// `prune` removes nodes the compressed graph can no longer reach (and
    /// edges aimed at them).  The insert path prunes; the failure path keeps
    /// unreachable nodes so `has_route` stays a pure membership test.
    fn update_distances(&mut self, prune: bool) {
        for node in self.nodes.values_mut() {
            node.distance = f64::INFINITY;
            node.predecessor = None;
        }
        self.nodes
            .get_mut(&self.source)
            .expect("owner is always present")
            .distance = 0.0;

        let mut queue: Vec<NodeId> = self.nodes.keys().copied().collect();
        let mut explored: FxHashSet<NodeId> = FxHashSet::default();
        while !queue.is_empty() {
            let mut best = 0;
            for (index, id) in queue.iter().enumerate() {
                if self.nodes[id].distance < self.nodes[&queue[best]].distance {
                    best = index;
                }
            }
            let current = queue.remove(best);
            explored.insert(current);

            let base = self.nodes[&current].distance;
            let relaxations: Vec<(NodeId, Cost)> = self.nodes[&current]
                .edges
                .iter()
                .filter(|(successor, _)| !explored.contains(successor))
                .map(|(successor, edge)| (successor, base + edge.cost()))
                .collect();
            for (successor, alternative) in relaxations {
                let node = self.nodes.get_mut(&successor).expect("edge targets are known");
                if alternative < node.distance {
                    node.distance = alternative;
                    node.predecessor = Some(current);
                }
            }
        }

        if prune {
            let dead: FxHashSet<NodeId> = self
                .nodes
                .iter()
                .filter(|(id, node)| node.distance.is_infinite() && **id != self.source)
                .map(|(id, _)| *id)
                .collect();
            if dead.is_empty() {
                return;
            }
            self.nodes.retain(|id, _| !dead.contains(id));
            for node in self.nodes.values_mut() {
                for gone in &dead {
                    node.edges.remove(*gone);
                }
            }
            debug!(owner = %self.source, pruned = dead.len(), "dropped unreachable nodes");
        }
    }

    // ── Failure pruning ───────────────────────────────────────────────────

    /// Remove every stored priced route whose owner-rooted path starts with
    /// `route`, then rebuild distances (without pruning nodes).
    pub fn remove_routes_starting_with(&mut self, route: &[PortNumber]) -> Result<(), StoreError> {
        debug!(owner = %self.source, hops = route.len(), "pruning failed routes");
        self.prune_segment(self.source, route);
        self.update_distances(false);
        Ok(())
    }

    fn prune_segment(&mut self, src: NodeId, route: &[PortNumber]) {
        let descents: Vec<(NodeId, usize)> = {
            let Some(node) = self.nodes.get_mut(&src) else {
                return;
            };
            // Drop segments the failing route prefixes: they execute the
            // failed link.
            let mut emptied: Vec<NodeId> = Vec::new();
            for (successor, edge) in node.edges.entries.iter_mut() {
                edge.priced_routes.retain(|pr| !is_prefix(route, &pr.path));
                if edge.is_empty() {
                    emptied.push(*successor);
                }
            }
            for successor in emptied {
                node.edges.remove(successor);
            }
            // Segments that are proper prefixes of the failing route carry
            // the failure further down; chop and descend.
            let mut descents = Vec::new();
            for (successor, edge) in node.edges.iter() {
                for priced in edge.routes() {
                    if is_real_prefix(&priced.path, route) {
                        descents.push((successor, priced.path.len()));
                    }
                }
            }
            descents
        };
        for (successor, consumed) in descents {
            self.prune_segment(successor, &route[consumed..]);
        }
    }

    /// Mirror of the pruning recursion: does any stored route start with
    /// `route`?
    pub fn has_routes_starting_with(&self, route: &[PortNumber]) -> bool {
        self.segment_starts_with(self.source, route)
    }

    fn segment_starts_with(&self, src: NodeId, route: &[PortNumber]) -> bool {
        let Some(node) = self.nodes.get(&src) else {
            return false;
        };
        for (successor, edge) in node.edges.iter() {
            for priced in edge.routes() {
                if is_prefix(route, &priced.path) {
                    return true;
                }
                if is_real_prefix(&priced.path, route)
                    && self.segment_starts_with(successor, &route[priced.path.len()..])
                {
                    return true;
                }
            }
        }
        false
    }

    // ── Internal views (propagators, tests) ───────────────────────────────

    pub(crate) fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map_or_else(Vec::new, |n| n.edges.successors())
    }

    pub(crate) fn edge_routes(&self, src: NodeId, target: NodeId) -> &[PricedRoute] {
        self.nodes
            .get(&src)
            .and_then(|n| n.edges.get(target))
            .map_or(&[], Edge::routes)
    }

    #[cfg(test)]
    pub(crate) fn distance(&self, node: NodeId) -> Option<Cost> {
        self.nodes.get(&node).map(|n| n.distance)
    }

    #[cfg(test)]
    pub(crate) fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.predecessor)
    }

    #[cfg(test)]
    pub(crate) fn edge_count(&self, node: NodeId) -> usize {
        self.nodes.get(&node).map_or(0, |n| n.edges.len())
    }
}
