//! Aggregate quality metrics over one candidate.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use srs_core::instrument::names;
use srs_core::{Cost, MeasurementReader, MeasurementSession, NodeId, PortNumber, Route};
use srs_net::Links;
use srs_routing::Router;

use crate::error::{MetricsError, MetricsResult};
use crate::graph;

// ── Metric ────────────────────────────────────────────────────────────────────

/// The closed set of scrapeable metrics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Metric {
    TransmissionsPerNode,
    Routability,
    Efficiency,
    EfficientRoutability,
    DemandedRoutability,
    DemandedEfficiency,
    DemandedEfficientRoutability,
    RouteInsertionDuration,
    DistanceUpdateDuration,
    PropagatedRouteLength,
    RouteFailures,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::TransmissionsPerNode,
        Metric::Routability,
        Metric::Efficiency,
        Metric::EfficientRoutability,
        Metric::DemandedRoutability,
        Metric::DemandedEfficiency,
        Metric::DemandedEfficientRoutability,
        Metric::RouteInsertionDuration,
        Metric::DistanceUpdateDuration,
        Metric::PropagatedRouteLength,
        Metric::RouteFailures,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::TransmissionsPerNode => "transmissions_per_node",
            Metric::Routability => "routability",
            Metric::Efficiency => "efficiency",
            Metric::EfficientRoutability => "efficient_routability",
            Metric::DemandedRoutability => "demanded_routability",
            Metric::DemandedEfficiency => "demanded_efficiency",
            Metric::DemandedEfficientRoutability => "demanded_efficient_routability",
            Metric::RouteInsertionDuration => "route_insertion_duration",
            Metric::DistanceUpdateDuration => "distance_update_duration",
            Metric::PropagatedRouteLength => "propagated_route_length",
            Metric::RouteFailures => "route_failures",
        }
    }

    /// Parse a configured metric name; unknown names fail the scrape setup.
    pub fn from_name(name: &str) -> MetricsResult<Metric> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name() == name)
            .ok_or_else(|| MetricsError::Unsupported(name.to_owned()))
    }
}

// ── MetricsCalculator ─────────────────────────────────────────────────────────

/// One-scrape evaluator: snapshots the fabric (ground truth) and the counter
/// session, then answers metric queries against the routers' claims.
pub struct MetricsCalculator<'a, R: Router> {
    node_count: usize,
    /// `(node, port) → (peer, cost)` — enough to execute claimed routes.
    ports: FxHashMap<(NodeId, PortNumber), (NodeId, Cost)>,
    routers: Vec<&'a R>,
    session: MeasurementSession,
    reach: Vec<Vec<bool>>,
    dist: Vec<Vec<Cost>>,
}

impl<'a, R: Router> MetricsCalculator<'a, R> {
    pub fn new<F>(links: &Links<F>, routers: Vec<&'a R>, reader: &MeasurementReader) -> Self {
        let cost_graph = graph::from_links(links);
        let reach = graph::reachabilities(&cost_graph);
        let dist = graph::distances(&cost_graph);

        let mut ports = FxHashMap::default();
        for index in 0..links.node_count() {
            let node = NodeId(index as u32);
            for port in links.ports(node) {
                if let Some(record) = links.port_record(node, port) {
                    ports.insert((node, port), (record.peer, record.cost));
                }
            }
        }

        Self {
            node_count: links.node_count(),
            ports,
            routers,
            session: reader.session(),
            reach,
            dist,
        }
    }

    pub fn scrape(&self, metrics: &[Metric]) -> MetricsResult<BTreeMap<String, f64>> {
        metrics
            .iter()
            .map(|&metric| Ok((metric.name().to_owned(), self.calculate(metric)?)))
            .collect()
    }

    pub fn calculate(&self, metric: Metric) -> MetricsResult<f64> {
        match metric {
            Metric::TransmissionsPerNode => Ok(self.transmissions_per_node()),
            Metric::Routability => Ok(self.routability()),
            Metric::Efficiency => self.efficiency(),
            Metric::EfficientRoutability => {
                Ok(self.routability() * self.efficiency()?)
            }
            Metric::DemandedRoutability => Ok(self.demanded_routability()),
            Metric::DemandedEfficiency => self.demanded_efficiency(),
            Metric::DemandedEfficientRoutability => {
                Ok(self.demanded_routability() * self.demanded_efficiency()?)
            }
            Metric::RouteInsertionDuration => Ok(self
                .session
                .rate(names::ROUTE_UPDATE_SECONDS_SUM, names::ROUTE_INSERTION_COUNT)),
            Metric::DistanceUpdateDuration => Ok(self.session.rate(
                names::DISTANCE_UPDATE_SECONDS_SUM,
                names::ROUTE_INSERTION_COUNT,
            )),
            Metric::PropagatedRouteLength => Ok(self
                .session
                .rate(names::RECEIVED_ROUTE_LENGTH, names::ROUTE_INSERTION_COUNT)),
            Metric::RouteFailures => self.route_failures(),
        }
    }

    // ── Route execution ───────────────────────────────────────────────────

    /// Follow `route` from `source` on the current fabric.  `None` when a
    /// port no longer exists.
    fn execute_route(&self, source: NodeId, route: &Route) -> Option<(NodeId, Cost)> {
        let mut node = source;
        let mut cost = 0.0;
        for &port in route {
            let &(peer, hop_cost) = self.ports.get(&(node, port))?;
            cost += hop_cost;
            node = peer;
        }
        Some((node, cost))
    }

    // ── Individual metrics ────────────────────────────────────────────────

    fn transmissions_per_node(&self) -> f64 {
        if self.node_count == 0 {
            return 0.0;
        }
        self.session.get(names::TRANSMISSION_COUNT) / self.node_count as f64
    }

    /// Pair-uniform: claimed pairs over ground-truth-reachable pairs.
    fn routability(&self) -> f64 {
        let mut routable = 0usize;
        let mut reachable = 0usize;
        for (i, router) in self.routers.iter().enumerate() {
            for j in 0..self.node_count {
                if router.has_route(NodeId(j as u32)) {
                    routable += 1;
                }
                if self.reach[i][j] {
                    reachable += 1;
                }
            }
        }
        if reachable == 0 {
            return 0.0;
        }
        routable as f64 / reachable as f64
    }

    /// Demand-weighted variant: pair `(i, j)` counts with router `i`'s
    /// normalized demand for `j`, so routers with larger raw demand totals
    /// carry no extra weight.
    fn demanded_routability(&self) -> f64 {
        let mut routable = 0.0;
        let mut reachable = 0.0;
        for (i, router) in self.routers.iter().enumerate() {
            let weights = self.normalized_demands(router);
            for j in 0..self.node_count {
                let weight = weights[j];
                if router.has_route(NodeId(j as u32)) {
                    routable += weight;
                }
                if self.reach[i][j] {
                    reachable += weight;
                }
            }
        }
        if reachable == 0.0 {
            return 0.0;
        }
        routable / reachable
    }

    /// Router `i`'s demand vector scaled to `demand(j) / Σ demand`; all
    /// zeros when the router demands nothing at all.
    fn normalized_demands(&self, router: &R) -> Vec<f64> {
        let demands: Vec<f64> = (0..self.node_count)
            .map(|j| router.demand(NodeId(j as u32)))
            .collect();
        let total: f64 = demands.iter().sum();
        if total == 0.0 {
            return vec![0.0; self.node_count];
        }
        demands.into_iter().map(|demand| demand / total).collect()
    }

    /// Ground-truth distance over executed route cost, summed across every
    /// claimed route that still executes; 1 when nothing executes.
    fn efficiency(&self) -> MetricsResult<f64> {
        let (distance_sum, cost_sum) = self.efficiency_sums(|_| vec![1.0; self.node_count])?;
        if cost_sum == 0.0 {
            return Ok(1.0);
        }
        Ok(distance_sum / cost_sum)
    }

    fn demanded_efficiency(&self) -> MetricsResult<f64> {
        let (distance_sum, cost_sum) =
            self.efficiency_sums(|router| self.normalized_demands(router))?;
        if cost_sum == 0.0 {
            return Ok(1.0);
        }
        Ok(distance_sum / cost_sum)
    }

    /// Sum `distance * w` and `route_cost * w` over executing claimed
    /// routes, with `weights` yielding one weight per target for each
    /// router.
    fn efficiency_sums(
        &self,
        weights: impl Fn(&R) -> Vec<f64>,
    ) -> MetricsResult<(f64, f64)> {
        let mut distance_sum = 0.0;
        let mut cost_sum = 0.0;
        for (i, router) in self.routers.iter().enumerate() {
            let source = NodeId(i as u32);
            let pair_weights = weights(router);
            for j in 0..self.node_count {
                let target = NodeId(j as u32);
                let Some(route) = router.route(target)? else {
                    continue;
                };
                let Some((_, route_cost)) = self.execute_route(source, &route) else {
                    continue;
                };
                let distance = self.dist[i][j];
                if !distance.is_finite() {
                    continue;
                }
                let w = pair_weights[j];
                distance_sum += distance * w;
                cost_sum += route_cost * w;
            }
        }
        Ok((distance_sum, cost_sum))
    }

    /// Fraction of claimed routes that no longer execute to their target
    /// (missing port or wrong terminal node); 0 when nothing is claimed.
    fn route_failures(&self) -> MetricsResult<f64> {
        let mut claimed = 0usize;
        let mut failed = 0usize;
        for (i, router) in self.routers.iter().enumerate() {
            let source = NodeId(i as u32);
            for j in 0..self.node_count {
                let target = NodeId(j as u32);
                let Some(route) = router.route(target)? else {
                    continue;
                };
                claimed += 1;
                match self.execute_route(source, &route) {
                    Some((landed, _)) if landed == target => {}
                    _ => failed += 1,
                }
            }
        }
        if claimed == 0 {
            return Ok(0.0);
        }
        Ok(failed as f64 / claimed as f64)
    }
}
