//! Unit tests for ground-truth analysis and the metrics calculator.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use srs_core::instrument::names;
use srs_core::{MeasurementReader, NodeId, PortNumber, Route, Tracker};
use srs_net::{LinkHandler, Links, NetError, Network};
use srs_routing::{Router, RoutingResult};

use crate::calculator::{Metric, MetricsCalculator};
use crate::error::MetricsError;
use crate::graph;

// ── Test doubles ──────────────────────────────────────────────────────────────

/// Fabric handler that ignores everything; metrics only read port tables.
struct Null;

impl LinkHandler for Null {
    type Frame = u8;
    type Error = NetError;

    fn handle(&mut self, _links: &mut Links<u8>, _port: PortNumber, _frame: u8) -> Result<(), NetError> {
        Ok(())
    }

    fn on_link_down(&mut self, _links: &mut Links<u8>, _port: PortNumber) -> Result<(), NetError> {
        Ok(())
    }
}

/// Router double with a fixed claim table.
#[derive(Default)]
struct FakeRouter {
    routes: FxHashMap<NodeId, Route>,
    demand: Vec<f64>,
}

impl FakeRouter {
    fn claiming(routes: &[(u32, &[u32])]) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|(target, ports)| {
                    (
                        NodeId(*target),
                        ports.iter().copied().map(PortNumber).collect(),
                    )
                })
                .collect(),
            demand: Vec::new(),
        }
    }
}

impl Router for FakeRouter {
    fn has_route(&self, target: NodeId) -> bool {
        self.routes.contains_key(&target)
    }

    fn route(&self, target: NodeId) -> RoutingResult<Option<Route>> {
        Ok(self.routes.get(&target).cloned())
    }

    fn demand(&self, target: NodeId) -> f64 {
        self.demand.get(target.index()).copied().unwrap_or(1.0)
    }
}

/// Line fabric 0 – 1 – 2, unit costs.  Ports: 0→1 is (0, p0), 1→2 is (1, p1).
fn line_network(tracker: &Tracker) -> Network<Null> {
    let mut network = Network::new(3, tracker);
    network.register(NodeId(0), Null).unwrap();
    network.register(NodeId(1), Null).unwrap();
    network.register(NodeId(2), Null).unwrap();
    network.connect(NodeId(0), NodeId(1), 1.0, 1.0).unwrap();
    network.connect(NodeId(1), NodeId(2), 1.0, 1.0).unwrap();
    network
}

// ── Ground-truth graph ────────────────────────────────────────────────────────

mod ground_truth {
    use super::*;

    #[test]
    fn reachability_closes_over_paths() {
        let tracker = Tracker::new();
        let network = line_network(&tracker);
        let cost_graph = graph::from_links(network.links());
        let reach = graph::reachabilities(&cost_graph);
        for i in 0..3 {
            for j in 0..3 {
                assert!(reach[i][j], "{i} should reach {j} on a line");
            }
        }
    }

    #[test]
    fn disconnected_nodes_stay_unreachable() {
        let tracker = Tracker::new();
        let mut network: Network<Null> = Network::new(3, &tracker);
        for i in 0..3 {
            network.register(NodeId(i), Null).unwrap();
        }
        network.connect(NodeId(0), NodeId(1), 1.0, 1.0).unwrap();
        let reach = graph::reachabilities(&graph::from_links(network.links()));
        assert!(reach[0][1]);
        assert!(!reach[0][2]);
        assert!(reach[2][2]);
    }

    #[test]
    fn distances_add_up_along_the_line() {
        let tracker = Tracker::new();
        let network = line_network(&tracker);
        let dist = graph::distances(&graph::from_links(network.links()));
        assert_eq!(dist[0][0], 0.0);
        assert_eq!(dist[0][1], 1.0);
        assert_eq!(dist[0][2], 2.0);
        assert_eq!(dist[2][0], 2.0);
    }

    #[test]
    fn missing_links_are_infinite() {
        let tracker = Tracker::new();
        let mut network: Network<Null> = Network::new(2, &tracker);
        network.register(NodeId(0), Null).unwrap();
        network.register(NodeId(1), Null).unwrap();
        let dist = graph::distances(&graph::from_links(network.links()));
        assert!(dist[0][1].is_infinite());
    }
}

// ── Metric names ──────────────────────────────────────────────────────────────

mod metric_names {
    use super::*;

    #[test]
    fn every_metric_round_trips_through_its_name() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_name(metric.name()).unwrap(), metric);
        }
    }

    #[test]
    fn unknown_names_fail_fast() {
        let err = Metric::from_name("bogosity").unwrap_err();
        assert!(matches!(err, MetricsError::Unsupported(name) if name == "bogosity"));
    }
}

// ── Calculator ────────────────────────────────────────────────────────────────

mod calculator {
    use super::*;

    fn reader(tracker: &Rc<Tracker>) -> MeasurementReader {
        MeasurementReader::new(Rc::clone(tracker))
    }

    #[test]
    fn transmissions_per_node_divides_the_counter() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        tracker.counter(names::TRANSMISSION_COUNT).add(6.0);
        let routers = vec![FakeRouter::default(), FakeRouter::default(), FakeRouter::default()];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        assert_eq!(
            calculator.calculate(Metric::TransmissionsPerNode).unwrap(),
            2.0
        );
    }

    #[test]
    fn routability_is_claims_over_reachable_pairs() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        // 3 claims against 9 reachable pairs.
        let routers = vec![
            FakeRouter::claiming(&[(1, &[0]), (2, &[0, 1])]),
            FakeRouter::claiming(&[(2, &[1])]),
            FakeRouter::default(),
        ];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        let routability = calculator.calculate(Metric::Routability).unwrap();
        assert!((routability - 3.0 / 9.0).abs() < 1e-12);
        // Uniform demand (the double's default weight is 1) matches the
        // pair-uniform variant.
        let demanded = calculator.calculate(Metric::DemandedRoutability).unwrap();
        assert!((demanded - routability).abs() < 1e-12);
    }

    #[test]
    fn perfect_routes_have_efficiency_one() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        let routers = vec![
            FakeRouter::claiming(&[(1, &[0]), (2, &[0, 1])]),
            FakeRouter::claiming(&[(2, &[1])]),
            FakeRouter::default(),
        ];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        assert_eq!(calculator.calculate(Metric::Efficiency).unwrap(), 1.0);
        assert_eq!(calculator.calculate(Metric::RouteFailures).unwrap(), 0.0);
    }

    #[test]
    fn efficiency_defaults_to_one_without_routes() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        let routers = vec![FakeRouter::default(), FakeRouter::default(), FakeRouter::default()];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        assert_eq!(calculator.calculate(Metric::Efficiency).unwrap(), 1.0);
        assert_eq!(calculator.calculate(Metric::RouteFailures).unwrap(), 0.0);
    }

    #[test]
    fn broken_and_misdirected_routes_count_as_failures() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        let routers = vec![
            // One good claim, one through a missing port, one landing on the
            // wrong node (port 0 from node 0 reaches 1, not 2).
            FakeRouter::claiming(&[(1, &[0]), (2, &[0, 9])]),
            FakeRouter::claiming(&[(2, &[0])]),
            FakeRouter::default(),
        ];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        let failures = calculator.calculate(Metric::RouteFailures).unwrap();
        assert!((failures - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn scrape_names_every_requested_metric() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        let routers = vec![FakeRouter::default(), FakeRouter::default(), FakeRouter::default()];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        let sample = calculator.scrape(&Metric::ALL).unwrap();
        assert_eq!(sample.len(), Metric::ALL.len());
        for metric in Metric::ALL {
            assert!(sample.contains_key(metric.name()), "missing {}", metric.name());
        }
    }

    #[test]
    fn quality_scores_stay_in_unit_range() {
        let tracker = Rc::new(Tracker::new());
        let network = line_network(&tracker);
        let routers = vec![
            FakeRouter::claiming(&[(0, &[]), (1, &[0]), (2, &[0, 1])]),
            FakeRouter::claiming(&[(0, &[0]), (1, &[]), (2, &[1])]),
            FakeRouter::claiming(&[(2, &[])]),
        ];
        let calculator =
            MetricsCalculator::new(network.links(), routers.iter().collect(), &reader(&tracker));
        for metric in [
            Metric::Routability,
            Metric::Efficiency,
            Metric::EfficientRoutability,
            Metric::DemandedRoutability,
            Metric::DemandedEfficiency,
            Metric::DemandedEfficientRoutability,
            Metric::RouteFailures,
        ] {
            let value = calculator.calculate(metric).unwrap();
            assert!(
                (0.0..=1.0).contains(&value),
                "{} = {value} out of range",
                metric.name()
            );
        }
    }
}
