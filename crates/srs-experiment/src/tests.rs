//! Integration tests for assembly, the tick loop, and sampling.

use srs_core::{NodeId, SimRng};
use srs_metrics::Metric;
use srs_routing::{PropagationConfig, Router, RoutingConfig, StoreConfig};

use crate::candidate::Candidate;
use crate::config::{
    CandidateConfig, CostDistribution, ExperimentConfig, MeasurementConfig, NetworkConfig,
    TopologyConfig,
};
use crate::driver::Experiment;
use crate::error::ExperimentError;
use crate::graphgen;
use crate::sink::{JsonLinesSink, MemorySink};
use crate::SampleSink;

// ── Config builders ───────────────────────────────────────────────────────────

fn routing_config() -> RoutingConfig {
    RoutingConfig {
        broadcast_forwarding_rate: 1.0,
        random_walk_broadcasting: false,
        route_propagation: false,
        self_propagation: false,
        auto_forward_propagations: false,
        searching: false,
        advertise_link_failures: false,
        propagation: PropagationConfig::ShortestRoute,
        store: StoreConfig::default(),
    }
}

fn candidate_config(node_count: usize, density: f64) -> CandidateConfig {
    CandidateConfig {
        network: NetworkConfig {
            node_count,
            topology: TopologyConfig::Gilbert { density },
            cost_distribution: CostDistribution::Same,
        },
        routing: routing_config(),
        link_fail_rate: 0.0,
    }
}

fn experiment_config(candidate: CandidateConfig, steps: u64, samples: u64) -> ExperimentConfig {
    let mut candidates = std::collections::BTreeMap::new();
    candidates.insert("only".to_owned(), candidate);
    ExperimentConfig {
        seed: 42,
        candidates,
        measurement: MeasurementConfig { steps, samples },
        metrics: Vec::new(),
    }
}

// ── Graph generators ──────────────────────────────────────────────────────────

mod generators {
    use super::*;

    #[test]
    fn gilbert_extremes() {
        let mut rng = SimRng::new(1);
        let full = graphgen::gilbert(4, 1.0, CostDistribution::Same, &mut rng);
        for i in 0..4 {
            for j in 0..4 {
                assert!(full[i].contains_key(&NodeId(j as u32)));
            }
        }
        let empty = graphgen::gilbert(4, 0.0, CostDistribution::Same, &mut rng);
        assert!(empty.iter().all(|neighbors| neighbors.is_empty()));
    }

    #[test]
    fn gilbert_is_symmetric_in_presence() {
        let mut rng = SimRng::new(9);
        let graph = graphgen::gilbert(10, 0.3, CostDistribution::Uniform, &mut rng);
        for (i, neighbors) in graph.iter().enumerate() {
            for peer in neighbors.keys() {
                assert!(
                    graph[peer.index()].contains_key(&NodeId(i as u32)),
                    "edge {i}->{peer} has no reverse"
                );
            }
        }
    }

    #[test]
    fn watts_strogatz_without_rewiring_is_a_ring() {
        let mut rng = SimRng::new(1);
        let graph = graphgen::watts_strogatz(6, 2, 0.0, CostDistribution::Same, &mut rng);
        for (i, neighbors) in graph.iter().enumerate() {
            assert_eq!(neighbors.len(), 2, "node {i} should have 2 ring neighbors");
            assert!(neighbors.contains_key(&NodeId(((i + 1) % 6) as u32)));
            assert!(neighbors.contains_key(&NodeId(((i + 5) % 6) as u32)));
        }
    }

    #[test]
    fn watts_strogatz_rewiring_keeps_symmetry() {
        let mut rng = SimRng::new(5);
        let graph = graphgen::watts_strogatz(12, 4, 0.5, CostDistribution::Same, &mut rng);
        for (i, neighbors) in graph.iter().enumerate() {
            assert!(!neighbors.contains_key(&NodeId(i as u32)), "no self loops");
            for peer in neighbors.keys() {
                assert!(graph[peer.index()].contains_key(&NodeId(i as u32)));
            }
        }
    }
}

// ── Candidate assembly ────────────────────────────────────────────────────────

mod assembly {
    use super::*;

    #[test]
    fn complete_graph_wires_every_pair_once() {
        let candidate =
            Candidate::from_config(&candidate_config(3, 1.0), SimRng::new(1)).unwrap();
        let links = candidate.network().links();
        assert_eq!(links.canonical_links().len(), 3);
        for i in 0..3 {
            assert_eq!(links.ports(NodeId(i)).len(), 2);
        }
    }

    #[test]
    fn zero_nodes_fail_fast() {
        let err = Candidate::from_config(&candidate_config(0, 0.5), SimRng::new(1)).unwrap_err();
        assert!(matches!(err, ExperimentError::Config(_)));
    }

    #[test]
    fn out_of_range_rates_fail_fast() {
        let mut config = candidate_config(3, 0.5);
        config.link_fail_rate = 1.5;
        let err = Candidate::from_config(&config, SimRng::new(1)).unwrap_err();
        assert!(matches!(err, ExperimentError::Config(_)));
    }
}

// ── Configuration parsing ─────────────────────────────────────────────────────

mod parsing {
    use super::*;

    const FULL_CONFIG: &str = r#"{
        "seed": 7,
        "candidates": {
            "flood": {
                "network": {
                    "node_count": 8,
                    "strategy": "gilbert",
                    "density": 0.4,
                    "cost_distribution": "uniform"
                },
                "routing": {
                    "broadcast_forwarding_rate": 0.9,
                    "route_propagation": true,
                    "self_propagation": true,
                    "auto_forward_propagations": true,
                    "advertise_link_failures": true,
                    "propagation": {
                        "strategy": "alternate",
                        "ratio": 0.5,
                        "random": {"cutoff_rate": 0.3}
                    },
                    "store": {"eliminate_cycles": true}
                },
                "link_fail_rate": 0.01
            },
            "ring": {
                "network": {
                    "node_count": 12,
                    "strategy": "watts_strogatz",
                    "degree": 4,
                    "beta": 0.1
                },
                "routing": {
                    "broadcast_forwarding_rate": 0.5,
                    "self_propagation": true,
                    "propagation": {"strategy": "shortest_route"}
                }
            }
        },
        "measurement": {"steps": 100, "samples": 10},
        "metrics": ["routability", "efficiency"]
    }"#;

    #[test]
    fn full_config_deserializes() {
        let config: ExperimentConfig = serde_json::from_str(FULL_CONFIG).unwrap();
        assert_eq!(config.candidates.len(), 2);
        let flood = &config.candidates["flood"];
        assert!(matches!(
            flood.network.topology,
            TopologyConfig::Gilbert { density } if density == 0.4
        ));
        assert_eq!(flood.network.cost_distribution, CostDistribution::Uniform);
        assert!(flood.routing.store.eliminate_cycles);
        let ring = &config.candidates["ring"];
        assert!(matches!(
            ring.network.topology,
            TopologyConfig::WattsStrogatz { degree: 4, .. }
        ));
        // Omitted optional flags default off.
        assert!(!ring.routing.searching);
        assert_eq!(ring.network.cost_distribution, CostDistribution::Same);
    }

    #[test]
    fn unknown_strategy_names_fail() {
        let result = serde_json::from_str::<NetworkConfig>(
            r#"{"node_count": 4, "strategy": "erdos", "density": 0.5}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_metric_names_fail_at_assembly() {
        let mut config = experiment_config(candidate_config(2, 1.0), 10, 2);
        config.metrics = vec!["bogosity".to_owned()];
        let err = Experiment::from_config(&config).unwrap_err();
        assert!(matches!(err, ExperimentError::Metrics(_)));
    }

    #[test]
    fn invalid_measurement_windows_fail() {
        let config = experiment_config(candidate_config(2, 1.0), 10, 11);
        assert!(matches!(
            Experiment::from_config(&config).unwrap_err(),
            ExperimentError::Config(_)
        ));

        let config = experiment_config(candidate_config(2, 1.0), 0, 1);
        assert!(matches!(
            Experiment::from_config(&config).unwrap_err(),
            ExperimentError::Config(_)
        ));
    }
}

// ── Driver behavior ───────────────────────────────────────────────────────────

mod driver {
    use super::*;

    #[test]
    fn scrape_cadence_includes_the_final_sample() {
        let config = experiment_config(candidate_config(2, 1.0), 10, 5);
        let mut experiment = Experiment::from_config(&config).unwrap();
        let mut sink = MemorySink::default();
        experiment.run(&mut sink).unwrap();

        let steps: Vec<u64> = sink.samples.iter().map(|(step, _)| *step).collect();
        assert_eq!(steps, vec![0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn identical_seeds_reproduce_identical_samples() {
        let mut config = experiment_config(candidate_config(4, 0.6), 12, 3);
        {
            let candidate = config.candidates.get_mut("only").unwrap();
            candidate.routing.self_propagation = true;
            candidate.routing.auto_forward_propagations = true;
            candidate.link_fail_rate = 0.2;
            candidate.routing.advertise_link_failures = true;
        }
        // Wall-clock duration metrics are excluded: they are the one
        // non-deterministic output.
        config.metrics = vec![
            "transmissions_per_node".into(),
            "routability".into(),
            "efficiency".into(),
            "efficient_routability".into(),
            "demanded_routability".into(),
            "propagated_route_length".into(),
            "route_failures".into(),
        ];

        let run = |config: &ExperimentConfig| {
            let mut experiment = Experiment::from_config(config).unwrap();
            let mut sink = MemorySink::default();
            experiment.run(&mut sink).unwrap();
            sink.samples
        };
        assert_eq!(run(&config), run(&config));
    }

    #[test]
    fn two_nodes_learn_each_other_in_one_tick() {
        let mut config = candidate_config(2, 1.0);
        config.routing.self_propagation = true;
        let mut candidate = Candidate::from_config(&config, SimRng::new(3)).unwrap();
        candidate.run_step().unwrap();

        let network = candidate.network();
        assert!(network.handler(NodeId(0)).unwrap().has_route(NodeId(1)));
        assert!(network.handler(NodeId(1)).unwrap().has_route(NodeId(0)));
    }

    #[test]
    fn self_propagation_with_forwarding_converges_on_a_static_topology() {
        let mut config = candidate_config(4, 1.0);
        config.routing.self_propagation = true;
        config.routing.auto_forward_propagations = true;
        config.routing.broadcast_forwarding_rate = 0.8;
        let mut candidate = Candidate::from_config(&config, SimRng::new(11)).unwrap();

        let converged = |candidate: &Candidate| {
            (0..4).all(|i| {
                let router = candidate.network().handler(NodeId(i)).unwrap();
                (0..4).all(|j| router.has_route(NodeId(j)))
            })
        };

        let mut done = false;
        for _ in 0..200 {
            candidate.run_step().unwrap();
            if converged(&candidate) {
                done = true;
                break;
            }
        }
        assert!(done, "routers never learned all reachable targets");
    }

    #[test]
    fn churn_with_failure_advertisements_stays_healthy() {
        let mut config = candidate_config(6, 0.6);
        config.routing.self_propagation = true;
        config.routing.auto_forward_propagations = true;
        config.routing.broadcast_forwarding_rate = 0.6;
        config.routing.advertise_link_failures = true;
        config.link_fail_rate = 0.5;
        let mut candidate = Candidate::from_config(&config, SimRng::new(21)).unwrap();

        for _ in 0..20 {
            candidate.run_step().unwrap();
        }
        assert_eq!(candidate.network().node_count(), 6);
        let sample = candidate
            .scrape(&[Metric::Routability, Metric::RouteFailures])
            .unwrap();
        // Stale claims can outnumber the currently reachable pairs right
        // after a ruin, so routability is only bounded below here.
        assert!(sample["routability"] >= 0.0);
        assert!((0.0..=1.0).contains(&sample["route_failures"]));
    }

    #[test]
    fn scraped_quality_scores_stay_in_range_throughout() {
        let mut config = experiment_config(candidate_config(5, 0.7), 20, 4);
        {
            let candidate = config.candidates.get_mut("only").unwrap();
            candidate.routing.self_propagation = true;
            candidate.routing.route_propagation = true;
            candidate.routing.auto_forward_propagations = true;
            candidate.routing.broadcast_forwarding_rate = 0.7;
            candidate.routing.propagation = PropagationConfig::RandomRoute { cutoff_rate: 0.3 };
        }
        let mut experiment = Experiment::from_config(&config).unwrap();
        let mut sink = MemorySink::default();
        experiment.run(&mut sink).unwrap();

        for (_, sample) in &sink.samples {
            let metrics = &sample.candidates["only"];
            assert!((0.0..=1.0).contains(&metrics["routability"]));
            assert!((0.0..=1.0).contains(&metrics["efficiency"]));
            assert!(metrics["transmissions_per_node"] >= 0.0);
            assert!(metrics["route_insertion_duration"] >= 0.0);
        }
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

mod sinks {
    use super::*;
    use crate::driver::Sample;

    #[test]
    fn json_lines_sink_writes_one_record_per_scrape() {
        let config = experiment_config(candidate_config(2, 1.0), 4, 2);
        let mut experiment = Experiment::from_config(&config).unwrap();
        let mut buffer: Vec<u8> = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&mut buffer);
            experiment.run(&mut sink).unwrap();
            assert!(sink.take_error().is_none());
        }

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3); // scrapes at 0, 2, and after the loop

        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            let candidates = value.get("candidates").unwrap().as_object().unwrap();
            let metrics = candidates.get("only").unwrap().as_object().unwrap();
            assert!(metrics.contains_key("routability"));
            assert!(metrics.contains_key("transmissions_per_node"));
        }
    }

    #[test]
    fn csv_sink_emits_long_format_rows() {
        let config = experiment_config(candidate_config(2, 1.0), 4, 2);
        let mut experiment = Experiment::from_config(&config).unwrap();
        let mut buffer: Vec<u8> = Vec::new();
        {
            let mut sink = crate::sink::CsvSink::new(&mut buffer);
            experiment.run(&mut sink).unwrap();
            assert!(sink.take_error().is_none());
        }

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "step,candidate,metric,value");
        // 3 scrapes × 11 metrics × 1 candidate.
        assert_eq!(lines.count(), 3 * Metric::ALL.len());
    }

    #[test]
    fn memory_sink_preserves_emission_order() {
        let mut sink = MemorySink::default();
        let sample = Sample {
            candidates: std::collections::BTreeMap::new(),
        };
        sink.emit(0, &sample);
        sink.emit(5, &sample);
        assert_eq!(sink.samples[0].0, 0);
        assert_eq!(sink.samples[1].0, 5);
    }
}
