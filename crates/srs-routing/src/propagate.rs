//! Advertisement-selection strategies.
//!
//! A propagator picks what a router advertises next: an outgoing port, a
//! known target, a concrete route to it, and its cost.  The port pick is
//! uniform; the route pick is the strategy.  With no ports open there is
//! nothing to advertise and `pick` returns `None`.

use srs_core::{Cost, NodeId, PortNumber, Route, SimRng};

use crate::config::PropagationConfig;
use crate::error::RoutingResult;
use crate::store::RouteStore;

/// One advertisement choice.  The port is picked alongside the route even
/// though broadcast egress re-rolls ports; unicast strategies use it.
pub struct Choice {
    pub port: PortNumber,
    pub target: NodeId,
    pub route: Route,
    pub cost: Cost,
}

pub enum Propagator {
    /// Random walk over the store with a per-hop stop probability.
    RandomRoute { cutoff_rate: f64 },
    /// Shortest route to a uniformly random known target.
    ShortestRoute,
    /// Delegate to `first` with probability `ratio`, else to `second`.
    Alternate {
        ratio: f64,
        first: Box<Propagator>,
        second: Box<Propagator>,
    },
}

impl Propagator {
    pub fn from_config(config: &PropagationConfig) -> Propagator {
        match config {
            PropagationConfig::RandomRoute { cutoff_rate } => Propagator::RandomRoute {
                cutoff_rate: *cutoff_rate,
            },
            PropagationConfig::ShortestRoute => Propagator::ShortestRoute,
            PropagationConfig::Alternate {
                ratio,
                random,
                shortest: _,
            } => Propagator::Alternate {
                ratio: *ratio,
                first: Box::new(Propagator::RandomRoute {
                    cutoff_rate: random.cutoff_rate,
                }),
                second: Box::new(Propagator::ShortestRoute),
            },
        }
    }

    pub fn pick(
        &self,
        store: &RouteStore,
        ports: &[PortNumber],
        rng: &mut SimRng,
    ) -> RoutingResult<Option<Choice>> {
        match self {
            Propagator::Alternate {
                ratio,
                first,
                second,
            } => {
                if *ratio > rng.random_f64() {
                    first.pick(store, ports, rng)
                } else {
                    second.pick(store, ports, rng)
                }
            }
            Propagator::RandomRoute { cutoff_rate } => {
                if ports.is_empty() {
                    return Ok(None);
                }
                let port = ports[rng.pick_index(ports.len())];
                let (target, route, cost) = random_walk(store, *cutoff_rate, rng);
                Ok(Some(Choice {
                    port,
                    target,
                    route,
                    cost,
                }))
            }
            Propagator::ShortestRoute => {
                if ports.is_empty() {
                    return Ok(None);
                }
                let port = ports[rng.pick_index(ports.len())];
                let targets = store.known_targets();
                let target = targets[rng.pick_index(targets.len())];
                // A known target can be unreachable after failure pruning;
                // there is nothing to advertise about it this tick.
                let Some(priced) = store.shortest_route(target)? else {
                    return Ok(None);
                };
                Ok(Some(Choice {
                    port,
                    target,
                    route: priced.path,
                    cost: priced.cost,
                }))
            }
        }
    }
}

/// Walk the store from its owner: stop at dead ends, otherwise stop with
/// probability `cutoff_rate` per hop, else take a uniformly random edge and
/// a uniformly random priced route on it.
fn random_walk(store: &RouteStore, cutoff_rate: f64, rng: &mut SimRng) -> (NodeId, Route, Cost) {
    let mut current = store.source();
    let mut route: Route = Vec::new();
    let mut cost: Cost = 0.0;
    loop {
        let successors = store.successors(current);
        if successors.is_empty() {
            break;
        }
        if cutoff_rate > rng.random_f64() {
            break;
        }
        let successor = successors[rng.pick_index(successors.len())];
        let segments = store.edge_routes(current, successor);
        let segment = &segments[rng.pick_index(segments.len())];
        route.extend_from_slice(&segment.path);
        cost += segment.cost;
        current = successor;
    }
    (current, route, cost)
}
