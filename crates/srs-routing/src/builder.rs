//! Router assembly from configuration.

use rustc_hash::FxHashMap;
use srs_core::{NodeId, SimRng, Tracker};

use crate::config::RoutingConfig;
use crate::datagram::PayloadKind;
use crate::engine::StackEngine;
use crate::propagate::Propagator;
use crate::router::{DisconnectTask, HandlerFn, ScheduledTask, StackRouter};
use crate::store::RouteStore;
use crate::{advertise, recover, search};

/// Builds one identically configured router per node of a candidate.
///
/// Each router gets two child-seeded RNG streams (engine and tasks) plus a
/// fresh demand map drawn from the factory stream, so candidate runs are
/// reproducible from a single root seed.
pub struct RouterFactory {
    config: RoutingConfig,
    node_count: usize,
    rng: SimRng,
}

impl RouterFactory {
    pub fn new(config: RoutingConfig, node_count: usize, rng: SimRng) -> Self {
        Self {
            config,
            node_count,
            rng,
        }
    }

    pub fn build_router(&mut self, node: NodeId, tracker: &Tracker) -> StackRouter {
        let engine_rng = self.rng.child(u64::from(node.0) * 2);
        let router_rng = self.rng.child(u64::from(node.0) * 2 + 1);

        // A random walk only makes sense for forwarded broadcasts; without
        // auto-forwarding every broadcast dies after one hop anyway.
        let random_walk =
            self.config.auto_forward_propagations && self.config.random_walk_broadcasting;
        let engine = StackEngine::new(
            self.config.broadcast_forwarding_rate,
            random_walk,
            engine_rng,
        );

        let store = RouteStore::new(node, self.config.store, tracker);
        let propagator = Propagator::from_config(&self.config.propagation);
        let demand: Vec<f64> = (0..self.node_count)
            .map(|_| self.rng.random_f64())
            .collect();

        let mut tasks: Vec<ScheduledTask> = Vec::new();
        if self.config.route_propagation {
            tasks.push(ScheduledTask::AdvertiseRoute);
        }
        if self.config.self_propagation {
            tasks.push(ScheduledTask::AdvertiseSelf);
        }
        if self.config.searching {
            tasks.push(ScheduledTask::Search);
        }

        let mut handlers: FxHashMap<PayloadKind, HandlerFn> = FxHashMap::default();
        handlers.insert(
            PayloadKind::RouteAdvertisement,
            advertise::handle_route_advertisement as HandlerFn,
        );
        if self.config.searching {
            handlers.insert(PayloadKind::RouteSearch, search::handle_route_search);
        }

        let mut disconnect_tasks: Vec<DisconnectTask> = Vec::new();
        if self.config.advertise_link_failures {
            handlers.insert(PayloadKind::LinkFailure, recover::handle_link_failure);
            disconnect_tasks.push(DisconnectTask::AdvertiseLinkFailure);
        }

        StackRouter::new(
            node,
            engine,
            Some(store),
            Some(propagator),
            tasks,
            handlers,
            disconnect_tasks,
            demand,
            self.config.auto_forward_propagations,
            router_rng,
        )
    }
}
