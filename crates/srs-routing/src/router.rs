//! The extensible per-node router.
//!
//! A `StackRouter` composes a stack engine, an optional route store, an
//! ordered list of scheduled tasks, a payload-kind-keyed message-handler
//! table, and a list of disconnect tasks.  It is the fabric's `LinkHandler`:
//! link frames come in, get their origin extended, and are either forwarded
//! (unicast with hops left) or dispatched to the handler for their payload
//! tag.

use rustc_hash::FxHashMap;
use srs_core::{Cost, NodeId, PortNumber, Route, SimRng};
use srs_net::{LinkHandler, Links};

use crate::datagram::{Datagram, PayloadKind};
use crate::engine::StackEngine;
use crate::error::{RoutingError, RoutingResult};
use crate::propagate::Propagator;
use crate::store::RouteStore;
use crate::{advertise, recover, search};

/// Message handler: one entry per payload tag.  Plain function pointers keep
/// the table extensible without sharing mutable handler state.
pub type HandlerFn = fn(&mut StackRouter, &mut Links<Datagram>, Datagram) -> RoutingResult<()>;

/// Work a router performs once per tick, in list order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Broadcast whatever the propagator picks.
    AdvertiseRoute,
    /// Broadcast own reachability at cost zero.
    AdvertiseSelf,
    /// Broadcast a search for a demand-weighted target.
    Search,
}

/// Work a router performs when one of its ports goes down.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DisconnectTask {
    AdvertiseLinkFailure,
}

/// Query surface the metrics layer sees.
pub trait Router {
    fn has_route(&self, target: NodeId) -> bool;
    fn route(&self, target: NodeId) -> RoutingResult<Option<Route>>;
    fn demand(&self, target: NodeId) -> Cost;
}

pub struct StackRouter {
    pub(crate) node: NodeId,
    pub(crate) engine: StackEngine,
    pub(crate) store: Option<RouteStore>,
    pub(crate) propagator: Option<Propagator>,
    pub(crate) rng: SimRng,
    pub(crate) auto_forward: bool,
    tasks: Vec<ScheduledTask>,
    handlers: FxHashMap<PayloadKind, HandlerFn>,
    disconnect_tasks: Vec<DisconnectTask>,
    /// Interest weight per target node, indexed densely by `NodeId`.
    demand: Vec<f64>,
    /// Inclusive prefix sums of `demand`, for weighted target picks.
    pub(crate) demand_prefix: Vec<f64>,
}

impl StackRouter {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node: NodeId,
        engine: StackEngine,
        store: Option<RouteStore>,
        propagator: Option<Propagator>,
        tasks: Vec<ScheduledTask>,
        handlers: FxHashMap<PayloadKind, HandlerFn>,
        disconnect_tasks: Vec<DisconnectTask>,
        demand: Vec<f64>,
        auto_forward: bool,
        rng: SimRng,
    ) -> Self {
        let mut demand_prefix = Vec::with_capacity(demand.len());
        let mut accumulated = 0.0;
        for &weight in &demand {
            accumulated += weight;
            demand_prefix.push(accumulated);
        }
        Self {
            node,
            engine,
            store,
            propagator,
            rng,
            auto_forward,
            tasks,
            handlers,
            disconnect_tasks,
            demand,
            demand_prefix,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn store(&self) -> Option<&RouteStore> {
        self.store.as_ref()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Execute scheduled task `index`.  The driver runs tasks one at a time
    /// through `Network::drive`, so each task's send cascade completes
    /// before the next task fires.
    pub fn run_task(&mut self, links: &mut Links<Datagram>, index: usize) -> RoutingResult<()> {
        let task = *self
            .tasks
            .get(index)
            .ok_or(RoutingError::UnknownTask(index))?;
        match task {
            ScheduledTask::AdvertiseRoute => advertise::run_route_advertiser(self, links),
            ScheduledTask::AdvertiseSelf => advertise::run_self_advertiser(self, links),
            ScheduledTask::Search => search::run_searcher(self, links),
        }
    }

    /// Dispatch a datagram that terminated here to the handler registered
    /// for its payload tag.
    fn receive_datagram(
        &mut self,
        links: &mut Links<Datagram>,
        datagram: Datagram,
    ) -> RoutingResult<()> {
        let kind = datagram.payload.kind();
        let handler = *self
            .handlers
            .get(&kind)
            .ok_or(RoutingError::UnhandledPayload(kind))?;
        handler(self, links, datagram)
    }
}

impl LinkHandler for StackRouter {
    type Frame = Datagram;
    type Error = RoutingError;

    fn handle(
        &mut self,
        links: &mut Links<Datagram>,
        ingress: PortNumber,
        mut frame: Datagram,
    ) -> RoutingResult<()> {
        if let Some(origin) = frame.origin.as_mut() {
            origin.insert(0, ingress);
        }
        match &frame.destination {
            // Unicast with hops left: pure forwarding, the payload is not
            // examined here.
            Some(remaining) if !remaining.is_empty() => self
                .engine
                .send_datagram(&mut links.adapter(self.node), frame),
            // Arrived unicast or broadcast: hand to the endpoint.  Whether a
            // broadcast travels on is the handler's decision, not the
            // engine's.
            _ => self.receive_datagram(links, frame),
        }
    }

    fn on_link_down(&mut self, links: &mut Links<Datagram>, port: PortNumber) -> RoutingResult<()> {
        for index in 0..self.disconnect_tasks.len() {
            match self.disconnect_tasks[index] {
                DisconnectTask::AdvertiseLinkFailure => {
                    recover::run_link_failure_advertiser(self, links, port)?;
                }
            }
        }
        Ok(())
    }
}

impl Router for StackRouter {
    fn has_route(&self, target: NodeId) -> bool {
        self.store.as_ref().is_some_and(|s| s.has_route(target))
    }

    fn route(&self, target: NodeId) -> RoutingResult<Option<Route>> {
        match &self.store {
            Some(store) => Ok(store.shortest_route(target)?.map(|priced| priced.path)),
            None => Ok(None),
        }
    }

    fn demand(&self, target: NodeId) -> f64 {
        self.demand.get(target.index()).copied().unwrap_or(0.0)
    }
}
