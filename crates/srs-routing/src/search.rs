//! Demand-driven route search.
//!
//! The searcher periodically broadcasts a request for a target drawn from the
//! router's demand map (weighted by demand via prefix sums).  A node that
//! knows the target answers with a unicast advertisement steered back along
//! the request's accumulated origin, then passes the request on.

use srs_core::NodeId;
use srs_net::Links;

use crate::datagram::{Datagram, Payload};
use crate::error::{RoutingError, RoutingResult};
use crate::router::StackRouter;

/// Scheduled task: broadcast a search for one demand-weighted target.
/// Skips the tick when total demand is zero.
pub(crate) fn run_searcher(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
) -> RoutingResult<()> {
    let Some(target) = pick_demanded_target(router) else {
        return Ok(());
    };
    router.engine.send_datagram(
        &mut links.adapter(router.node),
        Datagram::broadcast(Payload::RouteSearch { target }, Some(Vec::new())),
    )
}

pub(crate) fn pick_demanded_target(router: &mut StackRouter) -> Option<NodeId> {
    let &total = router.demand_prefix.last()?;
    if total <= 0.0 {
        return None;
    }
    let position = router.rng.random_f64() * total;
    let index = router
        .demand_prefix
        .partition_point(|&accumulated| accumulated <= position)
        .min(router.demand_prefix.len() - 1);
    Some(NodeId(index as u32))
}

/// Handler: answer known targets with a unicast advertisement along the
/// request's return route, then re-broadcast the request.
pub(crate) fn handle_route_search(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
    datagram: Datagram,
) -> RoutingResult<()> {
    let Payload::RouteSearch { target } = datagram.payload else {
        return Err(RoutingError::PayloadMismatch);
    };

    if let Some(store) = router.store.as_ref() {
        if store.has_route(target) {
            if let Some(priced) = store.shortest_route(target)? {
                let return_route = datagram
                    .origin
                    .clone()
                    .ok_or(RoutingError::MissingOrigin)?;
                router.engine.send_datagram(
                    &mut links.adapter(router.node),
                    Datagram::unicast(
                        Payload::RouteAdvertisement {
                            target,
                            cost: priced.cost,
                        },
                        Some(priced.path),
                        return_route,
                    ),
                )?;
            }
        }
    }

    router.engine.send_datagram(
        &mut links.adapter(router.node),
        Datagram::broadcast(Payload::RouteSearch { target }, datagram.origin),
    )
}
