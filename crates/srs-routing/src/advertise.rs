//! Route advertisement: the two advertising tasks and the ingest handler.

use srs_net::Links;

use crate::datagram::{Datagram, Payload};
use crate::error::{RoutingError, RoutingResult};
use crate::router::StackRouter;

/// Ask the propagator for a choice and broadcast it with the chosen route as
/// the advertisement's origin.  Skips the tick when there is nothing to pick.
pub(crate) fn run_route_advertiser(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
) -> RoutingResult<()> {
    let Some(store) = router.store.as_ref() else {
        return Ok(());
    };
    let Some(propagator) = router.propagator.as_ref() else {
        return Ok(());
    };
    let ports = links.ports(router.node);
    let Some(choice) = propagator.pick(store, &ports, &mut router.rng)? else {
        return Ok(());
    };
    router.engine.send_datagram(
        &mut links.adapter(router.node),
        Datagram::broadcast(
            Payload::RouteAdvertisement {
                target: choice.target,
                cost: choice.cost,
            },
            Some(choice.route),
        ),
    )
}

/// Broadcast "I am reachable at cost 0 along the reverse of wherever this
/// came from".  The origin starts empty and accumulates ports hop by hop.
pub(crate) fn run_self_advertiser(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
) -> RoutingResult<()> {
    router.engine.send_datagram(
        &mut links.adapter(router.node),
        Datagram::broadcast(
            Payload::RouteAdvertisement {
                target: router.node,
                cost: 0.0,
            },
            Some(Vec::new()),
        ),
    )
}

/// Ingest an advertisement: charge the ingress hop on top of the advertised
/// cost, store the accumulated origin as a route to the target, and
/// optionally pass the (updated) advertisement on.
pub(crate) fn handle_route_advertisement(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
    mut datagram: Datagram,
) -> RoutingResult<()> {
    let Payload::RouteAdvertisement { target, cost } = datagram.payload else {
        return Err(RoutingError::PayloadMismatch);
    };

    if let Some(store) = router.store.as_mut() {
        let origin = datagram.origin.as_ref().ok_or(RoutingError::MissingOrigin)?;
        let incoming = *origin.first().ok_or(RoutingError::MissingOrigin)?;
        let updated_cost = cost + links.port_cost(router.node, incoming)?;
        store.insert(target, origin.clone(), updated_cost)?;
        datagram.payload = Payload::RouteAdvertisement {
            target,
            cost: updated_cost,
        };
    }

    // Forwarded advertisements carry the accumulated origin and cost, so the
    // next hop sees them exactly as a fresh broadcast from here would.
    // Unicast answers that have reached their destination are not re-sent.
    if router.auto_forward && datagram.destination.is_none() {
        router
            .engine
            .send_datagram(&mut links.adapter(router.node), datagram)?;
    }
    Ok(())
}
