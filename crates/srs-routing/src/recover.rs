//! Link-failure advertisement and pruning.
//!
//! When a port goes down, its node broadcasts a failure whose origin is that
//! single port.  Each receiver prepends its ingress port, so from any node
//! the origin is the route towards the failed link.  A node storing routes
//! that start with that origin prunes them and storms the failure to every
//! port; nodes unaffected by the failure stop the storm.

use srs_core::PortNumber;
use srs_net::Links;

use crate::datagram::{Datagram, Payload};
use crate::error::{RoutingError, RoutingResult};
use crate::router::StackRouter;

/// Disconnect task: advertise the failed port.
pub(crate) fn run_link_failure_advertiser(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
    port: PortNumber,
) -> RoutingResult<()> {
    router.engine.send_datagram(
        &mut links.adapter(router.node),
        Datagram::broadcast(Payload::LinkFailure, Some(vec![port])),
    )
}

/// Handler: prune routes through the failed link and storm the failure on.
pub(crate) fn handle_link_failure(
    router: &mut StackRouter,
    links: &mut Links<Datagram>,
    datagram: Datagram,
) -> RoutingResult<()> {
    if !matches!(datagram.payload, Payload::LinkFailure) {
        return Err(RoutingError::PayloadMismatch);
    }
    let origin = datagram.origin.ok_or(RoutingError::MissingOrigin)?;

    if let Some(store) = router.store.as_mut() {
        if store.has_routes_starting_with(&origin) {
            store.remove_routes_starting_with(&origin)?;
            router.engine.send_full_broadcast(
                &mut links.adapter(router.node),
                Datagram::broadcast(Payload::LinkFailure, Some(origin)),
            )?;
        }
    }
    Ok(())
}
