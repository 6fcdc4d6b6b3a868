//! The stack engine's unit of communication.
//!
//! A datagram carries a control payload plus two optional routes:
//!
//! * `origin` — a reverse-direction route accumulated hop by hop: every
//!   receiving engine prepends its ingress port, so executing `origin` from
//!   the receiver lands back at the sender.
//! * `destination` — `None` for a broadcast, `Some([p, ..])` for a unicast
//!   with `p` the next hop, `Some([])` once it has arrived.

use srs_core::{Cost, NodeId, Route};

/// Control-message payloads.  Adding a message type means adding a variant
/// here, a [`PayloadKind`] tag, and a handler-table entry in the router.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// `target` is reachable at `cost` along the datagram's origin route.
    RouteAdvertisement { target: NodeId, cost: Cost },
    /// Request for a route towards `target`.
    RouteSearch { target: NodeId },
    /// The link behind the origin route's first hop went down.
    LinkFailure,
}

/// Discriminator used as the router's handler-table key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    RouteAdvertisement,
    RouteSearch,
    LinkFailure,
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::RouteAdvertisement { .. } => PayloadKind::RouteAdvertisement,
            Payload::RouteSearch { .. } => PayloadKind::RouteSearch,
            Payload::LinkFailure => PayloadKind::LinkFailure,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Datagram {
    pub payload: Payload,
    pub origin: Option<Route>,
    pub destination: Option<Route>,
}

impl Datagram {
    /// A datagram with no destination, fanned out per the engine's broadcast
    /// policy.
    pub fn broadcast(payload: Payload, origin: Option<Route>) -> Self {
        Self {
            payload,
            origin,
            destination: None,
        }
    }

    /// A datagram steered hop by hop along `destination`.
    pub fn unicast(payload: Payload, origin: Option<Route>, destination: Route) -> Self {
        Self {
            payload,
            origin,
            destination: Some(destination),
        }
    }
}
