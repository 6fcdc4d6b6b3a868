//! Node-scoped view of the link layer.

use srs_core::{Cost, NodeId, PortNumber};

use crate::error::NetResult;
use crate::fabric::Links;

/// A node's handle on its own ports: enumerate, price, send.
///
/// Sends enqueue onto the fabric's live queue; the owning `Network` drains
/// once the current handler or task returns.
pub struct Adapter<'a, F> {
    links: &'a mut Links<F>,
    node: NodeId,
}

impl<'a, F> Adapter<'a, F> {
    pub(crate) fn new(links: &'a mut Links<F>, node: NodeId) -> Self {
        Self { links, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Open port numbers, ascending.
    pub fn ports(&self) -> Vec<PortNumber> {
        self.links.ports(self.node)
    }

    pub fn port_cost(&self, port: PortNumber) -> NetResult<Cost> {
        self.links.port_cost(self.node, port)
    }

    pub fn send(&mut self, port: PortNumber, frame: F) -> NetResult<()> {
        self.links.enqueue(self.node, port, frame)
    }
}
