//! Port tables, transmission queue, and the drain loop.

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use srs_core::instrument::names;
use srs_core::{Cost, Counter, NodeId, PortNumber, Tracker};
use tracing::trace;

use crate::adapter::Adapter;
use crate::error::{NetError, NetResult};

// ── Link-layer state ──────────────────────────────────────────────────────────

/// One end of a link: where its frames come out, and what a hop costs.
#[derive(Debug, Clone)]
pub struct PortRecord {
    pub peer: NodeId,
    pub peer_port: PortNumber,
    pub cost: Cost,
}

#[derive(Default)]
struct NodePorts {
    ports: BTreeMap<PortNumber, PortRecord>,
    /// Monotonic; port numbers are never reassigned after disconnection.
    next_port: u32,
}

impl NodePorts {
    fn fresh_port(&mut self) -> PortNumber {
        let port = PortNumber(self.next_port);
        self.next_port += 1;
        port
    }
}

struct Transmission<F> {
    recipient: NodeId,
    port: PortNumber,
    frame: F,
}

/// The link layer: per-node port tables plus the pending-delivery queue.
///
/// Handlers receive `&mut Links` during delivery so they can read their port
/// table and enqueue further sends; the queue is drained by the owning
/// [`Network`] once control returns.
pub struct Links<F> {
    nodes: Vec<NodePorts>,
    queue: VecDeque<Transmission<F>>,
    transmissions: Rc<Counter>,
}

impl<F> Links<F> {
    fn new(node_count: usize, tracker: &Tracker) -> Self {
        Self {
            nodes: (0..node_count).map(|_| NodePorts::default()).collect(),
            queue: VecDeque::new(),
            transmissions: tracker.counter(names::TRANSMISSION_COUNT),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, node: NodeId) -> NetResult<&NodePorts> {
        self.nodes.get(node.index()).ok_or(NetError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> NetResult<&mut NodePorts> {
        self.nodes
            .get_mut(node.index())
            .ok_or(NetError::UnknownNode(node))
    }

    /// Port numbers currently open at `node`, ascending.
    pub fn ports(&self, node: NodeId) -> Vec<PortNumber> {
        match self.node(node) {
            Ok(n) => n.ports.keys().copied().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn port_record(&self, node: NodeId, port: PortNumber) -> Option<&PortRecord> {
        self.node(node).ok().and_then(|n| n.ports.get(&port))
    }

    /// Cost of the outgoing direction of `(node, port)`.
    pub fn port_cost(&self, node: NodeId, port: PortNumber) -> NetResult<Cost> {
        self.node(node)?
            .ports
            .get(&port)
            .map(|record| record.cost)
            .ok_or(NetError::UnknownPort { node, port })
    }

    /// Enqueue `frame` for the peer of `(sender, port)`.  Delivery happens
    /// when the owning [`Network`] next drains the queue.
    pub fn enqueue(&mut self, sender: NodeId, port: PortNumber, frame: F) -> NetResult<()> {
        let record = self
            .node(sender)?
            .ports
            .get(&port)
            .ok_or(NetError::UnknownPort { node: sender, port })?;
        self.queue.push_back(Transmission {
            recipient: record.peer,
            port: record.peer_port,
            frame,
        });
        Ok(())
    }

    /// Node-scoped view used by stack engines.
    pub fn adapter(&mut self, node: NodeId) -> Adapter<'_, F> {
        Adapter::new(self, node)
    }

    /// Every connected link exactly once, as the `(node, port)` end with
    /// `node > peer`.  Self-links have no such end and are not enumerated.
    pub fn canonical_links(&self) -> Vec<(NodeId, PortNumber)> {
        let mut links = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let node_id = NodeId(index as u32);
            for (&port, record) in &node.ports {
                if node_id > record.peer {
                    links.push((node_id, port));
                }
            }
        }
        links
    }
}

// ── Handler trait ─────────────────────────────────────────────────────────────

/// Per-node link-event handler (one per registered node).
///
/// `Error` must absorb [`NetError`] so fabric violations discovered during a
/// cascade propagate through the same channel as the handler's own failures.
pub trait LinkHandler {
    type Frame: Clone;
    type Error: From<NetError> + std::error::Error + 'static;

    /// A frame arrived on `ingress`.  Sends issued from here are appended to
    /// the live queue and delivered after the current batch, in order.
    fn handle(
        &mut self,
        links: &mut Links<Self::Frame>,
        ingress: PortNumber,
        frame: Self::Frame,
    ) -> Result<(), Self::Error>;

    /// The link behind `port` was disconnected (both ends already removed).
    fn on_link_down(
        &mut self,
        links: &mut Links<Self::Frame>,
        port: PortNumber,
    ) -> Result<(), Self::Error>;
}

// ── Network ───────────────────────────────────────────────────────────────────

/// The fabric: link-layer state plus one handler slot per node.
pub struct Network<H: LinkHandler> {
    links: Links<H::Frame>,
    handlers: Vec<Option<H>>,
}

impl<H: LinkHandler> Network<H> {
    pub fn new(node_count: usize, tracker: &Tracker) -> Self {
        Self {
            links: Links::new(node_count, tracker),
            handlers: (0..node_count).map(|_| None).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.links.node_count()
    }

    pub fn links(&self) -> &Links<H::Frame> {
        &self.links
    }

    pub fn register(&mut self, node: NodeId, handler: H) -> NetResult<()> {
        let slot = self
            .handlers
            .get_mut(node.index())
            .ok_or(NetError::UnknownNode(node))?;
        *slot = Some(handler);
        Ok(())
    }

    pub fn handler(&self, node: NodeId) -> Option<&H> {
        self.handlers.get(node.index()).and_then(Option::as_ref)
    }

    pub fn handler_mut(&mut self, node: NodeId) -> Option<&mut H> {
        self.handlers.get_mut(node.index()).and_then(Option::as_mut)
    }

    /// Install a link between `a` and `b` with the given per-direction costs.
    /// Both directions are installed atomically; on failure nothing is.
    ///
    /// Connecting a node to itself installs two distinct cross-linked ports,
    /// so a self-link sends, delivers, and disconnects like any other link.
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        cost_ab: Cost,
        cost_ba: Cost,
    ) -> Result<(PortNumber, PortNumber), H::Error> {
        // Validate both ends before touching either port table.
        self.links.node(a).map_err(H::Error::from)?;
        self.links.node(b).map_err(H::Error::from)?;

        let port_a = self.links.node_mut(a).map_err(H::Error::from)?.fresh_port();
        let port_b = self.links.node_mut(b).map_err(H::Error::from)?.fresh_port();
        self.links.nodes[a.index()].ports.insert(
            port_a,
            PortRecord {
                peer: b,
                peer_port: port_b,
                cost: cost_ab,
            },
        );
        self.links.nodes[b.index()].ports.insert(
            port_b,
            PortRecord {
                peer: a,
                peer_port: port_a,
                cost: cost_ba,
            },
        );
        trace!(%a, %b, %port_a, %port_b, "link up");
        Ok((port_a, port_b))
    }

    /// Remove the link behind `(node, port)`: local record first, peer record
    /// second, then each side's handler is notified (local first) with its
    /// send cascade drained before the other side hears about it.
    pub fn disconnect(&mut self, node: NodeId, port: PortNumber) -> Result<(), H::Error> {
        let record = self
            .links
            .node_mut(node)
            .map_err(H::Error::from)?
            .ports
            .remove(&port)
            .ok_or(NetError::UnknownPort { node, port })?;
        self.links
            .node_mut(record.peer)
            .map_err(H::Error::from)?
            .ports
            .remove(&record.peer_port)
            .ok_or(NetError::HalfOpenLink { node, port })?;
        trace!(%node, %port, peer = %record.peer, "link down");

        self.notify_link_down(node, port)?;
        self.notify_link_down(record.peer, record.peer_port)?;
        Ok(())
    }

    fn notify_link_down(&mut self, node: NodeId, port: PortNumber) -> Result<(), H::Error> {
        let handler = self.handlers[node.index()]
            .as_mut()
            .ok_or(NetError::NoHandler(node))?;
        handler.on_link_down(&mut self.links, port)?;
        self.drain()
    }

    /// Enqueue `frame` for the peer of `(node, port)` and drain the queue to
    /// empty before returning.
    pub fn send(&mut self, node: NodeId, port: PortNumber, frame: H::Frame) -> Result<(), H::Error> {
        self.links.enqueue(node, port, frame).map_err(H::Error::from)?;
        self.drain()
    }

    /// Run `f` with `(handler, links)` for `node`, then drain whatever it
    /// enqueued.  This is how the driver runs router tasks: each task's send
    /// cascade completes before the next task fires.
    pub fn drive<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut H, &mut Links<H::Frame>) -> Result<R, H::Error>,
    ) -> Result<R, H::Error> {
        let handler = self
            .handlers
            .get_mut(node.index())
            .ok_or(NetError::UnknownNode(node))?
            .as_mut()
            .ok_or(NetError::NoHandler(node))?;
        let result = f(handler, &mut self.links)?;
        self.drain()?;
        Ok(result)
    }

    /// Deliver queued transmissions strictly FIFO until the queue is empty.
    /// Each delivery is counted and dispatched exactly once; a delivery to a
    /// node with no registered handler is fatal.
    fn drain(&mut self) -> Result<(), H::Error> {
        while let Some(transmission) = self.links.queue.pop_front() {
            self.links.transmissions.add(1.0);
            let handler = self.handlers[transmission.recipient.index()]
                .as_mut()
                .ok_or(NetError::NoHandler(transmission.recipient))?;
            handler.handle(&mut self.links, transmission.port, transmission.frame)?;
        }
        Ok(())
    }
}
