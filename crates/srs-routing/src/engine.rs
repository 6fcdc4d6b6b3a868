//! Datagram egress policies.
//!
//! The engine turns datagram-level sends into link-level transmissions.
//! Ingress (origin prepending, deliver-vs-forward) lives in the router's
//! `LinkHandler::handle`, which owns the engine and dispatches to it.

use srs_core::SimRng;
use srs_net::Adapter;

use crate::datagram::Datagram;
use crate::error::{RoutingError, RoutingResult};

/// Per-node datagram layer.
pub struct StackEngine {
    forwarding_rate: f64,
    random_walk: bool,
    rng: SimRng,
}

impl StackEngine {
    pub fn new(forwarding_rate: f64, random_walk: bool, rng: SimRng) -> Self {
        Self {
            forwarding_rate,
            random_walk,
            rng,
        }
    }

    /// Transmit `datagram` according to its destination.
    ///
    /// * Unicast: pop the first destination port and forward the remainder
    ///   on it.  An exhausted destination here is a routing bug.
    /// * Broadcast, random-walk mode: with probability `forwarding_rate`
    ///   send on one uniformly random port.
    /// * Broadcast, flood mode: send on each port independently with
    ///   probability `forwarding_rate / port_count`.
    pub fn send_datagram(
        &mut self,
        adapter: &mut Adapter<'_, Datagram>,
        datagram: Datagram,
    ) -> RoutingResult<()> {
        match datagram.destination {
            Some(destination) => {
                let (&next, rest) = destination
                    .split_first()
                    .ok_or(RoutingError::EmptyDestination)?;
                adapter.send(
                    next,
                    Datagram {
                        payload: datagram.payload,
                        origin: datagram.origin,
                        destination: Some(rest.to_vec()),
                    },
                )?;
                Ok(())
            }
            None => self.broadcast(adapter, datagram),
        }
    }

    fn broadcast(
        &mut self,
        adapter: &mut Adapter<'_, Datagram>,
        datagram: Datagram,
    ) -> RoutingResult<()> {
        let ports = adapter.ports();
        if ports.is_empty() {
            return Ok(());
        }
        if self.random_walk {
            if self.forwarding_rate > self.rng.random_f64() {
                let port = ports[self.rng.pick_index(ports.len())];
                adapter.send(port, datagram)?;
            }
        } else {
            let probability = self.forwarding_rate / ports.len() as f64;
            for port in ports {
                if probability > self.rng.random_f64() {
                    adapter.send(port, datagram.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Transmit on every port unconditionally (failure storm).
    pub fn send_full_broadcast(
        &mut self,
        adapter: &mut Adapter<'_, Datagram>,
        datagram: Datagram,
    ) -> RoutingResult<()> {
        for port in adapter.ports() {
            adapter.send(port, datagram.clone())?;
        }
        Ok(())
    }
}
