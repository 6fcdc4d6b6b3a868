use srs_core::{NodeId, PortNumber};
use thiserror::Error;

/// Fabric invariant violations.  All fatal: the simulation has no
/// partial-failure path, so these propagate to the driver.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {node} has no port {port}")]
    UnknownPort { node: NodeId, port: PortNumber },

    #[error("node {0} has no registered handler")]
    NoHandler(NodeId),

    #[error("port {port} of node {node} has no matching peer record")]
    HalfOpenLink { node: NodeId, port: PortNumber },
}

pub type NetResult<T> = Result<T, NetError>;
