use srs_core::NodeId;
use srs_net::NetError;
use thiserror::Error;

use crate::datagram::PayloadKind;

/// Route-store inconsistencies and rejected inputs.
///
/// The chain errors indicate a compression bug and are fatal; the input
/// errors enforce the insert preconditions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("insert cost must be finite and non-negative, got {cost}")]
    InvalidCost { cost: f64 },

    #[error("node {owner}: empty route cannot reach target {target}")]
    EmptyRoute { owner: NodeId, target: NodeId },

    #[error("node {owner}: route exhausted at {at} before reaching {target}")]
    RouteTargetContradiction {
        owner: NodeId,
        at: NodeId,
        target: NodeId,
    },

    #[error("node {owner}: {target} has no predecessor")]
    MissingPredecessor { owner: NodeId, target: NodeId },

    #[error("node {owner}: {pred} is best predecessor of {target} but has no edge to it")]
    MissingEdge {
        owner: NodeId,
        pred: NodeId,
        target: NodeId,
    },

    #[error("node {owner}: edge {pred} -> {target} holds no priced routes")]
    EmptyEdge {
        owner: NodeId,
        pred: NodeId,
        target: NodeId,
    },

    #[error("node {owner}: predecessor chain of {target} does not terminate")]
    PredecessorCycle { owner: NodeId, target: NodeId },

    #[error("node {owner}: redirected segment via {via} left an empty remainder")]
    EmptyRemainder { owner: NodeId, via: NodeId },

    #[error("node {owner}: segment source {node} is not in the store")]
    UnknownNode { owner: NodeId, node: NodeId },
}

/// Router-level failures, absorbing fabric and store errors so one channel
/// reaches the driver.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no handler registered for {0:?} payloads")]
    UnhandledPayload(PayloadKind),

    #[error("datagram payload does not match the invoked handler")]
    PayloadMismatch,

    #[error("received a datagram without an origin route")]
    MissingOrigin,

    #[error("unicast datagram reached egress with an exhausted destination")]
    EmptyDestination,

    #[error("scheduled task index {0} out of range")]
    UnknownTask(usize),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
