use srs_core::NodeId;
use srs_metrics::MetricsError;
use srs_routing::RoutingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("experiment configuration error: {0}")]
    Config(String),

    #[error("generated graph lists edge {from} -> {to} without a reverse cost")]
    AsymmetricGraph { from: NodeId, to: NodeId },

    #[error("node {0} has no router registered")]
    MissingRouter(NodeId),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

pub type ExperimentResult<T> = Result<T, ExperimentError>;
