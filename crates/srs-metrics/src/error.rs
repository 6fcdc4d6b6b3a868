use srs_routing::RoutingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric not supported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

pub type MetricsResult<T> = Result<T, MetricsError>;
