//! Router-factory configuration.
//!
//! These structs are the `routing` section of a candidate configuration.
//! They derive `Deserialize` so an application can load them from TOML/JSON;
//! the core only ever sees the prepared values.  Strategy selection uses
//! internally tagged enums, so an unknown strategy name fails at
//! deserialization time rather than deep inside assembly.

use serde::Deserialize;

/// Per-candidate routing behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Probability mass a broadcast spends on forwarding, in `[0, 1]`.
    pub broadcast_forwarding_rate: f64,
    /// Broadcast as a single random walk instead of per-port flooding.
    /// Only effective together with `auto_forward_propagations`.
    #[serde(default)]
    pub random_walk_broadcasting: bool,
    /// Schedule the propagator-driven advertisement task.
    #[serde(default)]
    pub route_propagation: bool,
    /// Schedule the cost-zero self-advertisement task.
    #[serde(default)]
    pub self_propagation: bool,
    /// Re-broadcast received advertisements.
    #[serde(default)]
    pub auto_forward_propagations: bool,
    /// Schedule the demand-driven search task and answer incoming searches.
    #[serde(default)]
    pub searching: bool,
    /// Advertise link failures on disconnect and prune on received failures.
    #[serde(default)]
    pub advertise_link_failures: bool,
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which advertisement the propagator picks each tick.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PropagationConfig {
    /// Random walk over the store, stopping with `cutoff_rate` per hop.
    RandomRoute { cutoff_rate: f64 },
    /// Shortest route to a uniformly random known target.
    ShortestRoute,
    /// With probability `ratio` behave like `random`, else like `shortest`.
    Alternate {
        ratio: f64,
        random: RandomRouteParams,
        #[serde(default)]
        shortest: ShortestRouteParams,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomRouteParams {
    pub cutoff_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortestRouteParams {}

/// Route-store behavior knobs.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StoreConfig {
    /// Refuse to store segments that loop.
    #[serde(default)]
    pub eliminate_cycles: bool,
    /// Eager mode checks the recursion's current node; non-eager mode only
    /// checks the store owner.
    #[serde(default)]
    pub eliminate_cycles_eagerly: bool,
}
