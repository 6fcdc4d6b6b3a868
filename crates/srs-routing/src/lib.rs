//! `srs-routing` — everything a simulated node runs.
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`store`]     | Compressed route store + Dijkstra distance layer      |
//! | [`engine`]    | Datagram egress (unicast, random-walk/flood broadcast)|
//! | [`datagram`]  | `Datagram`, tagged `Payload`, `PayloadKind`           |
//! | [`router`]    | `StackRouter`: tasks, handler table, `Router` trait   |
//! | [`propagate`] | Advertisement-selection strategies                    |
//! | [`advertise`] | Advertising tasks and the ingest handler              |
//! | [`search`]    | Demand-driven route search                            |
//! | [`recover`]   | Link-failure advertisement and pruning                |
//! | [`builder`]   | `RouterFactory` — config → wired router               |
//! | [`config`]    | serde configuration structs                           |

pub mod builder;
pub mod config;
pub mod datagram;
pub mod engine;
pub mod error;
pub mod propagate;
pub mod router;
pub mod store;

mod advertise;
mod recover;
mod search;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::RouterFactory;
pub use config::{
    PropagationConfig, RandomRouteParams, RoutingConfig, ShortestRouteParams, StoreConfig,
};
pub use datagram::{Datagram, Payload, PayloadKind};
pub use engine::StackEngine;
pub use error::{RoutingError, RoutingResult, StoreError};
pub use propagate::{Choice, Propagator};
pub use router::{DisconnectTask, Router, ScheduledTask, StackRouter};
pub use store::RouteStore;
