//! `srs-core` — foundational types for the stack-route simulator.
//!
//! This crate is a dependency of every other `srs-*` crate.  It has no
//! `srs-*` dependencies and a single external one (`rand`).
//!
//! # What lives here
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`ids`]        | `NodeId`, `PortNumber`                               |
//! | [`route`]      | `Cost`, `Route`, `PricedRoute`, prefix helpers       |
//! | [`rng`]        | `SimRng` — seedable deterministic stream             |
//! | [`instrument`] | `Tracker`, counters, scoped timers, sessions         |

pub mod ids;
pub mod instrument;
pub mod rng;
pub mod route;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{NodeId, PortNumber};
pub use instrument::{Counter, MeasurementReader, MeasurementSession, Timer, Tracker};
pub use rng::SimRng;
pub use route::{Cost, PricedRoute, Route, is_prefix, is_real_prefix};
