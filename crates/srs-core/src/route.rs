//! Route and cost primitives.
//!
//! A [`Route`] is an ordered sequence of port numbers, interpreted from a
//! source node by following each port in turn; the empty route means "stay at
//! the source".  Costs are non-negative reals with `f64::INFINITY` as the
//! unreachable sentinel.

use crate::PortNumber;

/// Link or path cost.  Non-negative; `f64::INFINITY` means unreachable.
pub type Cost = f64;

/// A concrete port sequence, executed hop by hop from some source node.
pub type Route = Vec<PortNumber>;

/// A route together with the cost of executing it.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedRoute {
    pub path: Route,
    pub cost: Cost,
}

impl PricedRoute {
    pub fn new(path: Route, cost: Cost) -> Self {
        Self { path, cost }
    }
}

/// `short` is an initial segment of `long` (possibly all of it).
#[inline]
pub fn is_prefix(short: &[PortNumber], long: &[PortNumber]) -> bool {
    long.len() >= short.len() && short == &long[..short.len()]
}

/// `short` is a *proper* initial segment of `long`.
#[inline]
pub fn is_real_prefix(short: &[PortNumber], long: &[PortNumber]) -> bool {
    short.len() < long.len() && is_prefix(short, long)
}
