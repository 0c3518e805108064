//! [`Net`]: a single named signal wire in the netlist.

use crate::ids::{CellId, NetId};
use aion_common::Ident;
use serde::{Deserialize, Serialize};

/// A net carries a value between one driving pin and zero or more sink
/// pins (spec §3.3 invariant: "a net has at most one driver; arbitrarily
/// many sinks").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// The unique ID of this net within its netlist.
    pub id: NetId,
    /// The net's name (informational; not guaranteed unique).
    pub name: Ident,
    /// The number of bits this net carries.
    pub width: u32,
    /// The `(cell, pin name)` pair driving this net, if any. A net with no
    /// driver is undriven (spec §7 warning `W2xx`: "undriven net").
    pub driver: Option<(CellId, String)>,
    /// The `(cell, pin name)` pairs consuming this net.
    pub sinks: Vec<(CellId, String)>,
}

impl Net {
    /// Creates a new, undriven net with no sinks.
    pub fn new(id: NetId, name: Ident, width: u32) -> Self {
        Self {
            id,
            name,
            width,
            driver: None,
            sinks: Vec::new(),
        }
    }

    /// Returns `true` if this net has no driving pin.
    pub fn is_undriven(&self) -> bool {
        self.driver.is_none()
    }

    /// Returns `true` if this net has no driving pin and no sinks.
    pub fn is_unused(&self) -> bool {
        self.driver.is_none() && self.sinks.is_empty()
    }

    /// Records `(cell, pin)` as the driver of this net.
    ///
    /// Returns the previous driver, if the net was already driven — callers
    /// use this to detect and diagnose multi-driver conflicts (spec §4.3.6).
    pub fn set_driver(&mut self, cell: CellId, pin: impl Into<String>) -> Option<(CellId, String)> {
        self.driver.replace((cell, pin.into()))
    }

    /// Adds `(cell, pin)` as a sink of this net.
    pub fn add_sink(&mut self, cell: CellId, pin: impl Into<String>) {
        self.sinks.push((cell, pin.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::Interner;

    #[test]
    fn new_net_is_undriven_and_unused() {
        let interner = Interner::new();
        let net = Net::new(NetId::from_raw(0), interner.get_or_intern("n1"), 8);
        assert!(net.is_undriven());
        assert!(net.is_unused());
    }

    #[test]
    fn set_driver_returns_previous() {
        let interner = Interner::new();
        let mut net = Net::new(NetId::from_raw(0), interner.get_or_intern("n1"), 1);
        let prev = net.set_driver(CellId::from_raw(1), "Y");
        assert!(prev.is_none());
        let prev = net.set_driver(CellId::from_raw(2), "Y");
        assert_eq!(prev, Some((CellId::from_raw(1), "Y".to_string())));
    }

    #[test]
    fn add_sink_accumulates() {
        let interner = Interner::new();
        let mut net = Net::new(NetId::from_raw(0), interner.get_or_intern("n1"), 1);
        net.add_sink(CellId::from_raw(1), "A");
        net.add_sink(CellId::from_raw(2), "B");
        assert_eq!(net.sinks.len(), 2);
        assert!(!net.is_unused());
    }

    #[test]
    fn driven_but_unused_is_not_unused() {
        let interner = Interner::new();
        let mut net = Net::new(NetId::from_raw(0), interner.get_or_intern("n1"), 1);
        net.set_driver(CellId::from_raw(1), "Y");
        assert!(!net.is_undriven());
        assert!(!net.is_unused());
    }
}
