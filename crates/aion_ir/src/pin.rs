//! [`Pin`]: the connection point between a cell and a net.

use crate::ids::{CellId, NetId};
use serde::{Deserialize, Serialize};

/// The direction of a pin relative to its owning cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// An input pin (consumes a net's value).
    In,
    /// An output pin (drives a net).
    Out,
}

/// A named connection point on a cell.
///
/// A pin belongs to exactly one cell and is connected to at most one net
/// (spec §3.3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    /// The owning cell.
    pub cell: CellId,
    /// The pin name (`"A"`, `"B"`, `"Y"`, `"S"`, `"CLK"`, `"ADDR"`, ...).
    pub name: String,
    /// Whether this pin drives or consumes its net.
    pub direction: PinDirection,
    /// The number of bits carried by this pin.
    pub width: u32,
    /// The net this pin connects to, if any.
    pub net: Option<NetId>,
}

impl Pin {
    /// Returns `true` if this pin drives a net (is an output pin).
    pub fn is_driver(&self) -> bool {
        matches!(self.direction, PinDirection::Out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_driver() {
        let out = Pin {
            cell: CellId::from_raw(0),
            name: "Y".to_string(),
            direction: PinDirection::Out,
            width: 1,
            net: None,
        };
        let inp = Pin {
            cell: CellId::from_raw(0),
            name: "A".to_string(),
            direction: PinDirection::In,
            width: 1,
            net: None,
        };
        assert!(out.is_driver());
        assert!(!inp.is_driver());
    }
}
