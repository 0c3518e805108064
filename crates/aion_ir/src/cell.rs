//! Primitive cell operations and the [`Cell`] node type.
//!
//! A [`Cell`] is one node in the netlist hypergraph (spec §3.3): a primitive
//! logic operation with a fixed, closed set of named pins wired to nets.

use crate::ids::CellId;
use crate::pin::{Pin, PinDirection};
use aion_common::{ContentHash, Ident, LogicVec};
use aion_source::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of primitive cell operations (spec §3.3).
///
/// No other cell kinds exist; unexpanded or unresolvable module
/// instantiations become [`CellOp::Subcircuit`] black boxes rather than a
/// new variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellOp {
    /// A module input boundary — drives its `Y` pin from the parent context.
    ModuleInput,
    /// A module output boundary — consumes its `A` pin.
    ModuleOutput,
    /// A compile-time constant, recorded in the `value` attribute.
    Const,
    /// Pass-through buffer.
    Buf,
    /// Bitwise NOT.
    Not,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Bitwise NAND.
    Nand,
    /// Bitwise NOR.
    Nor,
    /// Bitwise XNOR.
    Xnor,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Less-than comparison.
    Lt,
    /// Less-or-equal comparison.
    Le,
    /// Greater-than comparison.
    Gt,
    /// Greater-or-equal comparison.
    Ge,
    /// Logical left shift.
    Shl,
    /// Logical right shift.
    Shr,
    /// Arithmetic (sign-extending) right shift.
    Sar,
    /// 2-to-1 multiplexer (`S`, `A` = false input, `B` = true input).
    Mux,
    /// Concatenation of ordered input pins into one wider output.
    Concat,
    /// Bit/part-select of an input pin into a narrower output.
    Slice,
    /// Edge-triggered flip-flop with no reset or enable.
    Dff,
    /// Edge-triggered flip-flop with an asynchronous reset.
    Dffr,
    /// Edge-triggered flip-flop with a synchronous clock-enable.
    Dffe,
    /// Level-sensitive latch.
    Latch,
    /// Memory read port.
    Memrd,
    /// Memory write port.
    Memwr,
    /// An unexpanded black box standing in for an unresolved module.
    Subcircuit,
}

/// An attribute value attached to a cell.
///
/// Used for `CONST` values, memory metadata (`memory`, `depth`), slice
/// ranges, and black-box port names — anything a cell needs to carry that
/// isn't itself a pin connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// An integer attribute (slice bounds, memory depth, ...).
    Int(i64),
    /// A string attribute (memory name, black-box port list, ...).
    Str(String),
    /// A resolved constant value, used by `CONST` cells.
    Logic(LogicVec),
    /// A boolean attribute.
    Bool(bool),
}

/// A single node in the netlist hypergraph (spec §3.3).
///
/// Cell IDs are the canonical handle; names are unique by convention but
/// not enforced (spec §3.3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// The unique ID of this cell within its netlist.
    pub id: CellId,
    /// The cell's name (informational; may collide under hierarchy
    /// flattening if two instances share a name by mistake upstream).
    pub name: Ident,
    /// The primitive operation this cell performs.
    pub op: CellOp,
    /// Named pins, keyed by pin name for stable iteration order.
    pub pins: BTreeMap<String, Pin>,
    /// Free-form attributes (constant values, slice ranges, memory
    /// metadata, black-box port names).
    pub attributes: BTreeMap<String, AttrValue>,
    /// The source span this cell was elaborated from.
    pub span: Span,
}

impl Cell {
    /// Creates a new cell with no pins or attributes.
    pub fn new(id: CellId, name: Ident, op: CellOp, span: Span) -> Self {
        Self {
            id,
            name,
            op,
            pins: BTreeMap::new(),
            attributes: BTreeMap::new(),
            span,
        }
    }

    /// Adds a pin to this cell, returning the pin name for convenience.
    pub fn add_pin(
        &mut self,
        name: impl Into<String>,
        direction: PinDirection,
        width: u32,
    ) -> String {
        let name = name.into();
        self.pins.insert(
            name.clone(),
            Pin {
                cell: self.id,
                name: name.clone(),
                direction,
                width,
                net: None,
            },
        );
        name
    }

    /// Returns the pin with the given name, if present.
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.pins.get(name)
    }

    /// Returns a mutable reference to the pin with the given name, if present.
    pub fn pin_mut(&mut self, name: &str) -> Option<&mut Pin> {
        self.pins.get_mut(name)
    }

    /// Computes a content hash over this cell's operation and pin shape,
    /// used to make netlist dumps byte-identical across deterministic runs.
    pub fn content_hash(&self) -> ContentHash {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(format!("{:?}", self.op).as_bytes());
        for (name, pin) in &self.pins {
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(&pin.width.to_le_bytes());
        }
        ContentHash::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NetId;
    use aion_common::Interner;

    fn ident(interner: &Interner, s: &str) -> Ident {
        interner.get_or_intern(s)
    }

    #[test]
    fn cell_construction() {
        let interner = Interner::new();
        let cell = Cell::new(CellId::from_raw(0), ident(&interner, "g1"), CellOp::And, Span::DUMMY);
        assert_eq!(cell.op, CellOp::And);
        assert!(cell.pins.is_empty());
    }

    #[test]
    fn add_and_get_pin() {
        let interner = Interner::new();
        let mut cell = Cell::new(CellId::from_raw(0), ident(&interner, "g1"), CellOp::And, Span::DUMMY);
        cell.add_pin("A", PinDirection::In, 8);
        cell.add_pin("Y", PinDirection::Out, 8);
        assert_eq!(cell.pin("A").unwrap().direction, PinDirection::In);
        assert_eq!(cell.pin("Y").unwrap().direction, PinDirection::Out);
        assert!(cell.pin("B").is_none());
    }

    #[test]
    fn pin_net_assignment() {
        let interner = Interner::new();
        let mut cell = Cell::new(CellId::from_raw(0), ident(&interner, "g1"), CellOp::Buf, Span::DUMMY);
        cell.add_pin("Y", PinDirection::Out, 1);
        cell.pin_mut("Y").unwrap().net = Some(NetId::from_raw(3));
        assert_eq!(cell.pin("Y").unwrap().net, Some(NetId::from_raw(3)));
    }

    #[test]
    fn attributes_roundtrip() {
        let interner = Interner::new();
        let mut cell = Cell::new(CellId::from_raw(0), ident(&interner, "c1"), CellOp::Const, Span::DUMMY);
        cell.attributes.insert(
            "value".to_string(),
            AttrValue::Logic(LogicVec::from_hex_str("FF").unwrap()),
        );
        assert!(matches!(
            cell.attributes.get("value"),
            Some(AttrValue::Logic(_))
        ));
    }

    #[test]
    fn all_cell_ops_distinct() {
        let ops = [
            CellOp::ModuleInput,
            CellOp::ModuleOutput,
            CellOp::Const,
            CellOp::Buf,
            CellOp::Not,
            CellOp::And,
            CellOp::Or,
            CellOp::Xor,
            CellOp::Nand,
            CellOp::Nor,
            CellOp::Xnor,
            CellOp::Add,
            CellOp::Sub,
            CellOp::Mul,
            CellOp::Div,
            CellOp::Mod,
            CellOp::Eq,
            CellOp::Ne,
            CellOp::Lt,
            CellOp::Le,
            CellOp::Gt,
            CellOp::Ge,
            CellOp::Shl,
            CellOp::Shr,
            CellOp::Sar,
            CellOp::Mux,
            CellOp::Concat,
            CellOp::Slice,
            CellOp::Dff,
            CellOp::Dffr,
            CellOp::Dffe,
            CellOp::Latch,
            CellOp::Memrd,
            CellOp::Memwr,
            CellOp::Subcircuit,
        ];
        for (i, a) in ops.iter().enumerate() {
            for (j, b) in ops.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
        }
    }

    #[test]
    fn cell_op_serde_roundtrip() {
        let json = serde_json::to_string(&CellOp::Dffr).unwrap();
        assert_eq!(json, "\"DFFR\"");
        let back: CellOp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CellOp::Dffr);
    }

    #[test]
    fn content_hash_deterministic() {
        let interner = Interner::new();
        let mut a = Cell::new(CellId::from_raw(0), ident(&interner, "g1"), CellOp::And, Span::DUMMY);
        a.add_pin("A", PinDirection::In, 8);
        let mut b = Cell::new(CellId::from_raw(1), ident(&interner, "g2"), CellOp::And, Span::DUMMY);
        b.add_pin("A", PinDirection::In, 8);
        assert_eq!(a.content_hash(), b.content_hash());
    }
}
