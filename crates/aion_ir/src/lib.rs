//! AionIR — the netlist intermediate representation for the Aion Verilog front end.
//!
//! This crate defines the core IR types including [`Netlist`], [`Cell`], [`Net`],
//! and [`Pin`] that serve as the persisted output of elaboration (see `aion_elaborate`).

#![warn(missing_docs)]

mod arena;
mod cell;
mod ids;
mod net;
mod netlist;
mod pin;

pub use arena::{Arena, ArenaId};
pub use cell::{AttrValue, Cell, CellOp};
pub use ids::{CellId, NetId};
pub use net::Net;
pub use netlist::Netlist;
pub use pin::{Pin, PinDirection};
