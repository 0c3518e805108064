//! Best-effort BLIF netlist export.
//!
//! BLIF is consumed by downstream tech-mapping and place-and-route tools
//! this front end does not implement. This module emits a structural dump —
//! one `.subckt` line per cell, each bit of a multi-bit net spelled out as
//! its own BLIF signal — rather than synthesizing gate-level truth tables,
//! which would require logic optimization and tech-mapping this crate
//! doesn't do.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use aion_common::Interner;
use aion_ir::{ArenaId, CellId, CellOp, Netlist};

/// Writes a best-effort BLIF rendering of `netlist` to `path`.
pub fn write_blif(netlist: &Netlist, interner: &Interner, path: &Path) -> io::Result<()> {
    let text = render_blif(netlist, interner);
    fs::write(path, text)
}

fn render_blif(netlist: &Netlist, interner: &Interner) -> String {
    let mut out = String::new();
    let _ = writeln!(out, ".model {}", interner.resolve(netlist.top_name));

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (_, cell) in netlist.cells.iter() {
        match cell.op {
            CellOp::ModuleInput => inputs.extend(bit_names(netlist, cell_output_net(cell))),
            CellOp::ModuleOutput => outputs.extend(bit_names(netlist, cell_input_net(cell))),
            _ => {}
        }
    }
    if !inputs.is_empty() {
        let _ = writeln!(out, ".inputs {}", inputs.join(" "));
    }
    if !outputs.is_empty() {
        let _ = writeln!(out, ".outputs {}", outputs.join(" "));
    }

    for (id, cell) in netlist.cells.iter() {
        if matches!(cell.op, CellOp::ModuleInput | CellOp::ModuleOutput) {
            continue;
        }
        render_cell(&mut out, netlist, id, interner);
    }

    out.push_str(".end\n");
    out
}

fn cell_output_net(cell: &aion_ir::Cell) -> Option<aion_ir::NetId> {
    cell.pin("Y").and_then(|p| p.net)
}

fn cell_input_net(cell: &aion_ir::Cell) -> Option<aion_ir::NetId> {
    cell.pin("A").and_then(|p| p.net)
}

fn bit_names(netlist: &Netlist, net: Option<aion_ir::NetId>) -> Vec<String> {
    let Some(net) = net else { return Vec::new() };
    let net = netlist.nets.get(net);
    signal_names(&format!("n{}", net.id.as_raw()), net.width)
}

fn signal_names(base: &str, width: u32) -> Vec<String> {
    if width <= 1 {
        vec![base.to_string()]
    } else {
        (0..width).map(|bit| format!("{base}_{bit}")).collect()
    }
}

fn render_cell(out: &mut String, netlist: &Netlist, id: CellId, interner: &Interner) {
    let cell = netlist.cells.get(id);
    if cell.op == CellOp::Dff || cell.op == CellOp::Dffr || cell.op == CellOp::Dffe {
        render_latch(out, netlist, cell);
        return;
    }

    let mut conns = Vec::new();
    for (pin_name, pin) in &cell.pins {
        let names = bit_names(netlist, pin.net);
        for (bit, name) in names.into_iter().enumerate() {
            let formal = if pin.width <= 1 {
                pin_name.clone()
            } else {
                format!("{pin_name}[{bit}]")
            };
            conns.push(format!("{formal}={name}"));
        }
    }
    let _ = writeln!(
        out,
        ".subckt {} {} # {}",
        cell_op_name(cell.op),
        conns.join(" "),
        interner.resolve(cell.name)
    );
}

fn render_latch(out: &mut String, netlist: &Netlist, cell: &aion_ir::Cell) {
    let d = bit_names(netlist, cell.pin("D").and_then(|p| p.net));
    let q = bit_names(netlist, cell.pin("Q").and_then(|p| p.net));
    let clk = bit_names(netlist, cell.pin("CLK").and_then(|p| p.net))
        .into_iter()
        .next()
        .unwrap_or_else(|| "clk".to_string());
    for (d_bit, q_bit) in d.into_iter().zip(q) {
        let _ = writeln!(out, ".latch {d_bit} {q_bit} re {clk} 2");
    }
}

fn cell_op_name(op: CellOp) -> &'static str {
    match op {
        CellOp::ModuleInput => "INPUT",
        CellOp::ModuleOutput => "OUTPUT",
        CellOp::Const => "CONST",
        CellOp::Buf => "BUF",
        CellOp::Not => "NOT",
        CellOp::And => "AND",
        CellOp::Or => "OR",
        CellOp::Xor => "XOR",
        CellOp::Nand => "NAND",
        CellOp::Nor => "NOR",
        CellOp::Xnor => "XNOR",
        CellOp::Add => "ADD",
        CellOp::Sub => "SUB",
        CellOp::Mul => "MUL",
        CellOp::Div => "DIV",
        CellOp::Mod => "MOD",
        CellOp::Eq => "EQ",
        CellOp::Ne => "NE",
        CellOp::Lt => "LT",
        CellOp::Le => "LE",
        CellOp::Gt => "GT",
        CellOp::Ge => "GE",
        CellOp::Shl => "SHL",
        CellOp::Shr => "SHR",
        CellOp::Sar => "SAR",
        CellOp::Mux => "MUX",
        CellOp::Concat => "CONCAT",
        CellOp::Slice => "SLICE",
        CellOp::Dff => "DFF",
        CellOp::Dffr => "DFFR",
        CellOp::Dffe => "DFFE",
        CellOp::Latch => "LATCH",
        CellOp::Memrd => "MEMRD",
        CellOp::Memwr => "MEMWR",
        CellOp::Subcircuit => "SUBCIRCUIT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::Interner;
    use aion_ir::{Cell, PinDirection};
    use aion_source::Span;

    #[test]
    fn renders_minimal_model_header() {
        let interner = Interner::new();
        let top = interner.get_or_intern("top");
        let netlist = Netlist::new(top);
        let text = render_blif(&netlist, &interner);
        assert!(text.starts_with(".model top\n"));
        assert!(text.trim_end().ends_with(".end"));
    }

    #[test]
    fn buf_cell_becomes_subckt_line() {
        let interner = Interner::new();
        let top = interner.get_or_intern("top");
        let mut netlist = Netlist::new(top);
        let name = interner.get_or_intern("g1");
        let mut cell = Cell::new(CellId::from_raw(0), name, CellOp::Buf, Span::DUMMY);
        cell.add_pin("A", PinDirection::In, 1);
        cell.add_pin("Y", PinDirection::Out, 1);
        netlist.cells.alloc(cell);
        let text = render_blif(&netlist, &interner);
        assert!(text.contains(".subckt BUF"));
    }
}
