//! Expression lowering: turns a parsed Verilog expression into a cell graph
//! driving a single net (spec §4.3.3).
//!
//! Every non-trivial expression becomes exactly one cell wired to a fresh
//! net; composite expressions (binary, ternary, concat, ...) recurse and
//! wire the sub-results into the new cell's input pins. Where an operand's
//! width doesn't match what the consuming pin expects, [`fit_to_width`]
//! inserts an explicit `SLICE` (truncate) or zero-padding `CONCAT` (widen)
//! rather than leaving the mismatch implicit.

use std::collections::HashMap;

use aion_common::{Ident, LogicVec};
use aion_ir::{Cell, CellId, CellOp, Net, NetId, PinDirection};
use aion_source::Span;
use aion_verilog_parser::ast::{self as v_ast, BinaryOp, UnaryOp};

use crate::const_eval::{self, ConstEnv, ConstValue};
use crate::context::ElaborationContext;
use crate::errors;

/// A net together with the signedness it should be treated with in further
/// arithmetic (spec §4.3.1: sign is carried alongside the value, not
/// encoded in the bit pattern).
#[derive(Debug, Clone, Copy)]
pub struct NetRef {
    /// The net carrying this value.
    pub net: NetId,
    /// Whether this value participates in signed arithmetic.
    pub signed: bool,
}

/// Maps declared identifiers (ports, nets, regs) to the net currently
/// holding their value. Updated as statements are lowered (spec §4.3.4:
/// each non-blocking assignment target gets a fresh "next value" net).
pub type NetEnv = HashMap<Ident, NetRef>;

/// A registered memory (spec §4.3.5): a `reg` with an unpacked dimension.
#[derive(Debug, Clone, Copy)]
pub struct MemoryInfo {
    /// The width of one memory word.
    pub width: u32,
    /// Address width, `clog2(depth)` rounded up to at least 1.
    pub addr_width: u32,
    /// The number of addressable words in this memory.
    pub depth: u64,
}

/// Maps memory names to their shape, populated during declaration
/// elaboration and consulted when an indexed reference turns out to be a
/// memory access rather than a bit-select.
pub type MemEnv = HashMap<Ident, MemoryInfo>;

pub(crate) fn width_of(ctx: &ElaborationContext<'_>, net: NetId) -> u32 {
    ctx.netlist.nets.get(net).width
}

pub(crate) fn new_net(ctx: &mut ElaborationContext<'_>, name: &str, width: u32) -> NetId {
    let ident = ctx.interner.get_or_intern(name);
    let id = ctx.netlist.nets.alloc(Net::new(NetId::from_raw(0), ident, width));
    ctx.netlist.nets.get_mut(id).id = id;
    id
}

pub(crate) fn alloc_cell(ctx: &mut ElaborationContext<'_>, name: &str, op: CellOp, span: Span) -> CellId {
    let ident = ctx.interner.get_or_intern(name);
    let id = ctx.netlist.cells.alloc(Cell::new(CellId::from_raw(0), ident, op, span));
    ctx.netlist.cells.get_mut(id).id = id;
    id
}

pub(crate) fn connect_input(ctx: &mut ElaborationContext<'_>, cell: CellId, pin: &str, net: NetId) {
    ctx.netlist.cells.get_mut(cell).pin_mut(pin).unwrap().net = Some(net);
    ctx.netlist.nets.get_mut(net).add_sink(cell, pin);
}

pub(crate) fn drive_output(ctx: &mut ElaborationContext<'_>, cell: CellId, pin: &str, net: NetId) {
    ctx.netlist.cells.get_mut(cell).pin_mut(pin).unwrap().net = Some(net);
    if ctx.netlist.nets.get_mut(net).set_driver(cell, pin).is_some() {
        let name = ctx.interner.resolve(ctx.netlist.nets.get(net).name).to_string();
        let span = ctx.netlist.cells.get(cell).span;
        ctx.sink.emit(errors::error_multi_driver(&name, span));
    }
}

/// Converts a folded [`ConstValue`] to the bit pattern stored on a `CONST`
/// cell's `value` attribute.
fn const_to_logic(val: &ConstValue) -> LogicVec {
    match val {
        ConstValue::Int { value, width, .. } => {
            let w = (*width).max(1);
            let masked = if w >= 64 { *value as u64 } else { (*value as u64) & ((1u64 << w) - 1) };
            LogicVec::from_u64(masked, w)
        }
        ConstValue::Bool(b) => LogicVec::from_bool(*b),
        ConstValue::Logic(lv) => lv.clone(),
        ConstValue::Real(f) => LogicVec::from_u64(*f as i64 as u64, 64),
        ConstValue::String(s) => {
            let bytes = s.as_bytes();
            let width = (bytes.len() as u32 * 8).max(1);
            let mut v: u64 = 0;
            for b in bytes {
                v = (v << 8) | (*b as u64);
            }
            LogicVec::from_u64(v, width)
        }
    }
}

/// Materializes a folded constant as a `CONST` cell driving a fresh net.
pub fn materialize_const(ctx: &mut ElaborationContext<'_>, val: &ConstValue, span: Span) -> NetRef {
    let width = val.width().max(1);
    let signed = matches!(val, ConstValue::Int { signed: true, .. });
    let name = ctx.fresh_name("const");
    let cell = alloc_cell(ctx, &name, CellOp::Const, span);
    ctx.netlist
        .cells
        .get_mut(cell)
        .attributes
        .insert("value".to_string(), aion_ir::AttrValue::Logic(const_to_logic(val)));
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, width);
    let out = new_net(ctx, &format!("{name}$y"), width);
    drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed }
}

/// Truncates (`SLICE`) or zero-extends (via a constant-padded `CONCAT`) a
/// value to exactly `target_width` bits.
pub fn fit_to_width(ctx: &mut ElaborationContext<'_>, val: NetRef, target_width: u32, span: Span) -> NetRef {
    let w = width_of(ctx, val.net);
    if w == target_width {
        return val;
    }
    if w > target_width {
        return emit_slice(ctx, val, 0, target_width, span);
    }
    let pad_width = target_width - w;
    let pad = materialize_const(ctx, &ConstValue::Int { value: 0, width: pad_width, signed: false }, span);
    let parts = [pad, val];
    let out = emit_concat(ctx, &parts, span);
    NetRef { net: out.net, signed: val.signed }
}

fn emit_slice(ctx: &mut ElaborationContext<'_>, a: NetRef, offset: u32, width: u32, span: Span) -> NetRef {
    let name = ctx.fresh_name("slice");
    let cell = alloc_cell(ctx, &name, CellOp::Slice, span);
    let in_width = width_of(ctx, a.net);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, in_width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, width);
    ctx.netlist
        .cells
        .get_mut(cell)
        .attributes
        .insert("offset".to_string(), aion_ir::AttrValue::Int(offset as i64));
    connect_input(ctx, cell, "A", a.net);
    let out = new_net(ctx, &format!("{name}$y"), width);
    drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_binary(
    ctx: &mut ElaborationContext<'_>,
    prefix: &str,
    op: CellOp,
    a: NetRef,
    b: NetRef,
    out_width: u32,
    signed: bool,
    span: Span,
) -> NetRef {
    let name = ctx.fresh_name(prefix);
    let cell = alloc_cell(ctx, &name, op, span);
    let aw = width_of(ctx, a.net);
    let bw = width_of(ctx, b.net);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, aw);
    ctx.netlist.cells.get_mut(cell).add_pin("B", PinDirection::In, bw);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, out_width);
    connect_input(ctx, cell, "A", a.net);
    connect_input(ctx, cell, "B", b.net);
    let out = new_net(ctx, &format!("{name}$y"), out_width);
    drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed }
}

fn emit_unary(
    ctx: &mut ElaborationContext<'_>,
    prefix: &str,
    op: CellOp,
    a: NetRef,
    out_width: u32,
    signed: bool,
    span: Span,
) -> NetRef {
    let name = ctx.fresh_name(prefix);
    let cell = alloc_cell(ctx, &name, op, span);
    let aw = width_of(ctx, a.net);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, aw);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, out_width);
    connect_input(ctx, cell, "A", a.net);
    let out = new_net(ctx, &format!("{name}$y"), out_width);
    drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed }
}

/// Reduces a value to a single truth bit: the net unchanged if already
/// 1 bit wide, otherwise an `OR` cell with a wide input pin and a 1-bit
/// output pin (spec §4.3.3: logical operators self-determine operands).
fn reduce_to_bool(ctx: &mut ElaborationContext<'_>, a: NetRef, span: Span) -> NetRef {
    if width_of(ctx, a.net) == 1 {
        return NetRef { net: a.net, signed: false };
    }
    emit_unary(ctx, "bool", CellOp::Or, a, 1, false, span)
}

/// Lowers a Verilog expression into a cell graph, returning the net that
/// carries its value (spec §4.3.3).
///
/// `mem_env` lets memory array reads (`mem[addr]`) be distinguished from
/// ordinary bit-selects of a vector signal sharing the same `Index` AST
/// shape.
pub fn lower_expr(
    expr: &v_ast::Expr,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) -> Option<NetRef> {
    match expr {
        v_ast::Expr::Literal { value, signed, .. } => {
            let val = ConstValue::Logic(value.clone());
            let nref = materialize_const(ctx, &val, expr.span());
            Some(NetRef { net: nref.net, signed: *signed })
        }
        v_ast::Expr::Identifier { name, span } => {
            if let Some(nref) = net_env.get(name) {
                return Some(*nref);
            }
            if let Some(cv) = const_env.get(name) {
                return Some(materialize_const(ctx, cv, *span));
            }
            ctx.sink.emit(errors::error_unknown_signal(ctx.interner.resolve(*name), *span));
            None
        }
        v_ast::Expr::HierarchicalName { span, .. } => {
            ctx.sink.emit(errors::error_unsupported("hierarchical reference in expression", *span));
            None
        }
        v_ast::Expr::Index { base, index, span } => {
            lower_index(base, index, *span, net_env, const_env, mem_env, ctx)
        }
        v_ast::Expr::RangeSelect { base, msb, lsb, span } => {
            let base_ref = lower_expr(base, net_env, const_env, mem_env, ctx)?;
            let range = v_ast::Range { msb: (**msb).clone(), lsb: (**lsb).clone(), span: *span };
            let (msb_v, lsb_v) = const_eval::eval_range(&range, ctx.interner, const_env, ctx.sink)?;
            let (hi, lo) = if msb_v >= lsb_v { (msb_v, lsb_v) } else { (lsb_v, msb_v) };
            let width = (hi - lo + 1) as u32;
            Some(emit_slice(ctx, base_ref, lo.max(0) as u32, width, *span))
        }
        v_ast::Expr::BitSelect { base, index, select_type, width, span } => {
            let base_ref = lower_expr(base, net_env, const_env, mem_env, ctx)?;
            if let Some(idx_val) = const_eval::eval_expr(index, ctx.interner, const_env, ctx.sink) {
                let idx = const_eval::const_to_i64(&idx_val)?;
                let offset = match select_type {
                    v_ast::BitSelectKind::Plus => idx,
                    v_ast::BitSelectKind::Minus => idx - (*width as i64) + 1,
                };
                Some(emit_slice(ctx, base_ref, offset.max(0) as u32, *width, *span))
            } else {
                let idx_ref = lower_expr(index, net_env, const_env, mem_env, ctx)?;
                let base_w = width_of(ctx, base_ref.net);
                let shifted = match select_type {
                    v_ast::BitSelectKind::Plus => {
                        emit_binary(ctx, "dyn_select_shr", CellOp::Shr, base_ref, idx_ref, base_w, false, *span)
                    }
                    v_ast::BitSelectKind::Minus => {
                        let w_const = materialize_const(
                            ctx,
                            &ConstValue::Int { value: (*width as i64) - 1, width: 32, signed: false },
                            *span,
                        );
                        let idx_w = width_of(ctx, idx_ref.net);
                        let lo = emit_binary(ctx, "dyn_select_lo", CellOp::Sub, idx_ref, w_const, idx_w, false, *span);
                        emit_binary(ctx, "dyn_select_shr", CellOp::Shr, base_ref, lo, base_w, false, *span)
                    }
                };
                Some(emit_slice(ctx, shifted, 0, *width, *span))
            }
        }
        v_ast::Expr::Concat { elements, span } => {
            let mut parts = Vec::with_capacity(elements.len());
            for el in elements {
                parts.push(lower_expr(el, net_env, const_env, mem_env, ctx)?);
            }
            Some(emit_concat(ctx, &parts, *span))
        }
        v_ast::Expr::Repeat { count, elements, span } => {
            let count_val = const_eval::eval_expr(count, ctx.interner, const_env, ctx.sink)?;
            let n = const_eval::const_to_i64(&count_val)?.max(0) as usize;
            let mut base_parts = Vec::with_capacity(elements.len());
            for el in elements {
                base_parts.push(lower_expr(el, net_env, const_env, mem_env, ctx)?);
            }
            let mut parts = Vec::with_capacity(base_parts.len() * n);
            for _ in 0..n {
                parts.extend(base_parts.iter().copied());
            }
            if parts.is_empty() {
                ctx.sink.emit(errors::error_unsupported("zero-width replication", *span));
                return None;
            }
            Some(emit_concat(ctx, &parts, *span))
        }
        v_ast::Expr::Unary { op, operand, span } => lower_unary(*op, operand, *span, net_env, const_env, mem_env, ctx),
        v_ast::Expr::Binary { left, op, right, span } => {
            lower_binary(*op, left, right, *span, net_env, const_env, mem_env, ctx)
        }
        v_ast::Expr::Ternary { condition, then_expr, else_expr, span } => {
            let cond = lower_expr(condition, net_env, const_env, mem_env, ctx)?;
            let cond_bool = reduce_to_bool(ctx, cond, *span);
            let then_ref = lower_expr(then_expr, net_env, const_env, mem_env, ctx)?;
            let else_ref = lower_expr(else_expr, net_env, const_env, mem_env, ctx)?;
            let width = width_of(ctx, then_ref.net).max(width_of(ctx, else_ref.net));
            let then_fit = fit_to_width(ctx, then_ref, width, *span);
            let else_fit = fit_to_width(ctx, else_ref, width, *span);
            Some(emit_mux(ctx, cond_bool, else_fit, then_fit, width, *span))
        }
        v_ast::Expr::FuncCall { name, args, span } => lower_func_call(name, args, *span, net_env, const_env, mem_env, ctx),
        v_ast::Expr::SystemCall { name, args, span } => {
            lower_system_call(*name, args, *span, net_env, const_env, mem_env, ctx)
        }
        v_ast::Expr::Paren { inner, .. } => lower_expr(inner, net_env, const_env, mem_env, ctx),
        v_ast::Expr::RealLiteral { span } | v_ast::Expr::StringLiteral { span } => {
            ctx.sink.emit(errors::error_unsupported("real/string value used as a net value", *span));
            None
        }
        v_ast::Expr::Error(_) => None,
    }
}

fn lower_index(
    base: &v_ast::Expr,
    index: &v_ast::Expr,
    span: Span,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) -> Option<NetRef> {
    if let v_ast::Expr::Identifier { name, .. } = base {
        if let Some(mem) = mem_env.get(name).copied() {
            let addr = lower_expr(index, net_env, const_env, mem_env, ctx)?;
            let addr_fit = fit_to_width(ctx, addr, mem.addr_width, span);
            let cell_name = ctx.fresh_name("memrd");
            let cell = alloc_cell(ctx, &cell_name, CellOp::Memrd, span);
            ctx.netlist
                .cells
                .get_mut(cell)
                .attributes
                .insert("memory".to_string(), aion_ir::AttrValue::Str(ctx.interner.resolve(*name).to_string()));
            ctx.netlist
                .cells
                .get_mut(cell)
                .attributes
                .insert("depth".to_string(), aion_ir::AttrValue::Int(mem.depth as i64));
            ctx.netlist.cells.get_mut(cell).add_pin("ADDR", PinDirection::In, mem.addr_width);
            ctx.netlist.cells.get_mut(cell).add_pin("DATA", PinDirection::Out, mem.width);
            connect_input(ctx, cell, "ADDR", addr_fit.net);
            let out = new_net(ctx, &format!("{cell_name}$data"), mem.width);
            drive_output(ctx, cell, "DATA", out);
            return Some(NetRef { net: out, signed: false });
        }
    }
    let base_ref = lower_expr(base, net_env, const_env, mem_env, ctx)?;
    if let Some(idx_val) = const_eval::eval_expr(index, ctx.interner, const_env, ctx.sink) {
        let idx = const_eval::const_to_i64(&idx_val)?;
        Some(emit_slice(ctx, base_ref, idx.max(0) as u32, 1, span))
    } else {
        let idx_ref = lower_expr(index, net_env, const_env, mem_env, ctx)?;
        let base_w = width_of(ctx, base_ref.net);
        let shifted = emit_binary(ctx, "dyn_index_shr", CellOp::Shr, base_ref, idx_ref, base_w, false, span);
        Some(emit_slice(ctx, shifted, 0, 1, span))
    }
}

fn emit_concat(ctx: &mut ElaborationContext<'_>, parts: &[NetRef], span: Span) -> NetRef {
    let name = ctx.fresh_name("concat");
    let cell = alloc_cell(ctx, &name, CellOp::Concat, span);
    let mut total = 0u32;
    for (i, part) in parts.iter().enumerate() {
        let w = width_of(ctx, part.net);
        ctx.netlist.cells.get_mut(cell).add_pin(format!("I{i}"), PinDirection::In, w);
        total += w;
    }
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, total);
    for (i, part) in parts.iter().enumerate() {
        connect_input(ctx, cell, &format!("I{i}"), part.net);
    }
    let out = new_net(ctx, &format!("{name}$y"), total);
    drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_mux(ctx: &mut ElaborationContext<'_>, sel: NetRef, a: NetRef, b: NetRef, width: u32, span: Span) -> NetRef {
    let name = ctx.fresh_name("mux");
    let cell = alloc_cell(ctx, &name, CellOp::Mux, span);
    ctx.netlist.cells.get_mut(cell).add_pin("S", PinDirection::In, 1);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("B", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, width);
    connect_input(ctx, cell, "S", sel.net);
    connect_input(ctx, cell, "A", a.net);
    connect_input(ctx, cell, "B", b.net);
    let out = new_net(ctx, &format!("{name}$y"), width);
    drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn lower_unary(
    op: UnaryOp,
    operand: &v_ast::Expr,
    span: Span,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) -> Option<NetRef> {
    let a = lower_expr(operand, net_env, const_env, mem_env, ctx)?;
    let w = width_of(ctx, a.net);
    match op {
        UnaryOp::Plus => Some(a),
        UnaryOp::Minus => {
            let zero = materialize_const(ctx, &ConstValue::Int { value: 0, width: w, signed: a.signed }, span);
            Some(emit_binary(ctx, "neg", CellOp::Sub, zero, a, w, a.signed, span))
        }
        UnaryOp::BitNot => Some(emit_unary(ctx, "bitnot", CellOp::Not, a, w, a.signed, span)),
        UnaryOp::LogNot => {
            let b = reduce_to_bool(ctx, a, span);
            Some(emit_unary(ctx, "lognot", CellOp::Eq, b, 1, false, span))
        }
        UnaryOp::RedAnd => Some(emit_unary(ctx, "redand", CellOp::And, a, 1, false, span)),
        UnaryOp::RedNand => Some(emit_unary(ctx, "rednand", CellOp::Nand, a, 1, false, span)),
        UnaryOp::RedOr => Some(emit_unary(ctx, "redor", CellOp::Or, a, 1, false, span)),
        UnaryOp::RedNor => Some(emit_unary(ctx, "rednor", CellOp::Nor, a, 1, false, span)),
        UnaryOp::RedXor => Some(emit_unary(ctx, "redxor", CellOp::Xor, a, 1, false, span)),
        UnaryOp::RedXnor => Some(emit_unary(ctx, "redxnor", CellOp::Xnor, a, 1, false, span)),
    }
}

fn lower_binary(
    op: BinaryOp,
    left: &v_ast::Expr,
    right: &v_ast::Expr,
    span: Span,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) -> Option<NetRef> {
    let lhs = lower_expr(left, net_env, const_env, mem_env, ctx)?;
    let rhs = lower_expr(right, net_env, const_env, mem_env, ctx)?;
    let lw = width_of(ctx, lhs.net);
    let rw = width_of(ctx, rhs.net);
    let signed = lhs.signed && rhs.signed;

    use BinaryOp::*;
    match op {
        Add => Some(emit_binary(ctx, "add", CellOp::Add, lhs, rhs, lw.max(rw) + 1, signed, span)),
        Sub => Some(emit_binary(ctx, "sub", CellOp::Sub, lhs, rhs, lw.max(rw) + 1, signed, span)),
        Mul => Some(emit_binary(ctx, "mul", CellOp::Mul, lhs, rhs, lw + rw, signed, span)),
        Div => Some(emit_binary(ctx, "div", CellOp::Div, lhs, rhs, lw.max(rw), signed, span)),
        Mod => Some(emit_binary(ctx, "mod", CellOp::Mod, lhs, rhs, lw.max(rw), signed, span)),
        Pow => {
            ctx.sink.emit(errors::error_unsupported("`**` (power) operator", span));
            None
        }
        Eq | CaseEq => Some(emit_binary(ctx, "eq", CellOp::Eq, lhs, rhs, 1, false, span)),
        Neq | CaseNeq => Some(emit_binary(ctx, "ne", CellOp::Ne, lhs, rhs, 1, false, span)),
        Lt => Some(emit_binary(ctx, "lt", CellOp::Lt, lhs, rhs, 1, false, span)),
        Le => Some(emit_binary(ctx, "le", CellOp::Le, lhs, rhs, 1, false, span)),
        Gt => Some(emit_binary(ctx, "gt", CellOp::Gt, lhs, rhs, 1, false, span)),
        Ge => Some(emit_binary(ctx, "ge", CellOp::Ge, lhs, rhs, 1, false, span)),
        LogAnd => {
            let a = reduce_to_bool(ctx, lhs, span);
            let b = reduce_to_bool(ctx, rhs, span);
            Some(emit_binary(ctx, "logand", CellOp::And, a, b, 1, false, span))
        }
        LogOr => {
            let a = reduce_to_bool(ctx, lhs, span);
            let b = reduce_to_bool(ctx, rhs, span);
            Some(emit_binary(ctx, "logor", CellOp::Or, a, b, 1, false, span))
        }
        BitAnd => Some(emit_binary(ctx, "and", CellOp::And, lhs, rhs, lw.max(rw), signed, span)),
        BitOr => Some(emit_binary(ctx, "or", CellOp::Or, lhs, rhs, lw.max(rw), signed, span)),
        BitXor => Some(emit_binary(ctx, "xor", CellOp::Xor, lhs, rhs, lw.max(rw), signed, span)),
        BitXnor => Some(emit_binary(ctx, "xnor", CellOp::Xnor, lhs, rhs, lw.max(rw), signed, span)),
        Shl | AShl => Some(emit_binary(ctx, "shl", CellOp::Shl, lhs, rhs, lw, lhs.signed, span)),
        Shr => Some(emit_binary(ctx, "shr", CellOp::Shr, lhs, rhs, lw, false, span)),
        AShr => Some(emit_binary(ctx, "sar", CellOp::Sar, lhs, rhs, lw, lhs.signed, span)),
    }
}

fn lower_system_call(
    name: Ident,
    args: &[v_ast::Expr],
    span: Span,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) -> Option<NetRef> {
    let func_name = ctx.interner.resolve(name).to_string();
    match func_name.as_str() {
        "$signed" | "$unsigned" => {
            if args.len() != 1 {
                ctx.sink
                    .emit(errors::error_param_not_const(&format!("{func_name} requires exactly one argument"), span));
                return None;
            }
            let inner = lower_expr(&args[0], net_env, const_env, mem_env, ctx)?;
            Some(NetRef { net: inner.net, signed: func_name == "$signed" })
        }
        _ => {
            let val = const_eval::eval_expr(
                &v_ast::Expr::SystemCall { name, args: args.to_vec(), span },
                ctx.interner,
                const_env,
                ctx.sink,
            )?;
            Some(materialize_const(ctx, &val, span))
        }
    }
}

/// Inlines a call to a single-statement function body (spec §4.3.3's
/// function support): the body must be exactly one blocking assignment to
/// the function's own name. Anything richer reports `E210`.
fn lower_func_call(
    name: &v_ast::Expr,
    args: &[v_ast::Expr],
    span: Span,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) -> Option<NetRef> {
    let v_ast::Expr::Identifier { name: func_ident, .. } = name else {
        ctx.sink.emit(errors::error_unsupported("indirect function call", span));
        return None;
    };
    let decl = ctx.registry.lookup_function(*func_ident)?.clone();

    if decl.body.len() != 1 {
        ctx.sink.emit(errors::error_unsupported("function body with more than one statement", span));
        return None;
    }
    let v_ast::Statement::Blocking { target, value, .. } = &decl.body[0] else {
        ctx.sink.emit(errors::error_unsupported("function body is not a single assignment", span));
        return None;
    };
    let v_ast::Expr::Identifier { name: ret_name, .. } = target else {
        ctx.sink.emit(errors::error_unsupported("function return target is not a plain identifier", span));
        return None;
    };
    if *ret_name != decl.name {
        ctx.sink.emit(errors::error_unsupported("function body does not assign its own name", span));
        return None;
    }
    let expected_args: usize = decl.inputs.iter().map(|p| p.names.len()).sum();
    if args.len() != expected_args {
        ctx.sink.emit(errors::error_param_not_const("function call argument count mismatch", span));
        return None;
    }

    let mut call_env = net_env.clone();
    let mut arg_idx = 0;
    for input in &decl.inputs {
        for &pname in &input.names {
            let arg_ref = lower_expr(&args[arg_idx], net_env, const_env, mem_env, ctx)?;
            call_env.insert(pname, arg_ref);
            arg_idx += 1;
        }
    }
    lower_expr(value, &call_env, const_env, mem_env, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::Interner;
    use aion_diagnostics::DiagnosticSink;
    use aion_ir::Netlist;
    use aion_source::{SourceDb, Span};

    use crate::registry::ModuleRegistry;

    fn setup<'a>(
        interner: &'a Interner,
        source_db: &'a SourceDb,
        sink: &'a DiagnosticSink,
        reg: &'a ModuleRegistry<'a>,
    ) -> ElaborationContext<'a> {
        let top = interner.get_or_intern("top");
        ElaborationContext::new(top, reg, interner, source_db, sink)
    }

    fn literal(n: u64, width: u32, signed: bool) -> v_ast::Expr {
        v_ast::Expr::Literal { value: LogicVec::from_u64(n, width), signed, span: Span::DUMMY }
    }

    #[test]
    fn lower_literal_creates_const_cell() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = literal(5, 8, false);
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 8);
        assert_eq!(ctx.netlist.cells.len(), 1);
    }

    #[test]
    fn lower_binary_add_widens_by_one() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = v_ast::Expr::Binary {
            left: Box::new(literal(1, 8, false)),
            op: BinaryOp::Add,
            right: Box::new(literal(2, 8, false)),
            span: Span::DUMMY,
        };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 9);
    }

    #[test]
    fn lower_comparison_is_one_bit() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = v_ast::Expr::Binary {
            left: Box::new(literal(1, 8, false)),
            op: BinaryOp::Lt,
            right: Box::new(literal(2, 8, false)),
            span: Span::DUMMY,
        };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 1);
    }

    #[test]
    fn lower_identifier_from_net_env() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let a = interner.get_or_intern("a");
        let net = new_net(&mut ctx, "a", 4);
        let mut net_env = NetEnv::new();
        net_env.insert(a, NetRef { net, signed: false });
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = v_ast::Expr::Identifier { name: a, span: Span::DUMMY };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(nref.net, net);
    }

    #[test]
    fn lower_unknown_identifier_emits_diagnostic() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let unknown = interner.get_or_intern("missing");
        let expr = v_ast::Expr::Identifier { name: unknown, span: Span::DUMMY };
        assert!(lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).is_none());
        assert!(sink.has_errors());
    }

    #[test]
    fn lower_concat_sums_widths() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = v_ast::Expr::Concat {
            elements: vec![literal(1, 4, false), literal(2, 4, false)],
            span: Span::DUMMY,
        };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 8);
    }

    #[test]
    fn lower_constant_bit_select() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let a = interner.get_or_intern("a");
        let net = new_net(&mut ctx, "a", 8);
        let mut net_env = NetEnv::new();
        net_env.insert(a, NetRef { net, signed: false });
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = v_ast::Expr::RangeSelect {
            base: Box::new(v_ast::Expr::Identifier { name: a, span: Span::DUMMY }),
            msb: Box::new(literal(3, 32, false)),
            lsb: Box::new(literal(0, 32, false)),
            span: Span::DUMMY,
        };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 4);
    }

    #[test]
    fn fit_to_width_truncates() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let wide = new_net(&mut ctx, "wide", 8);
        let fitted = fit_to_width(&mut ctx, NetRef { net: wide, signed: false }, 4, Span::DUMMY);
        assert_eq!(width_of(&ctx, fitted.net), 4);
    }

    #[test]
    fn fit_to_width_extends() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let narrow = new_net(&mut ctx, "narrow", 4);
        let fitted = fit_to_width(&mut ctx, NetRef { net: narrow, signed: false }, 8, Span::DUMMY);
        assert_eq!(width_of(&ctx, fitted.net), 8);
    }

    #[test]
    fn lower_ternary_picks_wider_branch() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let expr = v_ast::Expr::Ternary {
            condition: Box::new(literal(1, 1, false)),
            then_expr: Box::new(literal(1, 4, false)),
            else_expr: Box::new(literal(0, 8, false)),
            span: Span::DUMMY,
        };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 8);
    }

    #[test]
    fn memory_read_emits_memrd_cell() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let mem_name = interner.get_or_intern("mem");
        let net_env = NetEnv::new();
        let const_env = ConstEnv::new();
        let mut mem_env = MemEnv::new();
        mem_env.insert(mem_name, MemoryInfo { width: 8, addr_width: 4, depth: 16 });
        let expr = v_ast::Expr::Index {
            base: Box::new(v_ast::Expr::Identifier { name: mem_name, span: Span::DUMMY }),
            index: Box::new(literal(2, 4, false)),
            span: Span::DUMMY,
        };
        let nref = lower_expr(&expr, &net_env, &const_env, &mem_env, &mut ctx).unwrap();
        assert_eq!(width_of(&ctx, nref.net), 8);
        assert!(matches!(ctx.netlist.cells.iter().next().unwrap().1.op, CellOp::Memrd));
    }

    #[test]
    fn unused_import_silencer() {
        let _ = Netlist::new;
    }
}
