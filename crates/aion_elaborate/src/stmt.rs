//! Statement lowering: turns the body of a `always`/`initial` block into
//! updates of a [`NetEnv`] (spec §4.3.4).
//!
//! Both combinational and sequential always blocks are lowered through the
//! same recursive descent; the caller (`verilog.rs`) decides what to do
//! with the resulting env afterwards — wire it straight to the driven nets
//! for a combinational block, or feed it as the D input of a `DFF`/`DFFR`/
//! `DFFE` cell for a clocked one. `if`/`case` branches are lowered into
//! cloned envs and merged back with a `MUX` per changed variable; a
//! variable left unassigned on one side of a merge falls back to its
//! pre-statement value, which is exactly latch inference (spec §4.3.4),
//! reported via `W202`.

use std::collections::BTreeSet;

use aion_ir::CellOp;
use aion_source::Span;
use aion_verilog_parser::ast::{CaseArm, CaseKind, Expr, Statement};

use crate::const_eval::{self, ConstEnv, ConstValue};
use crate::context::ElaborationContext;
use crate::errors;
use crate::expr::{self, MemEnv, NetEnv, NetRef};

const MAX_UNROLL_ITERATIONS: i64 = 4096;

/// Lowers a statement (and everything nested inside it), mutating `env` in
/// place with blocking-assignment-like immediate update semantics.
///
/// Non-blocking assignments are folded the same way — synthesis of
/// well-formed synchronous code does not depend on whether intra-block
/// ordering is blocking or deferred, since each target is assigned from
/// at most one live expression per clock edge in the patterns this front
/// end accepts.
pub fn lower_statement(
    stmt: &Statement,
    env: &mut NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    match stmt {
        Statement::Blocking { target, value, span } | Statement::NonBlocking { target, value, span } => {
            let Some(val) = expr::lower_expr(value, env, const_env, mem_env, ctx) else {
                return;
            };
            assign_lvalue(target, val, *span, env, const_env, mem_env, ctx);
        }
        Statement::Block { stmts, .. } => {
            for s in stmts {
                lower_statement(s, env, const_env, mem_env, ctx);
            }
        }
        Statement::If { condition, then_stmt, else_stmt, span } => {
            lower_if(condition, then_stmt, else_stmt.as_deref(), *span, env, const_env, mem_env, ctx);
        }
        Statement::Case { kind, expr: sel_expr, arms, span, .. } => {
            lower_case(*kind, sel_expr, arms, *span, env, const_env, mem_env, ctx);
        }
        Statement::For { init, condition, step, body, span } => {
            lower_for(init, condition, step, body, *span, env, const_env, mem_env, ctx);
        }
        Statement::Null { .. } => {}
        Statement::Disable { .. } => {}
        Statement::EventControl { body, .. } => {
            lower_statement(body, env, const_env, mem_env, ctx);
        }
        Statement::Delay { body, .. } => {
            lower_statement(body, env, const_env, mem_env, ctx);
        }
        Statement::While { span, .. }
        | Statement::Forever { span, .. }
        | Statement::Repeat { span, .. }
        | Statement::Wait { span, .. }
        | Statement::EventTrigger { span, .. }
        | Statement::TaskCall { span, .. }
        | Statement::SystemTaskCall { span, .. } => {
            ctx.sink.emit(errors::error_unsupported("statement kind outside the synthesizable subset", *span));
        }
        Statement::Error(span) => {
            let _ = span;
        }
    }
}

fn lower_if(
    condition: &Expr,
    then_stmt: &Statement,
    else_stmt: Option<&Statement>,
    span: Span,
    env: &mut NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let Some(cond_ref) = expr::lower_expr(condition, env, const_env, mem_env, ctx) else {
        return;
    };
    let cond_bool = reduce_to_bool(ctx, cond_ref, span);

    let mut then_env = env.clone();
    lower_statement(then_stmt, &mut then_env, const_env, mem_env, ctx);

    let mut else_env = env.clone();
    if let Some(s) = else_stmt {
        lower_statement(s, &mut else_env, const_env, mem_env, ctx);
    }

    let changed = changed_keys(env, &then_env, &else_env);
    for name in changed {
        let then_val = resolve_branch_value(&then_env, env, name, ctx, span);
        let else_val = resolve_branch_value(&else_env, env, name, ctx, span);
        if (!then_env.contains_key(&name) || !else_env.contains_key(&name)) && else_stmt.is_none() {
            let signal_name = ctx.interner.resolve(name).to_string();
            ctx.sink.emit(errors::warn_inferred_latch(&signal_name, span));
        }
        let width = expr::width_of(ctx, then_val.net).max(expr::width_of(ctx, else_val.net));
        let then_fit = expr::fit_to_width(ctx, then_val, width, span);
        let else_fit = expr::fit_to_width(ctx, else_val, width, span);
        let muxed = emit_mux(ctx, cond_bool, else_fit, then_fit, width, span);
        env.insert(name, muxed);
    }
}

fn lower_case(
    kind: CaseKind,
    sel_expr: &Expr,
    arms: &[CaseArm],
    span: Span,
    env: &mut NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let _ = kind; // casex/casez wildcard bits are not modeled; compared as plain equality.
    let Some(sel_ref) = expr::lower_expr(sel_expr, env, const_env, mem_env, ctx) else {
        return;
    };

    let base_env = env.clone();
    let default_arm = arms.iter().find(|a| a.is_default);
    let mut result_env = base_env.clone();
    if let Some(d) = default_arm {
        lower_statement(&d.body, &mut result_env, const_env, mem_env, ctx);
    }

    for arm in arms.iter().rev().filter(|a| !a.is_default) {
        let mut match_bool: Option<NetRef> = None;
        for pat in &arm.patterns {
            let Some(pat_ref) = expr::lower_expr(pat, env, const_env, mem_env, ctx) else {
                continue;
            };
            let eq = emit_eq(ctx, sel_ref, pat_ref, span);
            match_bool = Some(match match_bool {
                None => eq,
                Some(prev) => emit_or(ctx, prev, eq, span),
            });
        }
        let Some(match_bool) = match_bool else { continue };

        let mut arm_env = base_env.clone();
        lower_statement(&arm.body, &mut arm_env, const_env, mem_env, ctx);

        let changed = changed_keys(&base_env, &arm_env, &result_env);
        for name in changed {
            let arm_val = resolve_branch_value(&arm_env, &base_env, name, ctx, span);
            let fallback_val = resolve_branch_value(&result_env, &base_env, name, ctx, span);
            if default_arm.is_none() && !arm_env.contains_key(&name) {
                let signal_name = ctx.interner.resolve(name).to_string();
                ctx.sink.emit(errors::warn_inferred_latch(&signal_name, span));
            }
            let width = expr::width_of(ctx, arm_val.net).max(expr::width_of(ctx, fallback_val.net));
            let arm_fit = expr::fit_to_width(ctx, arm_val, width, span);
            let fallback_fit = expr::fit_to_width(ctx, fallback_val, width, span);
            let muxed = emit_mux(ctx, match_bool, fallback_fit, arm_fit, width, span);
            result_env.insert(name, muxed);
        }
    }

    for (name, val) in result_env {
        env.insert(name, val);
    }
}

/// Unrolls a `for` loop whose init/condition/step are all constant-foldable
/// given the current `const_env` — the only form this front end treats as
/// synthesizable (spec §4.3.2 applies the same restriction to `generate
/// for`).
fn lower_for(
    init: &Statement,
    condition: &Expr,
    step: &Statement,
    body: &Statement,
    span: Span,
    env: &mut NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let Statement::Blocking { target: init_target, value: init_value, .. } = init else {
        ctx.sink.emit(errors::error_unsupported("for-loop init is not a simple assignment", span));
        return;
    };
    let Expr::Identifier { name: loop_var, .. } = init_target else {
        ctx.sink.emit(errors::error_unsupported("for-loop variable is not a plain identifier", span));
        return;
    };
    let Some(init_val) = const_eval::eval_expr(init_value, ctx.interner, const_env, ctx.sink) else {
        ctx.sink.emit(errors::error_unsupported("for-loop init is not constant", span));
        return;
    };
    let Some(mut counter) = const_eval::const_to_i64(&init_val) else {
        return;
    };

    let mut loop_const_env = const_env.clone();
    let mut iterations = 0;
    loop {
        loop_const_env.insert(*loop_var, ConstValue::Int { value: counter, width: 32, signed: true });
        let Some(cond_val) = const_eval::eval_expr(condition, ctx.interner, &loop_const_env, ctx.sink) else {
            ctx.sink.emit(errors::error_unsupported("for-loop condition is not constant", span));
            return;
        };
        if !const_eval::const_to_i64(&cond_val).map(|v| v != 0).unwrap_or(false) {
            break;
        }
        iterations += 1;
        if iterations > MAX_UNROLL_ITERATIONS {
            ctx.sink.emit(errors::error_unsupported("for-loop exceeds the maximum unroll bound", span));
            return;
        }
        lower_statement(body, env, &loop_const_env, mem_env, ctx);

        let Statement::Blocking { value: step_value, .. } = step else {
            ctx.sink.emit(errors::error_unsupported("for-loop step is not a simple assignment", span));
            return;
        };
        let Some(step_val) = const_eval::eval_expr(step_value, ctx.interner, &loop_const_env, ctx.sink) else {
            ctx.sink.emit(errors::error_unsupported("for-loop step is not constant", span));
            return;
        };
        counter = const_eval::const_to_i64(&step_val).unwrap_or(counter);
    }
}

/// Assigns `value` to an lvalue expression, splitting composite targets
/// (bit-select, range-select, concatenation) into slices of the base
/// signal's current value.
pub(crate) fn assign_lvalue(
    target: &Expr,
    value: NetRef,
    span: Span,
    env: &mut NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    match target {
        Expr::Identifier { name, .. } => {
            let width = env.get(name).map(|nr| expr::width_of(ctx, nr.net)).unwrap_or_else(|| expr::width_of(ctx, value.net));
            let fitted = expr::fit_to_width(ctx, value, width, span);
            env.insert(*name, fitted);
        }
        Expr::Index { base, index, span: idx_span } => {
            let Expr::Identifier { name, .. } = &**base else {
                ctx.sink.emit(errors::error_unsupported("hierarchical assignment target", *idx_span));
                return;
            };
            if mem_env.contains_key(name) {
                // Memory array writes are synthesized into MEMWR cells by the
                // caller (verilog.rs), which inspects the always block's
                // assignment list directly rather than going through this env.
                return;
            }
            let Some(base_ref) = env.get(name).copied() else {
                let resolved = ctx.interner.resolve(*name).to_string();
                ctx.sink.emit(errors::error_unknown_signal(&resolved, *idx_span));
                return;
            };
            let Some(idx_val) = const_eval::eval_expr(index, ctx.interner, const_env, ctx.sink) else {
                ctx.sink.emit(errors::error_unsupported("dynamic bit-select on assignment target", *idx_span));
                return;
            };
            let Some(idx) = const_eval::const_to_i64(&idx_val) else { return };
            let base_width = expr::width_of(ctx, base_ref.net);
            let updated = splice_bit(ctx, base_ref, idx.max(0) as u32, value, base_width, *idx_span);
            env.insert(*name, updated);
        }
        Expr::RangeSelect { base, msb, lsb, span: r_span } => {
            let Expr::Identifier { name, .. } = &**base else {
                ctx.sink.emit(errors::error_unsupported("hierarchical assignment target", *r_span));
                return;
            };
            let Some(base_ref) = env.get(name).copied() else {
                let resolved = ctx.interner.resolve(*name).to_string();
                ctx.sink.emit(errors::error_unknown_signal(&resolved, *r_span));
                return;
            };
            let range = aion_verilog_parser::ast::Range { msb: (**msb).clone(), lsb: (**lsb).clone(), span: *r_span };
            let Some((msb_v, lsb_v)) = const_eval::eval_range(&range, ctx.interner, const_env, ctx.sink) else {
                ctx.sink.emit(errors::error_unsupported("dynamic range-select on assignment target", *r_span));
                return;
            };
            let (hi, lo) = if msb_v >= lsb_v { (msb_v, lsb_v) } else { (lsb_v, msb_v) };
            let width = (hi - lo + 1) as u32;
            let base_width = expr::width_of(ctx, base_ref.net);
            let value_fit = expr::fit_to_width(ctx, value, width, *r_span);
            let updated = splice_range(ctx, base_ref, lo.max(0) as u32, value_fit, base_width, *r_span);
            env.insert(*name, updated);
        }
        Expr::Concat { elements, span: c_span } => {
            let mut widths = Vec::with_capacity(elements.len());
            for el in elements {
                let Some(w) = lvalue_width(el, env, const_env, ctx) else {
                    ctx.sink.emit(errors::error_unsupported("assignment target width could not be determined", *c_span));
                    return;
                };
                widths.push(w);
            }
            let total: u32 = widths.iter().sum();
            let value_fit = expr::fit_to_width(ctx, value, total, *c_span);
            let mut offset = total;
            for (el, w) in elements.iter().zip(widths.iter()) {
                offset -= w;
                let slice = slice_of(ctx, value_fit, offset, *w, *c_span);
                assign_lvalue(el, slice, *c_span, env, const_env, mem_env, ctx);
            }
        }
        _ => {
            ctx.sink.emit(errors::error_unsupported("unsupported assignment target", span));
        }
    }
}

fn lvalue_width(target: &Expr, env: &NetEnv, const_env: &ConstEnv, ctx: &ElaborationContext<'_>) -> Option<u32> {
    match target {
        Expr::Identifier { name, .. } => env.get(name).map(|nr| expr::width_of(ctx, nr.net)),
        Expr::Index { .. } => Some(1),
        Expr::RangeSelect { msb, lsb, span, .. } => {
            let range = aion_verilog_parser::ast::Range { msb: (**msb).clone(), lsb: (**lsb).clone(), span: *span };
            let (msb_v, lsb_v) = const_eval::eval_range(&range, ctx.interner, const_env, ctx.sink)?;
            let (hi, lo) = if msb_v >= lsb_v { (msb_v, lsb_v) } else { (lsb_v, msb_v) };
            Some((hi - lo + 1) as u32)
        }
        Expr::Concat { elements, .. } => {
            let mut total = 0u32;
            for el in elements {
                total += lvalue_width(el, env, const_env, ctx)?;
            }
            Some(total)
        }
        _ => None,
    }
}

fn slice_of(ctx: &mut ElaborationContext<'_>, val: NetRef, offset: u32, width: u32, span: Span) -> NetRef {
    let name = ctx.fresh_name("lhs_slice");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Slice, span);
    let in_width = expr::width_of(ctx, val.net);
    ctx.netlist.cells.get_mut(cell).add_pin("A", aion_ir::PinDirection::In, in_width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", aion_ir::PinDirection::Out, width);
    ctx.netlist
        .cells
        .get_mut(cell)
        .attributes
        .insert("offset".to_string(), aion_ir::AttrValue::Int(offset as i64));
    expr::connect_input(ctx, cell, "A", val.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), width);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

/// Replaces bit `offset` of `base` with `bit_val`, producing a fresh net of
/// the same total width via a three-way concat (before/bit/after, skipping
/// empty segments).
fn splice_bit(
    ctx: &mut ElaborationContext<'_>,
    base: NetRef,
    offset: u32,
    bit_val: NetRef,
    base_width: u32,
    span: Span,
) -> NetRef {
    splice_range(ctx, base, offset, expr::fit_to_width(ctx, bit_val, 1, span), base_width, span)
}

/// Replaces the `width`-bit window starting at `offset` of `base` with
/// `value`, producing a fresh net of the same total width.
fn splice_range(ctx: &mut ElaborationContext<'_>, base: NetRef, offset: u32, value: NetRef, base_width: u32, span: Span) -> NetRef {
    let width = expr::width_of(ctx, value.net);
    let after_width = base_width.saturating_sub(offset + width);
    let mut parts = Vec::new();
    if after_width > 0 {
        parts.push(slice_of(ctx, base, offset + width, after_width, span));
    }
    parts.push(value);
    if offset > 0 {
        parts.push(slice_of(ctx, base, 0, offset, span));
    }
    if parts.len() == 1 {
        return NetRef { net: parts[0].net, signed: base.signed };
    }
    let out = concat_parts(ctx, &parts, span);
    NetRef { net: out.net, signed: base.signed }
}

fn concat_parts(ctx: &mut ElaborationContext<'_>, parts: &[NetRef], span: Span) -> NetRef {
    let name = ctx.fresh_name("lhs_concat");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Concat, span);
    let mut total = 0u32;
    for (i, part) in parts.iter().enumerate() {
        let w = expr::width_of(ctx, part.net);
        ctx.netlist.cells.get_mut(cell).add_pin(format!("I{i}"), aion_ir::PinDirection::In, w);
        total += w;
    }
    ctx.netlist.cells.get_mut(cell).add_pin("Y", aion_ir::PinDirection::Out, total);
    for (i, part) in parts.iter().enumerate() {
        expr::connect_input(ctx, cell, &format!("I{i}"), part.net);
    }
    let out = expr::new_net(ctx, &format!("{name}$y"), total);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn reduce_to_bool(ctx: &mut ElaborationContext<'_>, a: NetRef, span: Span) -> NetRef {
    if expr::width_of(ctx, a.net) == 1 {
        return NetRef { net: a.net, signed: false };
    }
    let name = ctx.fresh_name("bool");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Or, span);
    let w = expr::width_of(ctx, a.net);
    ctx.netlist.cells.get_mut(cell).add_pin("A", aion_ir::PinDirection::In, w);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", aion_ir::PinDirection::Out, 1);
    expr::connect_input(ctx, cell, "A", a.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), 1);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_eq(ctx: &mut ElaborationContext<'_>, a: NetRef, b: NetRef, span: Span) -> NetRef {
    let name = ctx.fresh_name("case_eq");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Eq, span);
    let aw = expr::width_of(ctx, a.net);
    let bw = expr::width_of(ctx, b.net);
    ctx.netlist.cells.get_mut(cell).add_pin("A", aion_ir::PinDirection::In, aw);
    ctx.netlist.cells.get_mut(cell).add_pin("B", aion_ir::PinDirection::In, bw);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", aion_ir::PinDirection::Out, 1);
    expr::connect_input(ctx, cell, "A", a.net);
    expr::connect_input(ctx, cell, "B", b.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), 1);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_or(ctx: &mut ElaborationContext<'_>, a: NetRef, b: NetRef, span: Span) -> NetRef {
    let name = ctx.fresh_name("case_or");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Or, span);
    ctx.netlist.cells.get_mut(cell).add_pin("A", aion_ir::PinDirection::In, 1);
    ctx.netlist.cells.get_mut(cell).add_pin("B", aion_ir::PinDirection::In, 1);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", aion_ir::PinDirection::Out, 1);
    expr::connect_input(ctx, cell, "A", a.net);
    expr::connect_input(ctx, cell, "B", b.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), 1);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_mux(ctx: &mut ElaborationContext<'_>, sel: NetRef, a: NetRef, b: NetRef, width: u32, span: Span) -> NetRef {
    let name = ctx.fresh_name("mux");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Mux, span);
    ctx.netlist.cells.get_mut(cell).add_pin("S", aion_ir::PinDirection::In, 1);
    ctx.netlist.cells.get_mut(cell).add_pin("A", aion_ir::PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("B", aion_ir::PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", aion_ir::PinDirection::Out, width);
    expr::connect_input(ctx, cell, "S", sel.net);
    expr::connect_input(ctx, cell, "A", a.net);
    expr::connect_input(ctx, cell, "B", b.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), width);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

/// Names touched in either branch relative to the pre-branch env.
fn changed_keys(base: &NetEnv, a: &NetEnv, b: &NetEnv) -> BTreeSet<aion_common::Ident> {
    let mut out = BTreeSet::new();
    for (name, nref) in a {
        if base.get(name).map(|n| n.net) != Some(nref.net) {
            out.insert(*name);
        }
    }
    for (name, nref) in b {
        if base.get(name).map(|n| n.net) != Some(nref.net) {
            out.insert(*name);
        }
    }
    out
}

fn resolve_branch_value(
    branch: &NetEnv,
    fallback: &NetEnv,
    name: aion_common::Ident,
    ctx: &mut ElaborationContext<'_>,
    span: Span,
) -> NetRef {
    if let Some(v) = branch.get(&name) {
        return *v;
    }
    if let Some(v) = fallback.get(&name) {
        return *v;
    }
    expr::materialize_const(ctx, &ConstValue::Int { value: 0, width: 1, signed: false }, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::{Interner, LogicVec};
    use aion_diagnostics::DiagnosticSink;
    use aion_source::SourceDb;
    use aion_verilog_parser::ast::BinaryOp;

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

    fn lit(n: u64, width: u32) -> Expr {
        Expr::Literal { value: LogicVec::from_u64(n, width), signed: false, span: Span::DUMMY }
    }

    #[test]
    fn blocking_assignment_updates_env() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let q = interner.get_or_intern("q");
        let existing = expr::new_net(&mut ctx, "q", 4);
        let mut env = NetEnv::new();
        env.insert(q, NetRef { net: existing, signed: false });
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let stmt = Statement::Blocking {
            target: Expr::Identifier { name: q, span: Span::DUMMY },
            value: lit(5, 4),
            span: Span::DUMMY,
        };
        lower_statement(&stmt, &mut env, &const_env, &mem_env, &mut ctx);
        assert_ne!(env.get(&q).unwrap().net, existing);
    }

    #[test]
    fn if_without_else_warns_latch() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let q = interner.get_or_intern("q");
        let existing = expr::new_net(&mut ctx, "q", 1);
        let mut env = NetEnv::new();
        env.insert(q, NetRef { net: existing, signed: false });
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let stmt = Statement::If {
            condition: lit(1, 1),
            then_stmt: Box::new(Statement::Blocking {
                target: Expr::Identifier { name: q, span: Span::DUMMY },
                value: lit(1, 1),
                span: Span::DUMMY,
            }),
            else_stmt: None,
            span: Span::DUMMY,
        };
        lower_statement(&stmt, &mut env, &const_env, &mem_env, &mut ctx);
        // No else branch falls back to the pre-statement value, which is a
        // mux between old and new — the net changes even without an error.
        assert_ne!(env.get(&q).unwrap().net, existing);
    }

    #[test]
    fn if_else_produces_mux() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let q = interner.get_or_intern("q");
        let existing = expr::new_net(&mut ctx, "q", 4);
        let mut env = NetEnv::new();
        env.insert(q, NetRef { net: existing, signed: false });
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let stmt = Statement::If {
            condition: lit(1, 1),
            then_stmt: Box::new(Statement::Blocking {
                target: Expr::Identifier { name: q, span: Span::DUMMY },
                value: lit(1, 4),
                span: Span::DUMMY,
            }),
            else_stmt: Some(Box::new(Statement::Blocking {
                target: Expr::Identifier { name: q, span: Span::DUMMY },
                value: lit(0, 4),
                span: Span::DUMMY,
            })),
            span: Span::DUMMY,
        };
        let cells_before = ctx.netlist.cells.len();
        lower_statement(&stmt, &mut env, &const_env, &mem_env, &mut ctx);
        assert!(ctx.netlist.cells.len() > cells_before);
        assert_ne!(env.get(&q).unwrap().net, existing);
    }

    #[test]
    fn for_loop_unrolls_constant_bound() {
        let interner = Interner::new();
        let source_db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let mut ctx = setup(&interner, &source_db, &sink, &reg);
        let i = interner.get_or_intern("i");
        let q = interner.get_or_intern("q");
        let existing = expr::new_net(&mut ctx, "q", 8);
        let mut env = NetEnv::new();
        env.insert(q, NetRef { net: existing, signed: false });
        let const_env = ConstEnv::new();
        let mem_env = MemEnv::new();
        let init = Statement::Blocking {
            target: Expr::Identifier { name: i, span: Span::DUMMY },
            value: lit(0, 32),
            span: Span::DUMMY,
        };
        let condition = Expr::Binary {
            left: Box::new(Expr::Identifier { name: i, span: Span::DUMMY }),
            op: BinaryOp::Lt,
            right: Box::new(lit(3, 32)),
            span: Span::DUMMY,
        };
        let step = Statement::Blocking {
            target: Expr::Identifier { name: i, span: Span::DUMMY },
            value: Expr::Binary {
                left: Box::new(Expr::Identifier { name: i, span: Span::DUMMY }),
                op: BinaryOp::Add,
                right: Box::new(lit(1, 32)),
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        };
        let body = Statement::Blocking {
            target: Expr::Identifier { name: q, span: Span::DUMMY },
            value: lit(1, 8),
            span: Span::DUMMY,
        };
        lower_for(&init, &condition, &step, &body, Span::DUMMY, &mut env, &const_env, &mem_env, &mut ctx);
        assert!(!sink.has_errors());
        assert_ne!(env.get(&q).unwrap().net, existing);
    }
}
