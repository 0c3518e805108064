//! Verilog-2005 module elaboration (spec §4.3).
//!
//! This is the flattening entry point: starting from the top module, it
//! walks every module item, wiring ports, nets, continuous assigns, and
//! `always` blocks directly into [`ElaborationContext::netlist`], and
//! recurses into [`elaborate_instantiation`] for each instance, inlining
//! the child module's cells under an `instance_name.`-prefixed namespace
//! rather than keeping a separate module hierarchy in the IR (spec §3.3:
//! the IR is a single flattened netlist).
//!
//! Expression and statement lowering live in [`crate::expr`] and
//! [`crate::stmt`]; this module is concerned with everything above a
//! single expression — module boundaries, declarations, `always` block
//! classification into combinational/sequential logic, generate blocks,
//! and primitive gates.

use std::collections::{HashMap, HashSet};

use aion_common::{Ident, Interner};
use aion_diagnostics::DiagnosticSink;
use aion_ir::{AttrValue, CellId, CellOp, NetId, Netlist, PinDirection};
use aion_source::{SourceDb, Span};
use aion_verilog_parser::ast::{
    CaseArm, DeclName, Direction, Expr, GateInst, GenerateBlock, Instantiation, ModuleDecl,
    ModuleItem, NetType, ParameterDecl, PortDecl, PortStyle, Range, SensitivityList, Statement,
    UnaryOp,
};

use crate::const_eval::{self, ConstEnv, ConstValue};
use crate::context::ElaborationContext;
use crate::errors;
use crate::expr::{self, MemEnv, MemoryInfo, NetEnv, NetRef};
use crate::registry::ModuleRegistry;
use crate::stmt;
use crate::types;

const MAX_GENERATE_ITERATIONS: i64 = 4096;

/// Elaborates a parsed, registered Verilog design into a flattened netlist
/// rooted at `top` (or the registry's default top module — the last one
/// declared — when `top` is `None`).
///
/// Elaboration failures are reported on `sink` and elaboration continues
/// best-effort; only a missing/unresolvable top module aborts elaboration
/// entirely.
pub fn elaborate_design<'a>(
    top: Option<Ident>,
    registry: &'a ModuleRegistry<'a>,
    interner: &'a Interner,
    source_db: &'a SourceDb,
    sink: &'a DiagnosticSink,
) -> Option<Netlist> {
    let Some(top_name) = top.or_else(|| registry.default_top()) else {
        sink.emit(errors::error_top_not_found("<no modules declared>", Span::DUMMY));
        return None;
    };
    let Some(module) = registry.lookup(top_name) else {
        sink.emit(errors::error_top_not_found(interner.resolve(top_name), Span::DUMMY));
        return None;
    };

    let mut ctx = ElaborationContext::new(top_name, registry, interner, source_db, sink);
    if !ctx.push_elab_stack(top_name, module.span) {
        return Some(ctx.netlist);
    }

    let mut net_env = NetEnv::new();
    let mut const_env = ConstEnv::new();
    let mut mem_env = MemEnv::new();

    for param in &module.params {
        bind_parameter(param, &mut const_env, &mut ctx);
    }
    declare_top_ports(module, &const_env, &mut net_env, &mut ctx);
    elaborate_items(module, "", &mut net_env, &mut const_env, &mut mem_env, &mut ctx);

    ctx.pop_elab_stack();
    report_combinational_cycles(&mut ctx);
    ctx.netlist.remove_dead_cells();
    ctx.netlist.reset_ids();
    Some(ctx.netlist)
}

fn report_combinational_cycles(ctx: &mut ElaborationContext<'_>) {
    for cycle in ctx.netlist.find_combinational_cycles() {
        let names: Vec<String> = cycle
            .iter()
            .map(|&id| ctx.interner.resolve(ctx.netlist.cells.get(id).name).to_string())
            .collect();
        let span = cycle.first().map(|&id| ctx.netlist.cells.get(id).span).unwrap_or(Span::DUMMY);
        ctx.sink.emit(errors::error_combinational_cycle(&names, span));
    }
}

fn expr_span(e: &Expr) -> Span {
    e.span()
}

/// Collects a module's ports in declaration order together with their full
/// declarations, regardless of whether the module uses ANSI-style port
/// declarations (carried directly on `ports`) or the older style where the
/// port list only names signals and a body `input`/`output`/`inout`
/// declaration supplies the type.
fn collect_ports(module: &ModuleDecl) -> (Vec<Ident>, HashMap<Ident, PortDecl>) {
    let mut decls = HashMap::new();
    let mut order = Vec::new();
    if module.port_style == PortStyle::NonAnsi {
        order = module.port_names.clone();
        for item in &module.items {
            if let ModuleItem::PortDecl(pd) = item {
                for &n in &pd.names {
                    decls.insert(n, pd.clone());
                }
            }
        }
    } else {
        for pd in &module.ports {
            for &n in &pd.names {
                order.push(n);
                decls.insert(n, pd.clone());
            }
        }
    }
    (order, decls)
}

/// Declares the top module's ports as `ModuleInput`/`ModuleOutput` boundary
/// cells (spec §4.3.2). Instantiated submodules never get these cells —
/// their ports are wired directly to the parent's connections in
/// [`elaborate_instantiation`].
fn declare_top_ports(
    module: &ModuleDecl,
    const_env: &ConstEnv,
    net_env: &mut NetEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let (order, decls) = collect_ports(module);
    for name in order {
        let Some(decl) = decls.get(&name) else { continue };
        let resolved = types::resolve_net_type(
            decl.net_type.as_ref(),
            decl.range.as_ref(),
            decl.signed,
            const_env,
            ctx.interner,
            ctx.sink,
        );
        let name_str = ctx.interner.resolve(name).to_string();
        let net = expr::new_net(ctx, &name_str, resolved.width);
        match decl.direction {
            Direction::Input => {
                let cell = expr::alloc_cell(ctx, &format!("{name_str}$input"), CellOp::ModuleInput, decl.span);
                ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, resolved.width);
                expr::drive_output(ctx, cell, "Y", net);
                net_env.insert(name, NetRef { net, signed: resolved.signed });
            }
            Direction::Output => {
                net_env.insert(name, NetRef { net, signed: resolved.signed });
                let cell = expr::alloc_cell(ctx, &format!("{name_str}$output"), CellOp::ModuleOutput, decl.span);
                ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, resolved.width);
                expr::connect_input(ctx, cell, "A", net);
            }
            Direction::Inout => {
                // Bidirectional top-level ports are treated as a plain net;
                // tristate buffer synthesis is outside the synthesizable
                // subset this front end targets.
                net_env.insert(name, NetRef { net, signed: resolved.signed });
            }
        }
    }
}

/// Elaborates every item in a module body in declaration order. Used both
/// for the top module and, recursively, for every instantiated submodule
/// (whose ports have already been bound into `net_env` by the caller).
fn elaborate_items(
    module: &ModuleDecl,
    prefix: &str,
    net_env: &mut NetEnv,
    const_env: &mut ConstEnv,
    mem_env: &mut MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let mut defparams: HashMap<Ident, HashMap<Ident, ConstValue>> = HashMap::new();
    for item in &module.items {
        if let ModuleItem::DefparamDecl(dp) = item {
            match &dp.target {
                Expr::HierarchicalName { parts, .. } if parts.len() == 2 => {
                    if let Some(val) = const_eval::eval_expr(&dp.value, ctx.interner, const_env, ctx.sink) {
                        defparams.entry(parts[0]).or_default().insert(parts[1], val);
                    }
                }
                other => {
                    ctx.sink.emit(errors::error_unsupported("multi-level hierarchical defparam", expr_span(other)));
                }
            }
            continue;
        }
        elaborate_item(item, prefix, net_env, const_env, mem_env, &defparams, ctx);
    }
}

fn elaborate_item(
    item: &ModuleItem,
    prefix: &str,
    net_env: &mut NetEnv,
    const_env: &mut ConstEnv,
    mem_env: &mut MemEnv,
    defparams: &HashMap<Ident, HashMap<Ident, ConstValue>>,
    ctx: &mut ElaborationContext<'_>,
) {
    match item {
        ModuleItem::NetDecl(nd) => declare_net_or_mem(
            &nd.names,
            Some(&nd.net_type),
            nd.signed,
            nd.range.as_ref(),
            net_env,
            mem_env,
            const_env,
            ctx,
        ),
        ModuleItem::RegDecl(rd) => declare_net_or_mem(
            &rd.names,
            None,
            rd.signed,
            rd.range.as_ref(),
            net_env,
            mem_env,
            const_env,
            ctx,
        ),
        ModuleItem::IntegerDecl(id) => declare_scalar_names(&id.names, 32, true, net_env, ctx),
        ModuleItem::RealDecl(rd) => declare_scalar_names(&rd.names, 64, true, net_env, ctx),
        ModuleItem::ParameterDecl(pd) | ModuleItem::LocalparamDecl(pd) => bind_parameter(pd, const_env, ctx),
        ModuleItem::PortDecl(_) => {
            // Already handled by `collect_ports`/`declare_top_ports` (or the
            // instantiation port pass) before item elaboration begins.
        }
        ModuleItem::ContinuousAssign(ca) => {
            if let Some(val) = expr::lower_expr(&ca.value, net_env, const_env, mem_env, ctx) {
                drive_lvalue(ctx, net_env, &ca.target, val, const_env, mem_env, ca.span);
            }
        }
        ModuleItem::AlwaysBlock(ab) => {
            elaborate_always(&ab.body, ab.span, net_env, const_env, mem_env, ctx)
        }
        ModuleItem::InitialBlock(_) => {
            // `initial` blocks describe simulation-time behavior, not
            // synthesizable logic (spec Non-goals).
        }
        ModuleItem::Instantiation(inst) => {
            elaborate_instantiation(inst, prefix, net_env, const_env, mem_env, defparams, ctx)
        }
        ModuleItem::GateInst(g) => elaborate_gate(g, net_env, const_env, mem_env, ctx),
        ModuleItem::GenerateBlock(gb) => elaborate_generate(gb, prefix, net_env, const_env, mem_env, ctx),
        ModuleItem::GenvarDecl(_) => {
            // Genvars only have meaning inside a generate-for's own
            // induction; nothing to declare at module-item scope.
        }
        ModuleItem::FunctionDecl(_) | ModuleItem::TaskDecl(_) => {
            // Registration-only: `registry.rs` already gathers function
            // declarations for call-site lookup; tasks are not
            // synthesized by this front end.
        }
        ModuleItem::DefparamDecl(_) => {
            // Collected up front by `elaborate_items`.
        }
        ModuleItem::Error(_) => {}
    }
}

fn declare_net_or_mem(
    names: &[DeclName],
    net_type: Option<&NetType>,
    signed: bool,
    range: Option<&Range>,
    net_env: &mut NetEnv,
    mem_env: &mut MemEnv,
    const_env: &ConstEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let resolved = types::resolve_net_type(net_type, range, signed, const_env, ctx.interner, ctx.sink);
    for decl_name in names {
        if let Some(dim) = decl_name.dimensions.first() {
            let Some((msb, lsb)) = const_eval::eval_range(dim, ctx.interner, const_env, ctx.sink) else {
                continue;
            };
            let depth = (msb - lsb).unsigned_abs() + 1;
            mem_env.insert(
                decl_name.name,
                MemoryInfo { width: resolved.width, addr_width: addr_width_for(depth), depth },
            );
            continue;
        }
        let name_str = ctx.interner.resolve(decl_name.name).to_string();
        let net = expr::new_net(ctx, &name_str, resolved.width);
        net_env.insert(decl_name.name, NetRef { net, signed: resolved.signed });
        // `reg`/`wire` initializers are simulation-time convenience, not
        // wired into the netlist (spec Non-goals).
    }
}

fn addr_width_for(depth: u64) -> u32 {
    let mut w = 0u32;
    let mut d: u64 = 1;
    while d < depth {
        d *= 2;
        w += 1;
    }
    w.max(1)
}

fn declare_scalar_names(names: &[DeclName], width: u32, signed: bool, net_env: &mut NetEnv, ctx: &mut ElaborationContext<'_>) {
    for decl_name in names {
        let name_str = ctx.interner.resolve(decl_name.name).to_string();
        let net = expr::new_net(ctx, &name_str, width);
        net_env.insert(decl_name.name, NetRef { net, signed });
    }
}

fn bind_parameter(pd: &ParameterDecl, const_env: &mut ConstEnv, ctx: &mut ElaborationContext<'_>) {
    if const_env.contains_key(&pd.name) {
        // Already bound by an instantiation's `#()` override or a
        // `defparam`; declaration-site defaults never clobber those.
        return;
    }
    let resolved = types::resolve_range(pd.range.as_ref(), pd.signed, const_env, ctx.interner, ctx.sink);
    let value = pd
        .value
        .as_ref()
        .and_then(|e| const_eval::eval_expr(e, ctx.interner, const_env, ctx.sink))
        .unwrap_or(ConstValue::Int { value: 0, width: resolved.width, signed: resolved.signed });
    const_env.insert(pd.name, value);
}

/// Lowers `target = value` into a scratch copy of `net_env`, then commits
/// whatever persistent nets actually changed. Used for continuous
/// assignments and primitive gate outputs — both combinational drivers
/// where [`stmt::assign_lvalue`]'s splicing logic (shared with procedural
/// assignment) is exactly what is needed.
fn drive_lvalue(
    ctx: &mut ElaborationContext<'_>,
    net_env: &NetEnv,
    target: &Expr,
    value: NetRef,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    span: Span,
) {
    let mut local = net_env.clone();
    stmt::assign_lvalue(target, value, span, &mut local, const_env, mem_env, ctx);
    commit_combinational(ctx, net_env, &local, span);
}

/// Drives every persistent net whose working-env value changed via an
/// explicit `Buf` cell. The IR has no net aliasing — only a cell can drive
/// a net — and `Buf` is the pass-through primitive for this case.
fn commit_combinational(ctx: &mut ElaborationContext<'_>, net_env: &NetEnv, local_env: &NetEnv, span: Span) {
    for (name, new_ref) in local_env {
        if let Some(persistent) = net_env.get(name) {
            if persistent.net != new_ref.net {
                drive_buf(ctx, persistent.net, *new_ref, span);
            }
        }
    }
}

fn drive_buf(ctx: &mut ElaborationContext<'_>, target_net: NetId, value: NetRef, span: Span) {
    let width = expr::width_of(ctx, target_net);
    let value_fit = expr::fit_to_width(ctx, value, width, span);
    let name = ctx.fresh_name("buf");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Buf, span);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, width);
    expr::connect_input(ctx, cell, "A", value_fit.net);
    expr::drive_output(ctx, cell, "Y", target_net);
}

// --- `always` block classification and sequential synthesis -------------

/// True if `expr` is a bare identifier or its unary negation (`rst` or
/// `!rst`/`~rst`) — the reset-signal shape a top-level `if` in a clocked
/// `always` block is classified against (spec §8 scenario 3: a
/// synchronous or asynchronous reset is always gated by a single signal
/// reference, never a compound expression).
fn is_bare_reset_condition(expr: &Expr) -> bool {
    match expr {
        Expr::Identifier { .. } => true,
        Expr::Unary { op: UnaryOp::LogNot | UnaryOp::BitNot, operand, .. } => {
            matches!(operand.as_ref(), Expr::Identifier { .. })
        }
        _ => false,
    }
}

fn peel_single(stmt: &Statement) -> &Statement {
    if let Statement::Block { stmts, decls, .. } = stmt {
        if decls.is_empty() && stmts.len() == 1 {
            return &stmts[0];
        }
    }
    stmt
}

fn elaborate_always(
    body: &Statement,
    span: Span,
    net_env: &mut NetEnv,
    const_env: &ConstEnv,
    mem_env: &mut MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let (inner, sensitivity) = match body {
        Statement::EventControl { sensitivity, body, .. } => (body.as_ref(), Some(sensitivity)),
        other => (other, None),
    };
    let edges: Vec<_> = match sensitivity {
        Some(SensitivityList::List(items)) => items.iter().filter(|i| i.edge.is_some()).collect(),
        _ => Vec::new(),
    };

    if edges.is_empty() {
        let mut local = net_env.clone();
        stmt::lower_statement(inner, &mut local, const_env, mem_env, ctx);
        commit_combinational(ctx, net_env, &local, span);
        return;
    }

    let Some(clock_ref) = expr::lower_expr(&edges[0].signal, net_env, const_env, mem_env, ctx) else { return };
    let peeled = peel_single(inner);

    if let Statement::If { condition, then_stmt, else_stmt: Some(else_b), .. } = peeled {
        if is_bare_reset_condition(condition) {
            let Some(reset_cond) = expr::lower_expr(condition, net_env, const_env, mem_env, ctx) else { return };
            let reset_sig = reduce_bool(ctx, reset_cond, span);
            let mut reset_env = net_env.clone();
            stmt::lower_statement(then_stmt, &mut reset_env, const_env, mem_env, ctx);
            let mut rest_env = net_env.clone();
            stmt::lower_statement(else_b, &mut rest_env, const_env, mem_env, ctx);
            commit_sequential_reset(ctx, net_env, &reset_env, &rest_env, clock_ref, reset_sig, span);
            synthesize_memory_writes(then_stmt, None, net_env, const_env, mem_env, clock_ref, ctx);
            synthesize_memory_writes(else_b, None, net_env, const_env, mem_env, clock_ref, ctx);
            return;
        }
    }

    if let Statement::If { condition, then_stmt, else_stmt: None, .. } = peeled {
        let Some(cond_ref) = expr::lower_expr(condition, net_env, const_env, mem_env, ctx) else { return };
        let en_ref = reduce_bool(ctx, cond_ref, span);
        let mut then_env = net_env.clone();
        stmt::lower_statement(then_stmt, &mut then_env, const_env, mem_env, ctx);
        commit_sequential_enable(ctx, net_env, &then_env, clock_ref, en_ref, span);
        synthesize_memory_writes(then_stmt, Some(en_ref), net_env, const_env, mem_env, clock_ref, ctx);
        return;
    }

    let mut local = net_env.clone();
    stmt::lower_statement(inner, &mut local, const_env, mem_env, ctx);
    commit_sequential_plain(ctx, net_env, &local, clock_ref, span);
    synthesize_memory_writes(inner, None, net_env, const_env, mem_env, clock_ref, ctx);
}

fn commit_sequential_plain(ctx: &mut ElaborationContext<'_>, net_env: &NetEnv, local_env: &NetEnv, clock: NetRef, span: Span) {
    for (name, new_ref) in local_env {
        if let Some(persistent) = net_env.get(name) {
            if persistent.net != new_ref.net {
                make_dff(ctx, CellOp::Dff, persistent.net, *new_ref, clock, None, None, span);
            }
        }
    }
}

fn commit_sequential_enable(ctx: &mut ElaborationContext<'_>, net_env: &NetEnv, local_env: &NetEnv, clock: NetRef, enable: NetRef, span: Span) {
    for (name, new_ref) in local_env {
        if let Some(persistent) = net_env.get(name) {
            if persistent.net != new_ref.net {
                make_dff(ctx, CellOp::Dffe, persistent.net, *new_ref, clock, None, Some(enable), span);
            }
        }
    }
}

fn commit_sequential_reset(
    ctx: &mut ElaborationContext<'_>,
    net_env: &NetEnv,
    reset_env: &NetEnv,
    rest_env: &NetEnv,
    clock: NetRef,
    reset_sig: NetRef,
    span: Span,
) {
    let mut changed: HashSet<Ident> = HashSet::new();
    for (name, r) in reset_env {
        if net_env.get(name).map(|p| p.net) != Some(r.net) {
            changed.insert(*name);
        }
    }
    for (name, r) in rest_env {
        if net_env.get(name).map(|p| p.net) != Some(r.net) {
            changed.insert(*name);
        }
    }
    for name in changed {
        let Some(persistent) = net_env.get(&name).copied() else { continue };
        let d_ref = rest_env.get(&name).copied().unwrap_or(persistent);
        let cell = make_dff(ctx, CellOp::Dffr, persistent.net, d_ref, clock, Some(reset_sig), None, span);
        if let Some(r) = reset_env.get(&name) {
            if let Some(logic) = const_value_of(ctx, r.net) {
                ctx.netlist.cells.get_mut(cell).attributes.insert("reset_value".to_string(), AttrValue::Logic(logic));
            }
        }
    }
}

fn const_value_of(ctx: &ElaborationContext<'_>, net: NetId) -> Option<aion_common::LogicVec> {
    let n = ctx.netlist.nets.get(net);
    let driver_cell = n.driver.as_ref()?.0;
    let cell = ctx.netlist.cells.get(driver_cell);
    if cell.op != CellOp::Const {
        return None;
    }
    match cell.attributes.get("value") {
        Some(AttrValue::Logic(lv)) => Some(lv.clone()),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn make_dff(
    ctx: &mut ElaborationContext<'_>,
    op: CellOp,
    target_net: NetId,
    d_value: NetRef,
    clock: NetRef,
    reset: Option<NetRef>,
    enable: Option<NetRef>,
    span: Span,
) -> CellId {
    let width = expr::width_of(ctx, target_net);
    let d_fit = expr::fit_to_width(ctx, d_value, width, span);
    let name = ctx.fresh_name("dff");
    let cell = expr::alloc_cell(ctx, &name, op, span);
    ctx.netlist.cells.get_mut(cell).add_pin("D", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("CLK", PinDirection::In, 1);
    ctx.netlist.cells.get_mut(cell).add_pin("Q", PinDirection::Out, width);
    expr::connect_input(ctx, cell, "D", d_fit.net);
    expr::connect_input(ctx, cell, "CLK", clock.net);
    if let Some(r) = reset {
        ctx.netlist.cells.get_mut(cell).add_pin("RST", PinDirection::In, 1);
        expr::connect_input(ctx, cell, "RST", r.net);
    }
    if let Some(e) = enable {
        ctx.netlist.cells.get_mut(cell).add_pin("EN", PinDirection::In, 1);
        expr::connect_input(ctx, cell, "EN", e.net);
    }
    expr::drive_output(ctx, cell, "Q", target_net);
    cell
}

// --- small boolean-gate helpers shared by memory-write enable tracking --

fn reduce_bool(ctx: &mut ElaborationContext<'_>, a: NetRef, span: Span) -> NetRef {
    if expr::width_of(ctx, a.net) == 1 {
        return a;
    }
    emit_gate_unary(ctx, CellOp::Or, a, 1, span)
}

fn emit_gate_unary(ctx: &mut ElaborationContext<'_>, op: CellOp, a: NetRef, out_width: u32, span: Span) -> NetRef {
    let in_width = expr::width_of(ctx, a.net);
    let name = ctx.fresh_name("gate");
    let cell = expr::alloc_cell(ctx, &name, op, span);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, in_width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, out_width);
    expr::connect_input(ctx, cell, "A", a.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), out_width);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_gate_binary(ctx: &mut ElaborationContext<'_>, op: CellOp, a: NetRef, b: NetRef, width: u32, span: Span) -> NetRef {
    let a_fit = expr::fit_to_width(ctx, a, width, span);
    let b_fit = expr::fit_to_width(ctx, b, width, span);
    let name = ctx.fresh_name("gate");
    let cell = expr::alloc_cell(ctx, &name, op, span);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("B", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, width);
    expr::connect_input(ctx, cell, "A", a_fit.net);
    expr::connect_input(ctx, cell, "B", b_fit.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), width);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

fn emit_bool_binary(ctx: &mut ElaborationContext<'_>, op: CellOp, a: NetRef, b: NetRef, span: Span) -> NetRef {
    let a_bool = reduce_bool(ctx, a, span);
    let b_bool = reduce_bool(ctx, b, span);
    emit_gate_binary(ctx, op, a_bool, b_bool, 1, span)
}

fn combine_cond(ctx: &mut ElaborationContext<'_>, prior: Option<NetRef>, new_bool: NetRef, span: Span) -> NetRef {
    match prior {
        None => new_bool,
        Some(p) => emit_bool_binary(ctx, CellOp::And, p, new_bool, span),
    }
}

// --- memory write synthesis (spec §4.3.5) --------------------------------

/// Walks an always-block body for `NonBlocking`/`Blocking` assignments into
/// a memory array element, synthesizing one `Memwr` cell per write site
/// (since [`stmt::assign_lvalue`] deliberately no-ops on those targets —
/// memory array writes need a dedicated write-port cell, not a net
/// splice). `cond` accumulates the enclosing `if`/`case` path condition;
/// writes reached under distinct conditions become independent `Memwr`
/// cells rather than being merged into a single priority-muxed write port.
#[allow(clippy::too_many_arguments)]
fn synthesize_memory_writes(
    stmt: &Statement,
    cond: Option<NetRef>,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    clock: NetRef,
    ctx: &mut ElaborationContext<'_>,
) {
    match stmt {
        Statement::Block { stmts, .. } => {
            for s in stmts {
                synthesize_memory_writes(s, cond, net_env, const_env, mem_env, clock, ctx);
            }
        }
        Statement::If { condition, then_stmt, else_stmt, span } => {
            let Some(c) = expr::lower_expr(condition, net_env, const_env, mem_env, ctx) else { return };
            let c_bool = reduce_bool(ctx, c, *span);
            synthesize_memory_writes(then_stmt, Some(combine_cond(ctx, cond, c_bool, *span)), net_env, const_env, mem_env, clock, ctx);
            if let Some(else_b) = else_stmt {
                let not_c = emit_gate_unary(ctx, CellOp::Not, c_bool, 1, *span);
                synthesize_memory_writes(else_b, Some(combine_cond(ctx, cond, not_c, *span)), net_env, const_env, mem_env, clock, ctx);
            }
        }
        Statement::Case { expr: sel, arms, span, .. } => {
            let Some(sel_ref) = expr::lower_expr(sel, net_env, const_env, mem_env, ctx) else { return };
            for arm in arms {
                if arm.is_default {
                    synthesize_memory_writes(&arm.body, cond, net_env, const_env, mem_env, clock, ctx);
                    continue;
                }
                if let Some(arm_cond) = case_arm_condition(ctx, arm, sel_ref, net_env, const_env, mem_env, *span) {
                    synthesize_memory_writes(&arm.body, Some(combine_cond(ctx, cond, arm_cond, *span)), net_env, const_env, mem_env, clock, ctx);
                }
            }
        }
        Statement::Blocking { target, value, span } | Statement::NonBlocking { target, value, span } => {
            let Expr::Index { base, index, .. } = target else { return };
            let Expr::Identifier { name, .. } = base.as_ref() else { return };
            let Some(mem) = mem_env.get(name).copied() else { return };
            let Some(addr_ref) = expr::lower_expr(index, net_env, const_env, mem_env, ctx) else { return };
            let Some(data_ref) = expr::lower_expr(value, net_env, const_env, mem_env, ctx) else { return };
            let addr_fit = expr::fit_to_width(ctx, addr_ref, mem.addr_width, *span);
            let data_fit = expr::fit_to_width(ctx, data_ref, mem.width, *span);
            let we = cond.unwrap_or_else(|| expr::materialize_const(ctx, &ConstValue::Bool(true), *span));
            let mem_name = ctx.interner.resolve(*name).to_string();
            let cell_name = ctx.fresh_name("memwr");
            let cell = expr::alloc_cell(ctx, &cell_name, CellOp::Memwr, *span);
            ctx.netlist.cells.get_mut(cell).attributes.insert("memory".to_string(), AttrValue::Str(mem_name));
            ctx.netlist.cells.get_mut(cell).attributes.insert("depth".to_string(), AttrValue::Int(mem.depth as i64));
            ctx.netlist.cells.get_mut(cell).add_pin("ADDR", PinDirection::In, mem.addr_width);
            ctx.netlist.cells.get_mut(cell).add_pin("DATA", PinDirection::In, mem.width);
            ctx.netlist.cells.get_mut(cell).add_pin("EN", PinDirection::In, 1);
            ctx.netlist.cells.get_mut(cell).add_pin("CLK", PinDirection::In, 1);
            expr::connect_input(ctx, cell, "ADDR", addr_fit.net);
            expr::connect_input(ctx, cell, "DATA", data_fit.net);
            expr::connect_input(ctx, cell, "EN", we.net);
            expr::connect_input(ctx, cell, "CLK", clock.net);
        }
        _ => {}
    }
}

fn case_arm_condition(
    ctx: &mut ElaborationContext<'_>,
    arm: &CaseArm,
    sel: NetRef,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    span: Span,
) -> Option<NetRef> {
    let mut acc: Option<NetRef> = None;
    for pat in &arm.patterns {
        let p = expr::lower_expr(pat, net_env, const_env, mem_env, ctx)?;
        let eq = emit_case_eq(ctx, sel, p, span);
        acc = Some(match acc {
            None => eq,
            Some(prev) => emit_bool_binary(ctx, CellOp::Or, prev, eq, span),
        });
    }
    acc
}

fn emit_case_eq(ctx: &mut ElaborationContext<'_>, a: NetRef, b: NetRef, span: Span) -> NetRef {
    let width = expr::width_of(ctx, a.net).max(expr::width_of(ctx, b.net));
    let a_fit = expr::fit_to_width(ctx, a, width, span);
    let b_fit = expr::fit_to_width(ctx, b, width, span);
    let name = ctx.fresh_name("eq");
    let cell = expr::alloc_cell(ctx, &name, CellOp::Eq, span);
    ctx.netlist.cells.get_mut(cell).add_pin("A", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("B", PinDirection::In, width);
    ctx.netlist.cells.get_mut(cell).add_pin("Y", PinDirection::Out, 1);
    expr::connect_input(ctx, cell, "A", a_fit.net);
    expr::connect_input(ctx, cell, "B", b_fit.net);
    let out = expr::new_net(ctx, &format!("{name}$y"), 1);
    expr::drive_output(ctx, cell, "Y", out);
    NetRef { net: out, signed: false }
}

// --- gate primitives (spec §4.3.2) ---------------------------------------

fn elaborate_gate(
    gate: &GateInst,
    net_env: &NetEnv,
    const_env: &ConstEnv,
    mem_env: &MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    if gate.ports.is_empty() {
        return;
    }
    let gate_name = ctx.interner.resolve(gate.gate_type).to_string();
    let out_expr = &gate.ports[0];
    let mut inputs = Vec::new();
    for e in &gate.ports[1..] {
        if let Some(v) = expr::lower_expr(e, net_env, const_env, mem_env, ctx) {
            inputs.push(v);
        }
    }
    if inputs.is_empty() {
        return;
    }
    let width = inputs.iter().map(|v| expr::width_of(ctx, v.net)).max().unwrap_or(1);

    let result = match gate_name.as_str() {
        "not" => emit_gate_unary(ctx, CellOp::Not, inputs[0], width, gate.span),
        "buf" => emit_gate_unary(ctx, CellOp::Buf, inputs[0], width, gate.span),
        "and" => reduce_gate(ctx, CellOp::And, &inputs, width, gate.span),
        "or" => reduce_gate(ctx, CellOp::Or, &inputs, width, gate.span),
        "xor" => reduce_gate(ctx, CellOp::Xor, &inputs, width, gate.span),
        "nand" => reduce_gate(ctx, CellOp::Nand, &inputs, width, gate.span),
        "nor" => reduce_gate(ctx, CellOp::Nor, &inputs, width, gate.span),
        "xnor" => reduce_gate(ctx, CellOp::Xnor, &inputs, width, gate.span),
        other => {
            ctx.sink.emit(errors::error_unsupported(&format!("gate primitive `{other}`"), gate.span));
            return;
        }
    };

    drive_lvalue(ctx, net_env, out_expr, result, const_env, mem_env, gate.span);
}

fn reduce_gate(ctx: &mut ElaborationContext<'_>, op: CellOp, inputs: &[NetRef], width: u32, span: Span) -> NetRef {
    if inputs.len() == 1 {
        // A unary instance of a nominally n-ary primitive (e.g. `and(y, a);`)
        // degenerates to a buffer.
        return emit_gate_unary(ctx, CellOp::Buf, inputs[0], width, span);
    }
    let mut acc = inputs[0];
    for v in &inputs[1..] {
        acc = emit_gate_binary(ctx, op, acc, *v, width, span);
    }
    acc
}

// --- generate blocks (spec §4.3.4) ---------------------------------------

fn elaborate_item_in_generate(
    item: &ModuleItem,
    prefix: &str,
    net_env: &mut NetEnv,
    const_env: &mut ConstEnv,
    mem_env: &mut MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    let empty = HashMap::new();
    elaborate_item(item, prefix, net_env, const_env, mem_env, &empty, ctx);
}

fn elaborate_generate(
    gb: &GenerateBlock,
    prefix: &str,
    net_env: &mut NetEnv,
    const_env: &mut ConstEnv,
    mem_env: &mut MemEnv,
    ctx: &mut ElaborationContext<'_>,
) {
    match gb {
        GenerateBlock::For { init, condition, step, label, items, span } => {
            let Statement::Blocking { target: init_target, value: init_value, .. } = init.as_ref() else {
                ctx.sink.emit(errors::error_unsupported("generate-for init is not a simple assignment", *span));
                return;
            };
            let Expr::Identifier { name: genvar, .. } = init_target else {
                ctx.sink.emit(errors::error_unsupported("generate-for variable is not a plain identifier", *span));
                return;
            };
            let Statement::Blocking { value: step_value, .. } = step.as_ref() else {
                ctx.sink.emit(errors::error_unsupported("generate-for step is not a simple assignment", *span));
                return;
            };
            let Some(init_val) = const_eval::eval_expr(init_value, ctx.interner, const_env, ctx.sink) else { return };
            let Some(mut counter) = const_eval::const_to_i64(&init_val) else { return };
            let label_str = label.map(|l| ctx.interner.resolve(l).to_string()).unwrap_or_else(|| "genblk".to_string());

            let mut iterations = 0i64;
            loop {
                const_env.insert(*genvar, ConstValue::Int { value: counter, width: 32, signed: true });
                let Some(cond_val) = const_eval::eval_expr(condition, ctx.interner, const_env, ctx.sink) else { return };
                if const_eval::const_to_i64(&cond_val).map(|v| v == 0).unwrap_or(true) {
                    break;
                }
                iterations += 1;
                if iterations > MAX_GENERATE_ITERATIONS {
                    ctx.sink.emit(errors::error_unsupported("generate-for exceeds the maximum unroll bound", *span));
                    return;
                }
                let iter_prefix = format!("{prefix}{label_str}[{counter}].");
                for item in items {
                    elaborate_item_in_generate(item, &iter_prefix, net_env, const_env, mem_env, ctx);
                }
                let Some(step_val) = const_eval::eval_expr(step_value, ctx.interner, const_env, ctx.sink) else { return };
                let Some(next) = const_eval::const_to_i64(&step_val) else { return };
                counter = next;
            }
        }
        GenerateBlock::If { condition, then_items, else_items, .. } => {
            let Some(cond_val) = const_eval::eval_expr(condition, ctx.interner, const_env, ctx.sink) else { return };
            let items = if const_eval::const_to_i64(&cond_val).map(|v| v != 0).unwrap_or(false) {
                then_items
            } else {
                else_items
            };
            for item in items {
                elaborate_item_in_generate(item, prefix, net_env, const_env, mem_env, ctx);
            }
        }
        GenerateBlock::Case { expr: sel, arms, .. } => {
            let Some(sel_val) = const_eval::eval_expr(sel, ctx.interner, const_env, ctx.sink) else { return };
            let sel_i = const_eval::const_to_i64(&sel_val);
            let mut chosen: Option<&Vec<ModuleItem>> = None;
            for arm in arms {
                if arm.is_default {
                    continue;
                }
                for pat in &arm.patterns {
                    if let Some(pv) = const_eval::eval_expr(pat, ctx.interner, const_env, ctx.sink) {
                        if const_eval::const_to_i64(&pv) == sel_i {
                            chosen = Some(&arm.items);
                        }
                    }
                }
            }
            let chosen = chosen.or_else(|| arms.iter().find(|a| a.is_default).map(|a| &a.items));
            if let Some(items) = chosen {
                for item in items {
                    elaborate_item_in_generate(item, prefix, net_env, const_env, mem_env, ctx);
                }
            }
        }
    }
}

// --- module instantiation (spec §4.3.4) ----------------------------------

fn elaborate_instantiation(
    inst: &Instantiation,
    prefix: &str,
    net_env: &mut NetEnv,
    const_env: &mut ConstEnv,
    mem_env: &mut MemEnv,
    defparams: &HashMap<Ident, HashMap<Ident, ConstValue>>,
    ctx: &mut ElaborationContext<'_>,
) {
    let registry = ctx.registry;
    let Some(target) = registry.lookup(inst.module_name) else {
        let name = ctx.interner.resolve(inst.module_name).to_string();
        ctx.sink.emit(errors::error_unknown_module(&name, inst.span));
        return;
    };

    let mut overrides: HashMap<Ident, ConstValue> = HashMap::new();
    for (i, conn) in inst.param_overrides.iter().enumerate() {
        let Some(actual) = &conn.actual else { continue };
        let Some(val) = const_eval::eval_expr(actual, ctx.interner, const_env, ctx.sink) else { continue };
        let param_name = match conn.formal {
            Some(f) => f,
            None => match target.params.get(i) {
                Some(p) => p.name,
                None => continue,
            },
        };
        overrides.insert(param_name, val);
    }

    let (port_order, port_decls) = collect_ports(target);

    for inst_decl in &inst.instances {
        if inst_decl.range.is_some() {
            ctx.sink.emit(errors::error_unsupported("instance arrays", inst_decl.span));
            continue;
        }
        if !ctx.push_elab_stack(inst.module_name, inst_decl.span) {
            continue;
        }

        let mut inst_overrides = overrides.clone();
        if let Some(dp) = defparams.get(&inst_decl.name) {
            for (pname, val) in dp {
                inst_overrides.entry(*pname).or_insert_with(|| val.clone());
            }
        }

        let mut sub_const_env = ConstEnv::new();
        for (pname, val) in &inst_overrides {
            sub_const_env.insert(*pname, val.clone());
        }
        for p in &target.params {
            bind_parameter(p, &mut sub_const_env, ctx);
        }

        let inst_name_str = ctx.interner.resolve(inst_decl.name).to_string();
        let instance_prefix = format!("{prefix}{inst_name_str}.");

        let mut sub_net_env = NetEnv::new();
        let mut sub_mem_env = MemEnv::new();
        let mut output_connections: Vec<(Ident, Option<Expr>)> = Vec::new();

        for (pos, pname) in port_order.iter().enumerate() {
            let Some(decl) = port_decls.get(pname) else { continue };
            let conn = inst_decl
                .connections
                .iter()
                .find(|c| c.formal == Some(*pname))
                .or_else(|| inst_decl.connections.get(pos).filter(|c| c.formal.is_none()));

            match decl.direction {
                Direction::Input => {
                    let resolved = types::resolve_net_type(
                        decl.net_type.as_ref(),
                        decl.range.as_ref(),
                        decl.signed,
                        &sub_const_env,
                        ctx.interner,
                        ctx.sink,
                    );
                    match conn.and_then(|c| c.actual.as_ref()) {
                        Some(actual) => {
                            if let Some(val) = expr::lower_expr(actual, net_env, const_env, mem_env, ctx) {
                                let fitted = expr::fit_to_width(ctx, val, resolved.width, inst_decl.span);
                                sub_net_env.insert(*pname, fitted);
                            }
                        }
                        None => {
                            let port_name = ctx.interner.resolve(*pname).to_string();
                            ctx.sink.emit(errors::warn_unconnected_port(&port_name, &inst_name_str, inst_decl.span));
                            let zero = expr::materialize_const(
                                ctx,
                                &ConstValue::Int { value: 0, width: resolved.width, signed: false },
                                inst_decl.span,
                            );
                            sub_net_env.insert(*pname, zero);
                        }
                    }
                }
                Direction::Output => {
                    output_connections.push((*pname, conn.and_then(|c| c.actual.clone())));
                }
                Direction::Inout => {
                    if let Some(Expr::Identifier { name, .. }) = conn.and_then(|c| c.actual.as_ref()) {
                        if let Some(nref) = net_env.get(name) {
                            sub_net_env.insert(*pname, *nref);
                        }
                    }
                }
            }
        }

        elaborate_items(target, &instance_prefix, &mut sub_net_env, &mut sub_const_env, &mut sub_mem_env, ctx);

        for (pname, actual) in output_connections {
            let (Some(result), Some(actual_expr)) = (sub_net_env.get(&pname).copied(), actual) else {
                continue;
            };
            drive_lvalue(ctx, net_env, &actual_expr, result, const_env, mem_env, inst_decl.span);
        }

        ctx.pop_elab_stack();
    }
}
