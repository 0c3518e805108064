//! AST visitor traits.
//!
//! [`Visitor`] and [`VisitorMut`] provide double dispatch over [`crate::ast`]
//! nodes: one method per node category, each with a `visit_*`/`generic_visit`
//! pair so a caller can override just the categories it cares about and fall
//! through to the default recursive walk for everything else.

use crate::ast::*;

/// Read-only AST visitor.
///
/// Override individual `visit_*` methods to intercept specific node kinds;
/// call the matching `walk_*` free function (or `self.generic_visit_*`) to
/// recurse into children.
pub trait Visitor {
    /// Visits a top-level source file.
    fn visit_source_file(&mut self, file: &VerilogSourceFile) {
        walk_source_file(self, file);
    }

    /// Visits a top-level item.
    fn visit_item(&mut self, item: &VerilogItem) {
        walk_item(self, item);
    }

    /// Visits a module declaration.
    fn visit_module(&mut self, module: &ModuleDecl) {
        walk_module(self, module);
    }

    /// Visits a single module item.
    fn visit_module_item(&mut self, item: &ModuleItem) {
        walk_module_item(self, item);
    }

    /// Visits a statement.
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    /// Visits an expression.
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Default recursive walk for [`Visitor::visit_source_file`].
pub fn walk_source_file<V: Visitor + ?Sized>(v: &mut V, file: &VerilogSourceFile) {
    for item in &file.items {
        v.visit_item(item);
    }
}

/// Default recursive walk for [`Visitor::visit_item`].
pub fn walk_item<V: Visitor + ?Sized>(v: &mut V, item: &VerilogItem) {
    match item {
        VerilogItem::Module(module) => v.visit_module(module),
        VerilogItem::Error(_) => {}
    }
}

/// Default recursive walk for [`Visitor::visit_module`].
pub fn walk_module<V: Visitor + ?Sized>(v: &mut V, module: &ModuleDecl) {
    for item in &module.items {
        v.visit_module_item(item);
    }
}

/// Default recursive walk for [`Visitor::visit_module_item`].
pub fn walk_module_item<V: Visitor + ?Sized>(v: &mut V, item: &ModuleItem) {
    match item {
        ModuleItem::ContinuousAssign(a) => {
            v.visit_expr(&a.target);
            v.visit_expr(&a.value);
        }
        ModuleItem::AlwaysBlock(a) => v.visit_statement(&a.body),
        ModuleItem::InitialBlock(i) => v.visit_statement(&i.body),
        ModuleItem::Instantiation(inst) => {
            for conn in &inst.param_overrides {
                if let Some(actual) = &conn.actual {
                    v.visit_expr(actual);
                }
            }
            for instance in &inst.instances {
                for conn in &instance.connections {
                    if let Some(actual) = &conn.actual {
                        v.visit_expr(actual);
                    }
                }
            }
        }
        ModuleItem::GateInst(g) => {
            for port in &g.ports {
                v.visit_expr(port);
            }
        }
        ModuleItem::GenerateBlock(GenerateBlock::For {
            condition, items, ..
        }) => {
            v.visit_expr(condition);
            for item in items {
                v.visit_module_item(item);
            }
        }
        ModuleItem::GenerateBlock(GenerateBlock::If {
            condition,
            then_items,
            else_items,
            ..
        }) => {
            v.visit_expr(condition);
            for item in then_items.iter().chain(else_items.iter()) {
                v.visit_module_item(item);
            }
        }
        ModuleItem::GenerateBlock(GenerateBlock::Case { expr, arms, .. }) => {
            v.visit_expr(expr);
            for arm in arms {
                for pattern in &arm.patterns {
                    v.visit_expr(pattern);
                }
                for item in &arm.items {
                    v.visit_module_item(item);
                }
            }
        }
        ModuleItem::FunctionDecl(f) => {
            for stmt in &f.body {
                v.visit_statement(stmt);
            }
        }
        ModuleItem::TaskDecl(t) => {
            for stmt in &t.body {
                v.visit_statement(stmt);
            }
        }
        ModuleItem::DefparamDecl(d) => {
            v.visit_expr(&d.target);
            v.visit_expr(&d.value);
        }
        ModuleItem::NetDecl(_)
        | ModuleItem::RegDecl(_)
        | ModuleItem::IntegerDecl(_)
        | ModuleItem::RealDecl(_)
        | ModuleItem::ParameterDecl(_)
        | ModuleItem::LocalparamDecl(_)
        | ModuleItem::PortDecl(_)
        | ModuleItem::GenvarDecl(_)
        | ModuleItem::Error(_) => {}
    }
}

/// Default recursive walk for [`Visitor::visit_statement`].
pub fn walk_statement<V: Visitor + ?Sized>(v: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Blocking { target, value, .. } | Statement::NonBlocking { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Statement::Block { stmts, .. } => {
            for s in stmts {
                v.visit_statement(s);
            }
        }
        Statement::If {
            condition,
            then_stmt,
            else_stmt,
            ..
        } => {
            v.visit_expr(condition);
            v.visit_statement(then_stmt);
            if let Some(e) = else_stmt {
                v.visit_statement(e);
            }
        }
        Statement::Case { expr, arms, .. } => {
            v.visit_expr(expr);
            for arm in arms {
                for pattern in &arm.patterns {
                    v.visit_expr(pattern);
                }
                v.visit_statement(&arm.body);
            }
        }
        Statement::For {
            init,
            condition,
            step,
            body,
            ..
        } => {
            v.visit_statement(init);
            v.visit_expr(condition);
            v.visit_statement(step);
            v.visit_statement(body);
        }
        Statement::While { condition, body, .. } => {
            v.visit_expr(condition);
            v.visit_statement(body);
        }
        Statement::Forever { body, .. } => v.visit_statement(body),
        Statement::Repeat { count, body, .. } => {
            v.visit_expr(count);
            v.visit_statement(body);
        }
        Statement::Wait { condition, body, .. } => {
            v.visit_expr(condition);
            if let Some(b) = body {
                v.visit_statement(b);
            }
        }
        Statement::EventControl { body, .. } => v.visit_statement(body),
        Statement::EventTrigger { target, .. } => v.visit_expr(target),
        Statement::Delay { delay, body, .. } => {
            v.visit_expr(delay);
            v.visit_statement(body);
        }
        Statement::TaskCall { name, args, .. } => {
            v.visit_expr(name);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Statement::SystemTaskCall { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Statement::Disable { .. } | Statement::Null { .. } | Statement::Error(_) => {}
    }
}

/// Default recursive walk for [`Visitor::visit_expr`].
pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Index { base, index, .. } => {
            v.visit_expr(base);
            v.visit_expr(index);
        }
        Expr::RangeSelect { base, msb, lsb, .. } => {
            v.visit_expr(base);
            v.visit_expr(msb);
            v.visit_expr(lsb);
        }
        Expr::BitSelect {
            base, index, width, ..
        } => {
            v.visit_expr(base);
            v.visit_expr(index);
            v.visit_expr(width);
        }
        Expr::Concat { elements, .. } => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Repeat { count, elements, .. } => {
            v.visit_expr(count);
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            v.visit_expr(condition);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::FuncCall { name, args, .. } => {
            v.visit_expr(name);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::SystemCall { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Paren { inner, .. } => v.visit_expr(inner),
        Expr::Identifier { .. }
        | Expr::HierarchicalName { .. }
        | Expr::Literal { .. }
        | Expr::RealLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::Error(_) => {}
    }
}

/// Mutable AST visitor, for in-place rewrites.
pub trait VisitorMut {
    /// Visits a top-level source file.
    fn visit_source_file(&mut self, file: &mut VerilogSourceFile) {
        walk_source_file_mut(self, file);
    }

    /// Visits a top-level item.
    fn visit_item(&mut self, item: &mut VerilogItem) {
        walk_item_mut(self, item);
    }

    /// Visits a module declaration.
    fn visit_module(&mut self, module: &mut ModuleDecl) {
        walk_module_mut(self, module);
    }

    /// Visits a single module item.
    fn visit_module_item(&mut self, item: &mut ModuleItem) {
        walk_module_item_mut(self, item);
    }

    /// Visits a statement.
    fn visit_statement(&mut self, stmt: &mut Statement) {
        walk_statement_mut(self, stmt);
    }

    /// Visits an expression.
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

/// Default recursive walk for [`VisitorMut::visit_source_file`].
pub fn walk_source_file_mut<V: VisitorMut + ?Sized>(v: &mut V, file: &mut VerilogSourceFile) {
    for item in &mut file.items {
        v.visit_item(item);
    }
}

/// Default recursive walk for [`VisitorMut::visit_item`].
pub fn walk_item_mut<V: VisitorMut + ?Sized>(v: &mut V, item: &mut VerilogItem) {
    match item {
        VerilogItem::Module(module) => v.visit_module(module),
        VerilogItem::Error(_) => {}
    }
}

/// Default recursive walk for [`VisitorMut::visit_module`].
pub fn walk_module_mut<V: VisitorMut + ?Sized>(v: &mut V, module: &mut ModuleDecl) {
    for item in &mut module.items {
        v.visit_module_item(item);
    }
}

/// Default recursive walk for [`VisitorMut::visit_module_item`].
pub fn walk_module_item_mut<V: VisitorMut + ?Sized>(v: &mut V, item: &mut ModuleItem) {
    match item {
        ModuleItem::ContinuousAssign(a) => {
            v.visit_expr(&mut a.target);
            v.visit_expr(&mut a.value);
        }
        ModuleItem::AlwaysBlock(a) => v.visit_statement(&mut a.body),
        ModuleItem::InitialBlock(i) => v.visit_statement(&mut i.body),
        ModuleItem::Instantiation(inst) => {
            for conn in &mut inst.param_overrides {
                if let Some(actual) = &mut conn.actual {
                    v.visit_expr(actual);
                }
            }
            for instance in &mut inst.instances {
                for conn in &mut instance.connections {
                    if let Some(actual) = &mut conn.actual {
                        v.visit_expr(actual);
                    }
                }
            }
        }
        ModuleItem::GateInst(g) => {
            for port in &mut g.ports {
                v.visit_expr(port);
            }
        }
        ModuleItem::GenerateBlock(GenerateBlock::For {
            condition, items, ..
        }) => {
            v.visit_expr(condition);
            for item in items {
                v.visit_module_item(item);
            }
        }
        ModuleItem::GenerateBlock(GenerateBlock::If {
            condition,
            then_items,
            else_items,
            ..
        }) => {
            v.visit_expr(condition);
            for item in then_items.iter_mut().chain(else_items.iter_mut()) {
                v.visit_module_item(item);
            }
        }
        ModuleItem::GenerateBlock(GenerateBlock::Case { expr, arms, .. }) => {
            v.visit_expr(expr);
            for arm in arms {
                for pattern in &mut arm.patterns {
                    v.visit_expr(pattern);
                }
                for item in &mut arm.items {
                    v.visit_module_item(item);
                }
            }
        }
        ModuleItem::FunctionDecl(f) => {
            for stmt in &mut f.body {
                v.visit_statement(stmt);
            }
        }
        ModuleItem::TaskDecl(t) => {
            for stmt in &mut t.body {
                v.visit_statement(stmt);
            }
        }
        ModuleItem::DefparamDecl(d) => {
            v.visit_expr(&mut d.target);
            v.visit_expr(&mut d.value);
        }
        ModuleItem::NetDecl(_)
        | ModuleItem::RegDecl(_)
        | ModuleItem::IntegerDecl(_)
        | ModuleItem::RealDecl(_)
        | ModuleItem::ParameterDecl(_)
        | ModuleItem::LocalparamDecl(_)
        | ModuleItem::PortDecl(_)
        | ModuleItem::GenvarDecl(_)
        | ModuleItem::Error(_) => {}
    }
}

/// Default recursive walk for [`VisitorMut::visit_statement`].
pub fn walk_statement_mut<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Statement) {
    match stmt {
        Statement::Blocking { target, value, .. } | Statement::NonBlocking { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Statement::Block { stmts, .. } => {
            for s in stmts {
                v.visit_statement(s);
            }
        }
        Statement::If {
            condition,
            then_stmt,
            else_stmt,
            ..
        } => {
            v.visit_expr(condition);
            v.visit_statement(then_stmt);
            if let Some(e) = else_stmt {
                v.visit_statement(e);
            }
        }
        Statement::Case { expr, arms, .. } => {
            v.visit_expr(expr);
            for arm in arms {
                for pattern in &mut arm.patterns {
                    v.visit_expr(pattern);
                }
                v.visit_statement(&mut arm.body);
            }
        }
        Statement::For {
            init,
            condition,
            step,
            body,
            ..
        } => {
            v.visit_statement(init);
            v.visit_expr(condition);
            v.visit_statement(step);
            v.visit_statement(body);
        }
        Statement::While { condition, body, .. } => {
            v.visit_expr(condition);
            v.visit_statement(body);
        }
        Statement::Forever { body, .. } => v.visit_statement(body),
        Statement::Repeat { count, body, .. } => {
            v.visit_expr(count);
            v.visit_statement(body);
        }
        Statement::Wait { condition, body, .. } => {
            v.visit_expr(condition);
            if let Some(b) = body {
                v.visit_statement(b);
            }
        }
        Statement::EventControl { body, .. } => v.visit_statement(body),
        Statement::EventTrigger { target, .. } => v.visit_expr(target),
        Statement::Delay { delay, body, .. } => {
            v.visit_expr(delay);
            v.visit_statement(body);
        }
        Statement::TaskCall { name, args, .. } => {
            v.visit_expr(name);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Statement::SystemTaskCall { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Statement::Disable { .. } | Statement::Null { .. } | Statement::Error(_) => {}
    }
}

/// Default recursive walk for [`VisitorMut::visit_expr`].
pub fn walk_expr_mut<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Index { base, index, .. } => {
            v.visit_expr(base);
            v.visit_expr(index);
        }
        Expr::RangeSelect { base, msb, lsb, .. } => {
            v.visit_expr(base);
            v.visit_expr(msb);
            v.visit_expr(lsb);
        }
        Expr::BitSelect {
            base, index, width, ..
        } => {
            v.visit_expr(base);
            v.visit_expr(index);
            v.visit_expr(width);
        }
        Expr::Concat { elements, .. } => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Repeat { count, elements, .. } => {
            v.visit_expr(count);
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            v.visit_expr(condition);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::FuncCall { name, args, .. } => {
            v.visit_expr(name);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::SystemCall { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Paren { inner, .. } => v.visit_expr(inner),
        Expr::Identifier { .. }
        | Expr::HierarchicalName { .. }
        | Expr::Literal { .. }
        | Expr::RealLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::Error(_) => {}
    }
}
