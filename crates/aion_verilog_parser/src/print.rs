//! Pretty-printer emitting canonical Verilog-2005 text from the AST.
//!
//! Output is not intended to byte-match the original source; it is a
//! canonical re-serialization useful for diffing transformed ASTs and for
//! debugging.

use crate::ast::*;
use aion_common::Interner;
use std::fmt::Write as _;

/// Renders a [`VerilogSourceFile`] as Verilog-2005 source text.
pub fn print_source_file(file: &VerilogSourceFile, interner: &Interner) -> String {
    let mut out = String::new();
    for item in &file.items {
        print_item(&mut out, item, interner);
        out.push('\n');
    }
    out
}

fn print_item(out: &mut String, item: &VerilogItem, interner: &Interner) {
    match item {
        VerilogItem::Module(m) => print_module(out, m, interner),
        VerilogItem::Error(_) => out.push_str("/* error */\n"),
    }
}

fn print_module(out: &mut String, module: &ModuleDecl, interner: &Interner) {
    print_attrs(out, &module.attrs, 0);
    write!(out, "module {}", resolve(module.name, interner)).unwrap();
    if !module.params.is_empty() {
        out.push_str(" #(");
        print_params(out, &module.params, interner);
        out.push(')');
    }
    match module.port_style {
        PortStyle::Empty => out.push_str(";\n"),
        PortStyle::NonAnsi => {
            out.push('(');
            let names: Vec<_> = module
                .port_names
                .iter()
                .map(|n| resolve(*n, interner).to_string())
                .collect();
            out.push_str(&names.join(", "));
            out.push_str(");\n");
        }
        PortStyle::Ansi => {
            out.push('(');
            let ports: Vec<_> = module
                .ports
                .iter()
                .map(|p| format_port(p, interner))
                .collect();
            out.push_str(&ports.join(", "));
            out.push_str(");\n");
        }
    }
    for item in &module.items {
        print_module_item(out, item, interner, 1);
    }
    out.push_str("endmodule\n");
}

fn format_port(port: &PortDecl, interner: &Interner) -> String {
    let dir = match port.direction {
        Direction::Input => "input",
        Direction::Output => "output",
        Direction::Inout => "inout",
    };
    let names: Vec<_> = port
        .names
        .iter()
        .map(|n| resolve(*n, interner).to_string())
        .collect();
    let range = port
        .range
        .as_ref()
        .map(|r| format!(" {}", format_range(r, interner)))
        .unwrap_or_default();
    format!("{}{} {}", dir, range, names.join(", "))
}

fn print_params(out: &mut String, params: &[ParameterDecl], interner: &Interner) {
    let parts: Vec<_> = params
        .iter()
        .map(|p| {
            let value = p
                .value
                .as_ref()
                .map(|v| format!(" = {}", format_expr(v, interner)))
                .unwrap_or_default();
            format!("parameter {}{}", resolve(p.name, interner), value)
        })
        .collect();
    out.push_str(&parts.join(", "));
}

fn print_module_item(out: &mut String, item: &ModuleItem, interner: &Interner, indent: usize) {
    let pad = "    ".repeat(indent);
    match item {
        ModuleItem::NetDecl(n) => {
            print_attrs(out, &n.attrs, indent);
            let kw = net_type_keyword(n.net_type);
            let range = n
                .range
                .as_ref()
                .map(|r| format!("{} ", format_range(r, interner)))
                .unwrap_or_default();
            let names: Vec<_> = n
                .names
                .iter()
                .map(|d| resolve(d.name, interner).to_string())
                .collect();
            writeln!(out, "{pad}{} {}{};", kw, range, names.join(", ")).unwrap();
        }
        ModuleItem::RegDecl(r) => {
            print_attrs(out, &r.attrs, indent);
            let range = r
                .range
                .as_ref()
                .map(|r| format!("{} ", format_range(r, interner)))
                .unwrap_or_default();
            let names: Vec<_> = r
                .names
                .iter()
                .map(|d| resolve(d.name, interner).to_string())
                .collect();
            writeln!(out, "{pad}reg {}{};", range, names.join(", ")).unwrap();
        }
        ModuleItem::ParameterDecl(p) => {
            print_attrs(out, &p.attrs, indent);
            writeln!(out, "{pad}parameter {};", resolve(p.name, interner)).unwrap();
        }
        ModuleItem::ContinuousAssign(a) => {
            print_attrs(out, &a.attrs, indent);
            writeln!(
                out,
                "{pad}assign {} = {};",
                format_expr(&a.target, interner),
                format_expr(&a.value, interner)
            )
            .unwrap();
        }
        ModuleItem::AlwaysBlock(a) => {
            print_attrs(out, &a.attrs, indent);
            write!(out, "{pad}always ").unwrap();
            print_statement(out, &a.body, interner, indent);
        }
        ModuleItem::InitialBlock(i) => {
            print_attrs(out, &i.attrs, indent);
            write!(out, "{pad}initial ").unwrap();
            print_statement(out, &i.body, interner, indent);
        }
        ModuleItem::Instantiation(inst) => {
            print_attrs(out, &inst.attrs, indent);
            writeln!(out, "{pad}{} ...;", resolve(inst.module_name, interner)).unwrap();
        }
        ModuleItem::GateInst(g) => {
            print_attrs(out, &g.attrs, indent);
            writeln!(out, "{pad}{} (...);", resolve(g.gate_type, interner)).unwrap();
        }
        ModuleItem::GenerateBlock(_) => {
            writeln!(out, "{pad}generate ... endgenerate").unwrap();
        }
        ModuleItem::GenvarDecl(g) => {
            let names: Vec<_> = g
                .names
                .iter()
                .map(|n| resolve(*n, interner).to_string())
                .collect();
            writeln!(out, "{pad}genvar {};", names.join(", ")).unwrap();
        }
        ModuleItem::FunctionDecl(f) => {
            writeln!(out, "{pad}function {}; ... endfunction", resolve(f.name, interner)).unwrap();
        }
        ModuleItem::TaskDecl(t) => {
            writeln!(out, "{pad}task {}; ... endtask", resolve(t.name, interner)).unwrap();
        }
        ModuleItem::DefparamDecl(d) => {
            writeln!(
                out,
                "{pad}defparam {} = {};",
                format_expr(&d.target, interner),
                format_expr(&d.value, interner)
            )
            .unwrap();
        }
        ModuleItem::IntegerDecl(i) => {
            let names: Vec<_> = i
                .names
                .iter()
                .map(|d| resolve(d.name, interner).to_string())
                .collect();
            writeln!(out, "{pad}integer {};", names.join(", ")).unwrap();
        }
        ModuleItem::RealDecl(r) => {
            let names: Vec<_> = r
                .names
                .iter()
                .map(|d| resolve(d.name, interner).to_string())
                .collect();
            writeln!(out, "{pad}real {};", names.join(", ")).unwrap();
        }
        ModuleItem::LocalparamDecl(p) => {
            writeln!(out, "{pad}localparam {};", resolve(p.name, interner)).unwrap();
        }
        ModuleItem::PortDecl(p) => {
            writeln!(out, "{pad}{};", format_port(p, interner)).unwrap();
        }
        ModuleItem::Error(_) => {
            writeln!(out, "{pad}/* error */").unwrap();
        }
    }
}

fn print_statement(out: &mut String, stmt: &Statement, interner: &Interner, indent: usize) {
    match stmt {
        Statement::Block { stmts, .. } => {
            out.push_str("begin\n");
            for s in stmts {
                let pad = "    ".repeat(indent + 1);
                out.push_str(&pad);
                print_statement(out, s, interner, indent + 1);
            }
            writeln!(out, "{}end", "    ".repeat(indent)).unwrap();
        }
        Statement::EventControl { sensitivity, body, .. } => {
            write!(out, "@{} ", format_sensitivity(sensitivity, interner)).unwrap();
            print_statement(out, body, interner, indent);
        }
        Statement::Blocking { target, value, .. } => {
            writeln!(
                out,
                "{} = {};",
                format_expr(target, interner),
                format_expr(value, interner)
            )
            .unwrap();
        }
        Statement::NonBlocking { target, value, .. } => {
            writeln!(
                out,
                "{} <= {};",
                format_expr(target, interner),
                format_expr(value, interner)
            )
            .unwrap();
        }
        Statement::If {
            condition,
            then_stmt,
            else_stmt,
            ..
        } => {
            write!(out, "if ({}) ", format_expr(condition, interner)).unwrap();
            print_statement(out, then_stmt, interner, indent);
            if let Some(e) = else_stmt {
                write!(out, "{}else ", "    ".repeat(indent)).unwrap();
                print_statement(out, e, interner, indent);
            }
        }
        Statement::EventTrigger { target, .. } => {
            writeln!(out, "-> {};", format_expr(target, interner)).unwrap();
        }
        Statement::Null { .. } => out.push_str(";\n"),
        _ => out.push_str("/* stmt */;\n"),
    }
}

fn format_sensitivity(list: &SensitivityList, interner: &Interner) -> String {
    match list {
        SensitivityList::Star => "(*)".to_string(),
        SensitivityList::List(items) => {
            let parts: Vec<_> = items
                .iter()
                .map(|item| {
                    let edge = match item.edge {
                        Some(EdgeKind::Posedge) => "posedge ",
                        Some(EdgeKind::Negedge) => "negedge ",
                        None => "",
                    };
                    format!("{edge}{}", format_expr(&item.signal, interner))
                })
                .collect();
            format!("({})", parts.join(" or "))
        }
    }
}

fn format_range(range: &Range, interner: &Interner) -> String {
    format!(
        "[{}:{}]",
        format_expr(&range.msb, interner),
        format_expr(&range.lsb, interner)
    )
}

fn format_expr(expr: &Expr, interner: &Interner) -> String {
    match expr {
        Expr::Identifier { name, .. } => resolve(*name, interner).to_string(),
        Expr::HierarchicalName { parts, .. } => parts
            .iter()
            .map(|p| resolve(*p, interner).to_string())
            .collect::<Vec<_>>()
            .join("."),
        Expr::Literal { value, .. } => format!("{value}"),
        Expr::RealLiteral { .. } => "<real>".to_string(),
        Expr::StringLiteral { .. } => "\"<string>\"".to_string(),
        Expr::Index { base, index, .. } => {
            format!("{}[{}]", format_expr(base, interner), format_expr(index, interner))
        }
        Expr::RangeSelect { base, msb, lsb, .. } => format!(
            "{}[{}:{}]",
            format_expr(base, interner),
            format_expr(msb, interner),
            format_expr(lsb, interner)
        ),
        Expr::BitSelect {
            base,
            index,
            select_type,
            width,
            ..
        } => {
            let op = match select_type {
                BitSelectKind::Plus => "+:",
                BitSelectKind::Minus => "-:",
            };
            format!(
                "{}[{}{}{}]",
                format_expr(base, interner),
                format_expr(index, interner),
                op,
                format_expr(width, interner)
            )
        }
        Expr::Concat { elements, .. } => {
            let parts: Vec<_> = elements.iter().map(|e| format_expr(e, interner)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Expr::Repeat { count, elements, .. } => {
            let parts: Vec<_> = elements.iter().map(|e| format_expr(e, interner)).collect();
            format!("{{{}{{{}}}}}", format_expr(count, interner), parts.join(", "))
        }
        Expr::Unary { op, operand, .. } => format!("{}{}", unary_op_str(*op), format_expr(operand, interner)),
        Expr::Binary { left, op, right, .. } => format!(
            "({} {} {})",
            format_expr(left, interner),
            binary_op_str(*op),
            format_expr(right, interner)
        ),
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => format!(
            "({} ? {} : {})",
            format_expr(condition, interner),
            format_expr(then_expr, interner),
            format_expr(else_expr, interner)
        ),
        Expr::FuncCall { name, args, .. } => {
            let parts: Vec<_> = args.iter().map(|a| format_expr(a, interner)).collect();
            format!("{}({})", format_expr(name, interner), parts.join(", "))
        }
        Expr::SystemCall { name, args, .. } => {
            let parts: Vec<_> = args.iter().map(|a| format_expr(a, interner)).collect();
            format!("{}({})", resolve(*name, interner), parts.join(", "))
        }
        Expr::Paren { inner, .. } => format!("({})", format_expr(inner, interner)),
        Expr::Error(_) => "<error>".to_string(),
    }
}

fn unary_op_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::LogNot => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::RedAnd => "&",
        UnaryOp::RedNand => "~&",
        UnaryOp::RedOr => "|",
        UnaryOp::RedNor => "~|",
        UnaryOp::RedXor => "^",
        UnaryOp::RedXnor => "~^",
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "==",
        BinaryOp::Neq => "!=",
        BinaryOp::CaseEq => "===",
        BinaryOp::CaseNeq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::LogAnd => "&&",
        BinaryOp::LogOr => "||",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::BitXnor => "~^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::AShl => "<<<",
        BinaryOp::AShr => ">>>",
    }
}

fn net_type_keyword(ty: NetType) -> &'static str {
    match ty {
        NetType::Wire => "wire",
        NetType::Reg => "reg",
        NetType::Integer => "integer",
        NetType::Real => "real",
        NetType::Tri => "tri",
        NetType::Supply0 => "supply0",
        NetType::Supply1 => "supply1",
        NetType::Event => "event",
        NetType::Time => "time",
        NetType::Realtime => "realtime",
    }
}

fn print_attrs(out: &mut String, attrs: &[String], indent: usize) {
    let pad = "    ".repeat(indent);
    for attr in attrs {
        writeln!(out, "{pad}{attr}").unwrap();
    }
}

fn resolve(ident: aion_common::Ident, interner: &Interner) -> String {
    interner.resolve(ident).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser::VerilogParser};
    use aion_diagnostics::DiagnosticSink;
    use aion_source::FileId;

    fn roundtrip_contains(source: &str, needle: &str) {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = lexer::lex(source, file, &sink);
        let mut parser = VerilogParser::new(tokens, source, file, &interner, &sink);
        let ast = parser.parse_source_file();
        let printed = print_source_file(&ast, &interner);
        assert!(
            printed.contains(needle),
            "expected {printed:?} to contain {needle:?}"
        );
    }

    #[test]
    fn prints_module_header() {
        roundtrip_contains("module m(input a, output b); endmodule", "module m(");
    }

    #[test]
    fn prints_continuous_assign() {
        roundtrip_contains("module m; wire a, b; assign a = b; endmodule", "assign a = b;");
    }

    #[test]
    fn prints_always_block() {
        roundtrip_contains(
            "module m; reg q; always @(posedge clk) q <= 1; endmodule",
            "always @(posedge clk)",
        );
    }
}
