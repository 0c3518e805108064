//! Constant expression evaluation for elaboration (spec §4.3.1).
//!
//! Folds parameter/localparam and generate-block constant expressions to
//! values using a fixed environment of prior bindings. Only fully-constant
//! operands fold; anything else is an `E209` diagnostic. Literal values are
//! taken directly from the lexer-resolved [`LogicVec`] carried on
//! `Expr::Literal` rather than re-parsed from source text.

use std::collections::HashMap;

use aion_common::{Ident, Interner, LogicVec};
use aion_diagnostics::DiagnosticSink;
use aion_verilog_parser::ast as v_ast;

use crate::errors;

/// A folded compile-time constant, carrying the width and signedness needed
/// to evaluate further expressions (spec §4.3.1: "width = max(declared
/// param width, natural width of the value)").
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// An integer-valued constant with an explicit bit width and signedness.
    Int {
        /// The value, stored as a signed 64-bit integer regardless of
        /// `signed` (the bit pattern is reinterpreted per `signed` where it
        /// matters, e.g. comparisons and division).
        value: i64,
        /// The bit width this value was folded at.
        width: u32,
        /// Whether this value should be treated as signed in further ops.
        signed: bool,
    },
    /// A real-valued constant (`real`/`shortreal` declarations, rare in the
    /// synthesizable subset but legal in constant expressions).
    Real(f64),
    /// A resolved four-state bit vector, used when the exact bit pattern
    /// (not just its integer value) is needed, e.g. for `parameter` default
    /// values assigned directly from a sized literal.
    Logic(LogicVec),
    /// A string constant (module/instance parameter overrides).
    String(String),
    /// A boolean, used for comparison and logical-operator results.
    Bool(bool),
}

impl ConstValue {
    fn int(value: i64, width: u32, signed: bool) -> Self {
        ConstValue::Int { value, width, signed }
    }

    /// The bit width of this value, used by `$bits`.
    pub fn width(&self) -> u32 {
        match self {
            ConstValue::Int { width, .. } => *width,
            ConstValue::Real(_) => 64,
            ConstValue::Logic(lv) => lv.width(),
            ConstValue::String(s) => (s.len() as u32) * 8,
            ConstValue::Bool(_) => 1,
        }
    }
}

/// A mapping from interned identifiers to their constant values.
///
/// Used during elaboration to track parameter bindings and genvar values so
/// that constant expressions referencing them can be evaluated.
pub type ConstEnv = HashMap<Ident, ConstValue>;

/// Coerces a [`ConstValue`] to an `i64`, if the value can be represented as one.
pub fn const_to_i64(val: &ConstValue) -> Option<i64> {
    match val {
        ConstValue::Int { value, .. } => Some(*value),
        ConstValue::Real(f) => Some(*f as i64),
        ConstValue::Bool(b) => Some(if *b { 1 } else { 0 }),
        ConstValue::Logic(lv) => lv.to_u64().map(|v| v as i64),
        ConstValue::String(_) => None,
    }
}

/// Returns `true` if this value should participate in signed arithmetic.
fn const_signed(val: &ConstValue) -> bool {
    matches!(val, ConstValue::Int { signed: true, .. })
}

/// Computes the ceiling of log-base-2 for a non-negative integer
/// (`$clog2` semantics: `clog2(0) = clog2(1) = 0`, `clog2(2) = 1`, ...).
fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let mut result = 0i64;
    let mut val = n - 1;
    while val > 0 {
        result += 1;
        val >>= 1;
    }
    result
}

/// Masks a value to `width` bits, reinterpreting it as unsigned — the
/// IEEE 1364-2005 §5 rule applied whenever a binary operation has at least
/// one unsigned operand (DESIGN.md Open Question 3).
fn as_unsigned(value: i64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return value;
    }
    value & ((1i64 << width) - 1)
}

/// Applies a binary arithmetic/comparison/logical operator to two folded
/// integer operands, honoring the mixed signed/unsigned result rule.
fn apply_binop(
    op: v_ast::BinaryOp,
    lhs: &ConstValue,
    rhs: &ConstValue,
) -> Option<(i64, u32, bool, bool)> {
    let l = const_to_i64(lhs)?;
    let r = const_to_i64(rhs)?;
    let lw = lhs.width();
    let rw = rhs.width();
    let both_signed = const_signed(lhs) && const_signed(rhs);
    let width = lw.max(rw);

    let (l, r) = if both_signed {
        (l, r)
    } else {
        (as_unsigned(l, lw), as_unsigned(r, rw))
    };

    use v_ast::BinaryOp::*;
    let result = match op {
        Add => Some(l.wrapping_add(r)),
        Sub => Some(l.wrapping_sub(r)),
        Mul => Some(l.wrapping_mul(r)),
        Div => {
            if r == 0 {
                return None;
            }
            Some(l / r)
        }
        Mod => {
            if r == 0 {
                return None;
            }
            Some(l % r)
        }
        Pow => {
            if r < 0 {
                Some(0)
            } else {
                Some(l.wrapping_pow(r as u32))
            }
        }
        BitAnd => Some(l & r),
        BitOr => Some(l | r),
        BitXor => Some(l ^ r),
        BitXnor => Some(!(l ^ r)),
        Shl | AShl => Some(l.wrapping_shl(r as u32)),
        Shr => Some(((l as u64).wrapping_shr(r as u32)) as i64),
        AShr => Some(l.wrapping_shr(r as u32)),
        Eq | CaseEq => return Some(((l == r) as i64, 1, false, true)),
        Neq | CaseNeq => return Some(((l != r) as i64, 1, false, true)),
        Lt => return Some(((l < r) as i64, 1, false, true)),
        Le => return Some(((l <= r) as i64, 1, false, true)),
        Gt => return Some(((l > r) as i64, 1, false, true)),
        Ge => return Some(((l >= r) as i64, 1, false, true)),
        LogAnd => return Some((((l != 0) && (r != 0)) as i64, 1, false, true)),
        LogOr => return Some((((l != 0) || (r != 0)) as i64, 1, false, true)),
    };
    result.map(|v| (v, width, both_signed, false))
}

/// Evaluates a Verilog-2005 expression to a compile-time constant
/// (spec §4.3.1).
///
/// Handles resolved literals, identifier lookup in the parameter
/// environment, binary and unary arithmetic, `$clog2`/`$unsigned`/
/// `$signed`/`$bits`, and ternary/parenthesized expressions. Emits an E209
/// diagnostic (or E214 for division by zero) and returns `None` for
/// expressions that cannot be evaluated at compile time.
pub fn eval_expr(
    expr: &v_ast::Expr,
    interner: &Interner,
    env: &ConstEnv,
    sink: &DiagnosticSink,
) -> Option<ConstValue> {
    match expr {
        v_ast::Expr::Literal { value, signed, .. } => {
            Some(ConstValue::int(
                value.to_u64().unwrap_or(0) as i64,
                value.width(),
                *signed,
            ))
        }
        v_ast::Expr::Identifier { name, span } => match env.get(name) {
            Some(val) => Some(val.clone()),
            None => {
                let name_str = interner.resolve(*name);
                sink.emit(errors::error_param_not_const(
                    &format!("unknown identifier `{name_str}`"),
                    *span,
                ));
                None
            }
        },
        v_ast::Expr::Binary { left, op, right, span } => {
            let lhs = eval_expr(left, interner, env, sink)?;
            let rhs = eval_expr(right, interner, env, sink)?;
            match apply_binop(*op, &lhs, &rhs) {
                Some((value, width, signed, force_unsigned)) => {
                    Some(ConstValue::int(value, width, signed && !force_unsigned))
                }
                None => {
                    if matches!(op, v_ast::BinaryOp::Div | v_ast::BinaryOp::Mod) {
                        sink.emit(errors::error_divide_by_zero(*span));
                    } else {
                        sink.emit(errors::error_param_not_const(
                            "arithmetic overflow or unsupported operator",
                            *span,
                        ));
                    }
                    None
                }
            }
        }
        v_ast::Expr::Unary { op, operand, span } => {
            let val = eval_expr(operand, interner, env, sink)?;
            let n = const_to_i64(&val)?;
            let width = val.width();
            use v_ast::UnaryOp::*;
            match op {
                Plus => Some(val),
                Minus => Some(ConstValue::int(-n, width, const_signed(&val))),
                LogNot => Some(ConstValue::int((n == 0) as i64, 1, false)),
                BitNot => Some(ConstValue::int(!n, width, const_signed(&val))),
                RedAnd => Some(ConstValue::int((as_unsigned(n, width) == mask(width)) as i64, 1, false)),
                RedNand => Some(ConstValue::int((as_unsigned(n, width) != mask(width)) as i64, 1, false)),
                RedOr => Some(ConstValue::int((n != 0) as i64, 1, false)),
                RedNor => Some(ConstValue::int((n == 0) as i64, 1, false)),
                RedXor => Some(ConstValue::int((n.count_ones() % 2 == 1) as i64, 1, false)),
                RedXnor => Some(ConstValue::int((n.count_ones() % 2 == 0) as i64, 1, false)),
                _ => {
                    sink.emit(errors::error_param_not_const("unsupported unary operator", *span));
                    None
                }
            }
        }
        v_ast::Expr::Ternary { condition, then_expr, else_expr, .. } => {
            let cond = eval_expr(condition, interner, env, sink)?;
            if const_to_i64(&cond)? != 0 {
                eval_expr(then_expr, interner, env, sink)
            } else {
                eval_expr(else_expr, interner, env, sink)
            }
        }
        v_ast::Expr::SystemCall { name, args, span } => {
            let func_name = interner.resolve(*name);
            match func_name {
                "$clog2" => {
                    let arg = one_arg(args, func_name, *span, sink)?;
                    let val = eval_expr(arg, interner, env, sink)?;
                    let n = const_to_i64(&val)?;
                    Some(ConstValue::int(clog2(n), 32, true))
                }
                "$unsigned" => {
                    let arg = one_arg(args, func_name, *span, sink)?;
                    let val = eval_expr(arg, interner, env, sink)?;
                    let n = const_to_i64(&val)?;
                    Some(ConstValue::int(n, val.width(), false))
                }
                "$signed" => {
                    let arg = one_arg(args, func_name, *span, sink)?;
                    let val = eval_expr(arg, interner, env, sink)?;
                    let n = const_to_i64(&val)?;
                    Some(ConstValue::int(n, val.width(), true))
                }
                "$bits" => {
                    let arg = one_arg(args, func_name, *span, sink)?;
                    let val = eval_expr(arg, interner, env, sink)?;
                    Some(ConstValue::int(val.width() as i64, 32, false))
                }
                other => {
                    sink.emit(errors::error_param_not_const(
                        &format!("unsupported system function `{other}`"),
                        *span,
                    ));
                    None
                }
            }
        }
        v_ast::Expr::Paren { inner, .. } => eval_expr(inner, interner, env, sink),
        other => {
            sink.emit(errors::error_param_not_const("non-constant expression", other.span()));
            None
        }
    }
}

fn mask(width: u32) -> i64 {
    if width == 0 || width >= 64 {
        -1
    } else {
        (1i64 << width) - 1
    }
}

fn one_arg<'a>(
    args: &'a [v_ast::Expr],
    name: &str,
    span: aion_source::Span,
    sink: &DiagnosticSink,
) -> Option<&'a v_ast::Expr> {
    if args.len() != 1 {
        sink.emit(errors::error_param_not_const(
            &format!("{name} requires exactly one argument"),
            span,
        ));
        return None;
    }
    Some(&args[0])
}

/// Evaluates a Verilog range to an `(msb, lsb)` pair of integer values
/// (spec §3.2 `Range`).
pub fn eval_range(
    range: &v_ast::Range,
    interner: &Interner,
    env: &ConstEnv,
    sink: &DiagnosticSink,
) -> Option<(i64, i64)> {
    let msb_val = eval_expr(&range.msb, interner, env, sink)?;
    let lsb_val = eval_expr(&range.lsb, interner, env, sink)?;
    let msb = const_to_i64(&msb_val)?;
    let lsb = const_to_i64(&lsb_val)?;
    Some((msb, lsb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_source::Span;

    fn literal(n: u64, width: u32, signed: bool) -> v_ast::Expr {
        v_ast::Expr::Literal {
            value: LogicVec::from_u64(n, width),
            signed,
            span: Span::DUMMY,
        }
    }

    #[test]
    fn const_to_i64_variants() {
        assert_eq!(const_to_i64(&ConstValue::int(42, 32, true)), Some(42));
        assert_eq!(const_to_i64(&ConstValue::Bool(true)), Some(1));
        assert_eq!(const_to_i64(&ConstValue::String("x".into())), None);
    }

    #[test]
    fn clog2_values() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(256), 8);
    }

    #[test]
    fn eval_decimal_literal() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let expr = literal(42, 32, true);
        assert_eq!(const_to_i64(&eval_expr(&expr, &interner, &env, &sink).unwrap()), Some(42));
    }

    #[test]
    fn eval_identifier_in_env() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let width = interner.get_or_intern("WIDTH");
        let mut env = ConstEnv::new();
        env.insert(width, ConstValue::int(8, 32, true));

        let expr = v_ast::Expr::Identifier { name: width, span: Span::DUMMY };
        let result = eval_expr(&expr, &interner, &env, &sink).unwrap();
        assert_eq!(const_to_i64(&result), Some(8));
    }

    #[test]
    fn eval_binary_add() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let expr = v_ast::Expr::Binary {
            left: Box::new(literal(10, 32, true)),
            op: v_ast::BinaryOp::Add,
            right: Box::new(literal(20, 32, true)),
            span: Span::DUMMY,
        };
        let result = eval_expr(&expr, &interner, &env, &sink).unwrap();
        assert_eq!(const_to_i64(&result), Some(30));
    }

    #[test]
    fn eval_divide_by_zero_emits_e214() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let expr = v_ast::Expr::Binary {
            left: Box::new(literal(10, 32, true)),
            op: v_ast::BinaryOp::Div,
            right: Box::new(literal(0, 32, true)),
            span: Span::DUMMY,
        };
        assert!(eval_expr(&expr, &interner, &env, &sink).is_none());
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn eval_clog2() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let clog2_name = interner.get_or_intern("$clog2");
        let expr = v_ast::Expr::SystemCall {
            name: clog2_name,
            args: vec![literal(256, 32, true)],
            span: Span::DUMMY,
        };
        let result = eval_expr(&expr, &interner, &env, &sink).unwrap();
        assert_eq!(const_to_i64(&result), Some(8));
    }

    #[test]
    fn eval_bits_of_literal() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let bits_name = interner.get_or_intern("$bits");
        let expr = v_ast::Expr::SystemCall {
            name: bits_name,
            args: vec![literal(1, 16, false)],
            span: Span::DUMMY,
        };
        let result = eval_expr(&expr, &interner, &env, &sink).unwrap();
        assert_eq!(const_to_i64(&result), Some(16));
    }

    #[test]
    fn eval_unsigned_cast_drops_sign() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let name = interner.get_or_intern("$unsigned");
        let expr = v_ast::Expr::SystemCall {
            name,
            args: vec![literal(5, 8, true)],
            span: Span::DUMMY,
        };
        let result = eval_expr(&expr, &interner, &env, &sink).unwrap();
        assert!(!const_signed(&result));
    }

    #[test]
    fn eval_ternary_picks_branch() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let expr = v_ast::Expr::Ternary {
            condition: Box::new(literal(1, 1, false)),
            then_expr: Box::new(literal(11, 32, true)),
            else_expr: Box::new(literal(22, 32, true)),
            span: Span::DUMMY,
        };
        let result = eval_expr(&expr, &interner, &env, &sink).unwrap();
        assert_eq!(const_to_i64(&result), Some(11));
    }

    #[test]
    fn eval_range_evaluates() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let range = v_ast::Range {
            msb: literal(7, 32, true),
            lsb: literal(0, 32, true),
            span: Span::DUMMY,
        };
        assert_eq!(eval_range(&range, &interner, &env, &sink), Some((7, 0)));
    }

    #[test]
    fn unknown_identifier_emits_diagnostic() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let unknown = interner.get_or_intern("MISSING");
        let expr = v_ast::Expr::Identifier { name: unknown, span: Span::DUMMY };
        let result = eval_expr(&expr, &interner, &env, &sink);
        assert!(result.is_none());
        assert!(sink.has_errors());
    }

    #[test]
    fn non_constant_expr_returns_none() {
        let interner = Interner::new();
        let env = ConstEnv::new();
        let sink = DiagnosticSink::new();
        let expr = v_ast::Expr::Concat { elements: Vec::new(), span: Span::DUMMY };
        let result = eval_expr(&expr, &interner, &env, &sink);
        assert!(result.is_none());
        assert!(sink.has_errors());
    }
}
