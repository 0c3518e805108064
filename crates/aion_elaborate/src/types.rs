//! Resolution of Verilog net/variable declarations to `(width, signed)`.
//!
//! The IR carries no separate type database (spec §3.3): every net and pin
//! is just a bit width, so resolution here only needs to fold a declared
//! range and signed flag into a concrete width.

use aion_diagnostics::DiagnosticSink;
use aion_common::Interner;
use aion_verilog_parser::ast::{NetType, Range};

use crate::const_eval::{self, ConstEnv};

/// The width (in bits) and signedness of a declared net or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedType {
    /// Number of bits.
    pub width: u32,
    /// Whether arithmetic on this value should be treated as signed.
    pub signed: bool,
}

/// Resolves a `[msb:lsb]` range and signed flag to a width (spec §3.2).
///
/// No range is a single bit. A range `[N:M]` is `|N - M| + 1` bits. Falls
/// back to a 1-bit unsigned type (with the error already reported by
/// `const_eval`) if the range cannot be constant-folded.
pub fn resolve_range(
    range: Option<&Range>,
    signed: bool,
    env: &ConstEnv,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> ResolvedType {
    match range {
        None => ResolvedType { width: 1, signed },
        Some(r) => match const_eval::eval_range(r, interner, env, sink) {
            Some((msb, lsb)) => ResolvedType {
                width: (msb - lsb).unsigned_abs() as u32 + 1,
                signed,
            },
            None => ResolvedType { width: 1, signed },
        },
    }
}

/// Resolves a Verilog net type (`wire`, `reg`, `integer`, `real`, `event`,
/// `time`) plus optional range to a width.
///
/// `integer` and `time` are fixed 32/64-bit signed/unsigned values per IEEE
/// 1364-2005 §5; `real` is represented at 64 bits for `$bits` purposes only
/// (arithmetic on `real` values is outside the synthesizable subset and is
/// reported via `error_unsupported` at its use site, not here).
pub fn resolve_net_type(
    net_type: Option<&NetType>,
    range: Option<&Range>,
    signed: bool,
    env: &ConstEnv,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> ResolvedType {
    match net_type {
        Some(NetType::Integer) => ResolvedType { width: 32, signed: true },
        Some(NetType::Real) => ResolvedType { width: 64, signed: true },
        Some(NetType::Time) => ResolvedType { width: 64, signed: false },
        Some(NetType::Event) | Some(NetType::Realtime) => ResolvedType { width: 1, signed: false },
        _ => resolve_range(range, signed, env, interner, sink),
    }
}
