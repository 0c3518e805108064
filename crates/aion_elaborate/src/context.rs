//! Mutable elaboration state for recursive module elaboration.
//!
//! [`ElaborationContext`] holds the [`Netlist`] under construction, the
//! module registry, a cache of already-elaborated modules (keyed by name +
//! parameter values), and the current elaboration stack for cycle detection.

use std::collections::HashMap;

use aion_common::{ContentHash, Ident, Interner};
use aion_diagnostics::DiagnosticSink;
use aion_ir::Netlist;
use aion_source::SourceDb;

use crate::const_eval::ConstValue;
use crate::errors;
use crate::registry::ModuleRegistry;

/// Cache key: module name + sorted parameter bindings, hashed together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    /// The module name.
    name: Ident,
    /// Hash of the parameter bindings (sorted by name for determinism).
    param_hash: ContentHash,
}

/// Mutable state carried through recursive elaboration.
///
/// Owns the [`Netlist`] under construction (spec §3.3) and provides helpers
/// for caching resolved parameterizations, cycle detection across
/// instantiation, and name-prefix bookkeeping during hierarchy flattening
/// (spec §4.3.4 "flatten with `instance_name.` prefix").
pub struct ElaborationContext<'a> {
    /// The netlist being built, flattened in place as instances are inlined.
    pub netlist: Netlist,
    /// The module registry providing name-to-declaration lookup.
    pub registry: &'a ModuleRegistry<'a>,
    /// The string interner shared with the parser.
    pub interner: &'a Interner,
    /// The source database for snippet access.
    pub source_db: &'a SourceDb,
    /// The diagnostic sink for error reporting.
    pub sink: &'a DiagnosticSink,
    /// Cache recording which (module, params) combinations have already
    /// been elaborated, to detect re-instantiation of identical
    /// parameterizations without redoing constant folding.
    cache: HashMap<CacheKey, ()>,
    /// Stack of module names currently being elaborated (for cycle detection).
    elab_stack: Vec<Ident>,
    /// Counter for generating unique names for compiler-synthesized nets and
    /// cells (slice temporaries, mux trees, memory ports, ...).
    tmp_counter: u32,
}

impl<'a> ElaborationContext<'a> {
    /// Creates a new elaboration context around an empty netlist named for
    /// the top module.
    pub fn new(
        top_name: Ident,
        registry: &'a ModuleRegistry<'a>,
        interner: &'a Interner,
        source_db: &'a SourceDb,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            netlist: Netlist::new(top_name),
            registry,
            interner,
            source_db,
            sink,
            cache: HashMap::new(),
            elab_stack: Vec::new(),
            tmp_counter: 0,
        }
    }

    /// Generates a unique name for a compiler-synthesized net or cell, e.g.
    /// `fresh_name("slice")` -> `"$slice$3"`.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        let n = self.tmp_counter;
        self.tmp_counter += 1;
        format!("${prefix}${n}")
    }

    /// Checks whether this (module, parameter-bindings) pair has already
    /// been elaborated once before.
    pub fn check_cache(&self, name: Ident, params: &[(Ident, ConstValue)]) -> bool {
        let key = CacheKey {
            name,
            param_hash: hash_params(params),
        };
        self.cache.contains_key(&key)
    }

    /// Records that this (module, parameter-bindings) pair has been
    /// elaborated.
    pub fn insert_cache(&mut self, name: Ident, params: &[(Ident, ConstValue)]) {
        let key = CacheKey {
            name,
            param_hash: hash_params(params),
        };
        self.cache.insert(key, ());
    }

    /// Pushes a module name onto the elaboration stack.
    ///
    /// Returns `false` if the module is already on the stack (cycle
    /// detected), emitting an `E207` diagnostic.
    pub fn push_elab_stack(&mut self, name: Ident, span: aion_source::Span) -> bool {
        if self.elab_stack.contains(&name) {
            self.sink.emit(errors::error_circular_instantiation(
                self.interner.resolve(name),
                span,
            ));
            return false;
        }
        self.elab_stack.push(name);
        true
    }

    /// Pops the most recent module name from the elaboration stack.
    pub fn pop_elab_stack(&mut self) {
        self.elab_stack.pop();
    }
}

/// Computes a deterministic hash over sorted parameter bindings.
fn hash_params(params: &[(Ident, ConstValue)]) -> ContentHash {
    use std::hash::Hash;

    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| name.as_raw());

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for (name, val) in &sorted {
        name.as_raw().hash(&mut hasher);
        match val {
            ConstValue::Int { value, width, signed } => {
                0u8.hash(&mut hasher);
                value.hash(&mut hasher);
                width.hash(&mut hasher);
                signed.hash(&mut hasher);
            }
            ConstValue::Real(f) => {
                1u8.hash(&mut hasher);
                f.to_bits().hash(&mut hasher);
            }
            ConstValue::Logic(lv) => {
                2u8.hash(&mut hasher);
                lv.width().hash(&mut hasher);
            }
            ConstValue::String(s) => {
                3u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
            ConstValue::Bool(b) => {
                4u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
        }
    }
    let h = std::hash::Hasher::finish(&hasher);
    ContentHash::from_bytes(&h.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::Interner;
    use aion_diagnostics::DiagnosticSink;
    use aion_source::{SourceDb, Span};

    fn make_ctx() -> (Interner, SourceDb, DiagnosticSink) {
        (Interner::new(), SourceDb::new(), DiagnosticSink::new())
    }

    #[test]
    fn context_construction() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        assert_eq!(ctx.netlist.cells.len(), 0);
    }

    #[test]
    fn cache_miss_then_hit() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let mut ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        let name = interner.get_or_intern("counter");
        assert!(!ctx.check_cache(name, &[]));
        ctx.insert_cache(name, &[]);
        assert!(ctx.check_cache(name, &[]));
    }

    #[test]
    fn cache_different_params_different_entries() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let mut ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        let name = interner.get_or_intern("counter");
        let width = interner.get_or_intern("WIDTH");

        let val8 = ConstValue::Int { value: 8, width: 32, signed: false };
        let val16 = ConstValue::Int { value: 16, width: 32, signed: false };
        ctx.insert_cache(name, &[(width, val8.clone())]);
        assert!(ctx.check_cache(name, &[(width, val8)]));
        assert!(!ctx.check_cache(name, &[(width, val16)]));
    }

    #[test]
    fn elab_stack_push_pop() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let mut ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        let name = interner.get_or_intern("top");
        assert!(ctx.push_elab_stack(name, Span::DUMMY));
        ctx.pop_elab_stack();
    }

    #[test]
    fn elab_stack_cycle_detection() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let mut ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        let name = interner.get_or_intern("top");
        assert!(ctx.push_elab_stack(name, Span::DUMMY));
        assert!(!ctx.push_elab_stack(name, Span::DUMMY));
        assert!(sink.has_errors());
    }

    #[test]
    fn fresh_name_is_unique() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let mut ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        let a = ctx.fresh_name("slice");
        let b = ctx.fresh_name("slice");
        assert_ne!(a, b);
    }

    #[test]
    fn elab_stack_no_false_positive() {
        let (interner, source_db, sink) = make_ctx();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let top = interner.get_or_intern("top");
        let mut ctx = ElaborationContext::new(top, &reg, &interner, &source_db, &sink);
        let a = interner.get_or_intern("a");
        let b = interner.get_or_intern("b");
        assert!(ctx.push_elab_stack(a, Span::DUMMY));
        assert!(ctx.push_elab_stack(b, Span::DUMMY));
        ctx.pop_elab_stack();
        ctx.pop_elab_stack();
        assert!(ctx.push_elab_stack(a, Span::DUMMY));
        assert!(!sink.has_errors());
    }
}
