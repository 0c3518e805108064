//! Module registry for scanning parsed Verilog ASTs and mapping module names
//! to declarations.

use std::collections::HashMap;

use aion_common::{Ident, Interner};
use aion_diagnostics::DiagnosticSink;
use aion_source::Span;
use aion_verilog_parser::ast::{FunctionDecl, ModuleDecl, ModuleItem, VerilogItem, VerilogSourceFile};

use crate::errors;

/// A reference to a module declaration, borrowed from the parsed source files.
pub type ModuleEntry<'a> = &'a ModuleDecl;

/// Registry of all module declarations across all parsed source files.
///
/// Provides O(1) lookup by interned name and detects duplicate definitions.
pub struct ModuleRegistry<'a> {
    modules: HashMap<Ident, &'a ModuleDecl>,
    first_span: HashMap<Ident, Span>,
    /// Modules in declaration order, used to pick a default top module.
    order: Vec<Ident>,
    /// Function declarations gathered from every module's items, keyed by
    /// function name, consulted when lowering a function call expression.
    functions: HashMap<Ident, &'a FunctionDecl>,
}

impl<'a> ModuleRegistry<'a> {
    /// Builds a module registry from parsed source files.
    ///
    /// Emits `E202` diagnostics for duplicate module names.
    pub fn from_parsed_design(
        files: &'a [VerilogSourceFile],
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> Self {
        let mut reg = Self {
            modules: HashMap::new(),
            first_span: HashMap::new(),
            order: Vec::new(),
            functions: HashMap::new(),
        };
        for file in files {
            for item in &file.items {
                if let VerilogItem::Module(decl) = item {
                    reg.register(decl, interner, sink);
                }
            }
        }
        reg
    }

    fn register(&mut self, decl: &'a ModuleDecl, interner: &Interner, sink: &DiagnosticSink) {
        let name = decl.name;
        if let Some(&prev_span) = self.first_span.get(&name) {
            sink.emit(errors::error_duplicate_module(
                interner.resolve(name),
                decl.span,
                prev_span,
            ));
        } else {
            self.modules.insert(name, decl);
            self.first_span.insert(name, decl.span);
            self.order.push(name);
            for item in &decl.items {
                if let ModuleItem::FunctionDecl(func) = item {
                    self.functions.entry(func.name).or_insert(func);
                }
            }
        }
    }

    /// Looks up a module by name.
    pub fn lookup(&self, name: Ident) -> Option<ModuleEntry<'a>> {
        self.modules.get(&name).copied()
    }

    /// Looks up a function declaration by name, gathered from every
    /// registered module's items (spec §4.3.3 function call lowering).
    pub fn lookup_function(&self, name: Ident) -> Option<&'a FunctionDecl> {
        self.functions.get(&name).copied()
    }

    /// Returns the source span of a module's declaration, if found.
    pub fn span_of(&self, name: Ident) -> Option<Span> {
        self.first_span.get(&name).copied()
    }

    /// Returns the name of the last module defined, used as the default top
    /// module when none is specified (spec §4.3 "defaulting to the last
    /// module defined").
    pub fn default_top(&self) -> Option<Ident> {
        self.order.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_common::Interner;
    use aion_diagnostics::DiagnosticSink;
    use aion_source::Span;
    use aion_verilog_parser::ast::PortStyle;

    fn dummy_module(name: Ident) -> ModuleDecl {
        ModuleDecl {
            name,
            port_style: PortStyle::Empty,
            params: vec![],
            ports: vec![],
            port_names: vec![],
            items: vec![],
            attrs: vec![],
            span: Span::DUMMY,
        }
    }

    #[test]
    fn empty_registry() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let reg = ModuleRegistry::from_parsed_design(&[], &interner, &sink);
        let unknown = interner.get_or_intern("unknown");
        assert!(reg.lookup(unknown).is_none());
        assert!(reg.span_of(unknown).is_none());
        assert!(reg.default_top().is_none());
    }

    #[test]
    fn registers_module() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let name = interner.get_or_intern("counter");
        let file = VerilogSourceFile {
            items: vec![VerilogItem::Module(dummy_module(name))],
            span: Span::DUMMY,
        };
        let files = [file];
        let reg = ModuleRegistry::from_parsed_design(&files, &interner, &sink);
        assert!(reg.lookup(name).is_some());
    }

    #[test]
    fn duplicate_module_emits_diagnostic() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let name = interner.get_or_intern("dup");
        let file = VerilogSourceFile {
            items: vec![
                VerilogItem::Module(dummy_module(name)),
                VerilogItem::Module(dummy_module(name)),
            ],
            span: Span::DUMMY,
        };
        let files = [file];
        let _reg = ModuleRegistry::from_parsed_design(&files, &interner, &sink);
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn default_top_is_last_declared() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let a = interner.get_or_intern("a");
        let b = interner.get_or_intern("b");
        let file = VerilogSourceFile {
            items: vec![
                VerilogItem::Module(dummy_module(a)),
                VerilogItem::Module(dummy_module(b)),
            ],
            span: Span::DUMMY,
        };
        let files = [file];
        let reg = ModuleRegistry::from_parsed_design(&files, &interner, &sink);
        assert_eq!(reg.default_top(), Some(b));
    }

    #[test]
    fn lookup_function_finds_declared_function() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mod_name = interner.get_or_intern("top");
        let func_name = interner.get_or_intern("clog2");
        let func = FunctionDecl {
            automatic: false,
            signed: false,
            range: None,
            name: func_name,
            inputs: vec![],
            decls: vec![],
            body: vec![],
            attrs: vec![],
            span: Span::DUMMY,
        };
        let mut module = dummy_module(mod_name);
        module.items.push(ModuleItem::FunctionDecl(func));
        let file = VerilogSourceFile {
            items: vec![VerilogItem::Module(module)],
            span: Span::DUMMY,
        };
        let files = [file];
        let reg = ModuleRegistry::from_parsed_design(&files, &interner, &sink);
        assert!(reg.lookup_function(func_name).is_some());
        let unknown = interner.get_or_intern("missing_func");
        assert!(reg.lookup_function(unknown).is_none());
    }

    #[test]
    fn lookup_miss_returns_none() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let name = interner.get_or_intern("counter");
        let file = VerilogSourceFile {
            items: vec![VerilogItem::Module(dummy_module(name))],
            span: Span::DUMMY,
        };
        let files = [file];
        let reg = ModuleRegistry::from_parsed_design(&files, &interner, &sink);
        let other = interner.get_or_intern("other");
        assert!(reg.lookup(other).is_none());
    }
}
