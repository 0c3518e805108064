//! Diagnostic codes and helper functions for elaboration errors and warnings.
//!
//! Error codes `E200`--`E214` cover elaboration failures (unknown modules,
//! duplicate signals, combinational cycles, etc.). Warning codes `W200`--
//! `W202` cover non-fatal issues (width mismatches, unconnected ports,
//! inferred latches).

use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};
use aion_source::Span;

/// Unknown module referenced in instantiation.
pub const E200: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 200,
};

/// Port count or name mismatch in instantiation.
pub const E201: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 201,
};

/// Duplicate module name across source files.
pub const E202: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 202,
};

/// Duplicate signal name within a module.
pub const E203: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 203,
};

/// Reference to an unknown signal.
pub const E204: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 204,
};

/// Type mismatch in assignment or connection.
pub const E205: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 205,
};

/// Top-level module not found in any source file.
pub const E206: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 206,
};

/// Circular instantiation detected.
pub const E207: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 207,
};

/// Unknown port name in instantiation connection.
pub const E208: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 208,
};

/// Parameter constant-expression evaluation failure.
pub const E209: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 209,
};

/// Unsupported construct within the synthesizable subset.
pub const E210: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 210,
};

/// Combinational cycle detected during elaboration.
pub const E212: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 212,
};

/// Multiple drivers found for the same net.
pub const E213: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 213,
};

/// Divide-by-zero encountered during constant evaluation.
pub const E214: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 214,
};

/// Width mismatch in assignment or connection.
pub const W200: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 200,
};

/// Unconnected port in instantiation.
pub const W201: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 201,
};

/// A latch was inferred from an incomplete conditional assignment.
pub const W202: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 202,
};

/// Creates a diagnostic for an unknown module in an instantiation.
pub fn error_unknown_module(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E200, format!("unknown module `{name}`"), span)
        .with_help("check that the module is defined in the source files")
}

/// Creates a diagnostic for a missing top-level module.
pub fn error_top_not_found(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E206, format!("top-level module `{name}` not found"), span)
        .with_help("set `top` in aion.toml to the name of an existing module")
}

/// Creates a diagnostic for a duplicate module name.
pub fn error_duplicate_module(name: &str, span: Span, prev_span: Span) -> Diagnostic {
    Diagnostic::error(E202, format!("duplicate module `{name}`"), span)
        .with_label(Label::secondary(prev_span, "previously defined here"))
}

/// Creates a diagnostic for a duplicate signal name within a module.
pub fn error_duplicate_signal(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E203, format!("duplicate signal `{name}`"), span)
}

/// Creates a diagnostic for an unknown signal reference.
pub fn error_unknown_signal(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E204, format!("unknown signal `{name}`"), span)
}

/// Creates a diagnostic for a circular instantiation.
pub fn error_circular_instantiation(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E207, format!("circular instantiation of module `{name}`"), span)
        .with_note("the module directly or indirectly instantiates itself")
}

/// Creates a diagnostic when a parameter cannot be constant-evaluated.
pub fn error_param_not_const(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E209, format!("cannot evaluate constant expression: {msg}"), span)
}

/// Creates a diagnostic for an unsupported construct.
pub fn error_unsupported(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E210, format!("unsupported construct: {what}"), span)
        .with_note("outside the synthesizable subset this front end targets")
}

/// Creates a diagnostic for a port mismatch in instantiation.
pub fn error_port_mismatch(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E201, msg.to_string(), span)
}

/// Creates a diagnostic for an unknown port in an instantiation.
pub fn error_unknown_port(port_name: &str, module_name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E208,
        format!("unknown port `{port_name}` on module `{module_name}`"),
        span,
    )
}

/// Creates a diagnostic for a combinational cycle, naming its member cells.
pub fn error_combinational_cycle(cell_names: &[String], span: Span) -> Diagnostic {
    Diagnostic::error(
        E212,
        format!("combinational cycle through: {}", cell_names.join(" -> ")),
        span,
    )
    .with_help("break the cycle with a registered (clocked) stage")
}

/// Creates a diagnostic for a net driven by more than one source.
pub fn error_multi_driver(net_name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E213, format!("net `{net_name}` has more than one driver"), span)
}

/// Creates a diagnostic for divide-by-zero in constant evaluation.
pub fn error_divide_by_zero(span: Span) -> Diagnostic {
    Diagnostic::error(E214, "division by zero in constant expression", span)
}

/// Creates a warning for a width mismatch.
pub fn warn_width_mismatch(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(W200, msg.to_string(), span)
}

/// Creates a warning for an unconnected port.
pub fn warn_unconnected_port(port_name: &str, instance_name: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W201,
        format!("port `{port_name}` is unconnected on instance `{instance_name}`"),
        span,
    )
}

/// Creates a warning for an inferred latch from an incomplete conditional.
pub fn warn_inferred_latch(signal_name: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W202,
        format!("latch inferred for `{signal_name}` — not all branches assign it"),
        span,
    )
    .with_help("assign a default value before the conditional, or add an `else`/`default` branch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E200}"), "E200");
        assert_eq!(format!("{E206}"), "E206");
        assert_eq!(format!("{W200}"), "W200");
        assert_eq!(format!("{W201}"), "W201");
    }

    #[test]
    fn unknown_module_diagnostic() {
        let d = error_unknown_module("counter", Span::DUMMY);
        assert_eq!(d.code, E200);
        assert!(d.message.contains("counter"));
    }

    #[test]
    fn top_not_found_diagnostic() {
        let d = error_top_not_found("top", Span::DUMMY);
        assert_eq!(d.code, E206);
        assert!(d.message.contains("top"));
    }

    #[test]
    fn duplicate_module_diagnostic() {
        let d = error_duplicate_module("counter", Span::DUMMY, Span::DUMMY);
        assert_eq!(d.code, E202);
        assert_eq!(d.labels.len(), 1);
    }

    #[test]
    fn circular_instantiation_diagnostic() {
        let d = error_circular_instantiation("top", Span::DUMMY);
        assert_eq!(d.code, E207);
        assert!(!d.notes.is_empty());
    }

    #[test]
    fn combinational_cycle_diagnostic() {
        let d = error_combinational_cycle(&["g1".to_string(), "g2".to_string()], Span::DUMMY);
        assert_eq!(d.code, E212);
        assert!(d.message.contains("g1 -> g2"));
    }

    #[test]
    fn multi_driver_diagnostic() {
        let d = error_multi_driver("n1", Span::DUMMY);
        assert_eq!(d.code, E213);
    }

    #[test]
    fn divide_by_zero_diagnostic() {
        let d = error_divide_by_zero(Span::DUMMY);
        assert_eq!(d.code, E214);
    }

    #[test]
    fn inferred_latch_warning() {
        let d = warn_inferred_latch("q", Span::DUMMY);
        assert_eq!(d.code, W202);
        assert!(d.message.contains('q'));
    }

    #[test]
    fn port_mismatch_diagnostic() {
        let d = error_port_mismatch("expected 3 ports, found 2", Span::DUMMY);
        assert_eq!(d.code, E201);
    }

    #[test]
    fn unknown_port_diagnostic() {
        let d = error_unknown_port("data", "counter", Span::DUMMY);
        assert_eq!(d.code, E208);
        assert!(d.message.contains("data"));
        assert!(d.message.contains("counter"));
    }
}
