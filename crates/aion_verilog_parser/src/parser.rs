//! Core parser infrastructure and top-level Verilog-2005 parsing rules.
//!
//! The [`VerilogParser`] struct provides primitive operations (advance, expect, eat)
//! and error recovery, while top-level methods parse source files, modules,
//! port lists (ANSI and non-ANSI), and parameter port lists.

use crate::ast::*;
use crate::token::{ResolvedLiteral, Token, VerilogToken};
use aion_common::{Ident, Interner};
use aion_diagnostics::code::{Category, DiagnosticCode};
use aion_diagnostics::{Diagnostic, DiagnosticSink, Label, Replacement, SuggestedFix};
use aion_source::{FileId, Span};

/// A recursive descent parser for Verilog-2005 source text.
///
/// The parser consumes a token stream produced by the lexer and builds a
/// [`VerilogSourceFile`] AST. Errors are reported to the diagnostic sink and
/// represented as `Error` variants in the AST for error recovery.
pub struct VerilogParser<'src> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source: &'src str,
    #[allow(dead_code)]
    file: FileId,
    pub(crate) interner: &'src Interner,
    pub(crate) sink: &'src DiagnosticSink,
}

impl<'src> VerilogParser<'src> {
    /// Creates a new parser from a token stream produced by the lexer.
    ///
    /// The `tokens` must have been lexed from `source` for the given `file`.
    /// Identifiers are interned via `interner`, and parse errors are emitted to `sink`.
    pub fn new(
        tokens: Vec<Token>,
        source: &'src str,
        file: FileId,
        interner: &'src Interner,
        sink: &'src DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            file,
            interner,
            sink,
        }
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    /// Returns the kind of the current token.
    pub(crate) fn current(&self) -> VerilogToken {
        self.tokens[self.pos].kind
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    /// Returns the source text of the current token.
    pub(crate) fn current_text(&self) -> &'src str {
        let span = self.current_span();
        &self.source[span.start as usize..span.end as usize]
    }

    /// Returns the resolved literal value carried by the current token, if any.
    pub(crate) fn current_literal(&self) -> Option<&ResolvedLiteral> {
        self.tokens[self.pos].literal.as_ref()
    }

    /// Returns `true` if the current token matches the given kind.
    pub(crate) fn at(&self, kind: VerilogToken) -> bool {
        self.current() == kind
    }

    /// Consumes zero or more leading `(* ... *)` attribute instances, returning
    /// their raw source text.
    pub(crate) fn parse_attrs(&mut self) -> Vec<String> {
        let mut attrs = Vec::new();
        while self.at(VerilogToken::Attribute) {
            attrs.push(self.current_text().to_string());
            self.advance();
        }
        attrs
    }

    /// Returns `true` if the parser is at end of file.
    pub(crate) fn at_eof(&self) -> bool {
        self.current() == VerilogToken::Eof
    }

    /// Returns the span of the previous token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    /// Advances past the current token.
    pub(crate) fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    /// Consumes the current token if it matches the given kind. Returns `true` if consumed.
    pub(crate) fn eat(&mut self, kind: VerilogToken) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects the current token to match the given kind. Emits an error if not.
    pub(crate) fn expect(&mut self, kind: VerilogToken) {
        if !self.eat(kind) {
            self.expected_kind(kind);
        }
    }

    /// Expects and returns an identifier. Emits an error and returns a dummy if not.
    pub(crate) fn expect_ident(&mut self) -> Ident {
        if self.at(VerilogToken::Identifier) {
            let text = self.current_text();
            let ident = self.interner.get_or_intern(text);
            self.advance();
            ident
        } else {
            self.expected("identifier");
            self.interner.get_or_intern("<missing>")
        }
    }

    /// Returns `true` if the next token (after current) matches the given kind.
    pub(crate) fn peek_is(&self, kind: VerilogToken) -> bool {
        if self.pos + 1 < self.tokens.len() {
            self.tokens[self.pos + 1].kind == kind
        } else {
            false
        }
    }

    /// Returns the kind of the token at pos+offset.
    pub(crate) fn peek_kind(&self, offset: usize) -> VerilogToken {
        let idx = self.pos + offset;
        if idx < self.tokens.len() {
            self.tokens[idx].kind
        } else {
            VerilogToken::Eof
        }
    }

    // ========================================================================
    // Error handling and recovery
    // ========================================================================

    /// Emits an error diagnostic at the current position.
    pub(crate) fn error(&self, msg: &str) {
        self.sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Error, 101),
            msg,
            self.current_span(),
        ));
    }

    /// Emits an "expected X" error at the current position.
    ///
    /// Carries the offending token's source text as a label and a generic
    /// recovery suggestion — no resynchronization is attempted past the
    /// single reported error (see the design note at the call site in
    /// `parse_source_file`).
    pub(crate) fn expected(&self, what: &str) {
        self.emit_expected(what, None);
    }

    /// Emits an "expected X" error keyed on the specific token kind that was
    /// expected, attaching a [`SuggestedFix`] that inserts the missing
    /// punctuation when one is known (`;`, `)`, `]`, ... — spec §4.2/§7's
    /// "heuristic suggestion keyed to the expected-vs-got pair").
    fn expected_kind(&self, kind: VerilogToken) {
        let what = match missing_token_fix(kind) {
            Some((_, literal)) => format!("`{literal}`"),
            None => format!("{kind:?}"),
        };
        self.emit_expected(&what, Some(kind));
    }

    fn emit_expected(&self, what: &str, kind: Option<VerilogToken>) {
        let actual = format!("{:?}", self.current());
        let snippet = self.current_text();
        let span = self.current_span();
        let mut diag = Diagnostic::error(
            DiagnosticCode::new(Category::Error, 101),
            format!("expected {what}, found {actual}"),
            span,
        )
        .with_label(Label::primary(span, format!("found `{snippet}`")))
        .with_help(format!("expected {what} here"));

        if let Some(kind) = kind {
            if let Some((description, insert_text)) = missing_token_fix(kind) {
                diag = diag.with_fix(SuggestedFix {
                    message: format!("add missing {description}"),
                    replacements: vec![Replacement { span, new_text: insert_text.to_string() }],
                });
            }
        }

        self.sink.emit(diag);
    }

    /// Recovers to a semicolon, consuming everything before it (including the semicolon).
    pub(crate) fn recover_to_semicolon(&mut self) {
        while !self.at_eof() && !self.at(VerilogToken::Semicolon) {
            self.advance();
        }
        self.eat(VerilogToken::Semicolon);
    }

    // ========================================================================
    // Top-level parsing
    // ========================================================================

    /// Parses a complete Verilog source file.
    pub fn parse_source_file(&mut self) -> VerilogSourceFile {
        let start = self.current_span();
        let mut items = Vec::new();

        while !self.at_eof() {
            match self.current() {
                VerilogToken::Module => {
                    items.push(VerilogItem::Module(self.parse_module()));
                }
                _ => {
                    let span = self.current_span();
                    self.error("expected 'module'");
                    self.advance();
                    items.push(VerilogItem::Error(span));
                }
            }
        }

        let span = if items.is_empty() {
            start
        } else {
            start.merge(self.prev_span())
        };

        VerilogSourceFile { items, span }
    }

    /// Parses a module declaration.
    fn parse_module(&mut self) -> ModuleDecl {
        let start = self.current_span();
        self.expect(VerilogToken::Module);
        let name = self.expect_ident();

        // Optional parameter port list: #(...)
        let params = if self.at(VerilogToken::Hash) {
            self.parse_parameter_port_list()
        } else {
            Vec::new()
        };

        // Port list
        let (port_style, ports, port_names) = if self.at(VerilogToken::LeftParen) {
            self.parse_port_list()
        } else {
            (PortStyle::Empty, Vec::new(), Vec::new())
        };

        self.expect(VerilogToken::Semicolon);

        // Module items
        let items = self.parse_module_items();

        self.expect(VerilogToken::Endmodule);
        let span = start.merge(self.prev_span());

        ModuleDecl {
            name,
            port_style,
            params,
            ports,
            port_names,
            items,
            span,
        }
    }

    /// Parses a parameter port list: `#( param_decl {, param_decl} )`.
    fn parse_parameter_port_list(&mut self) -> Vec<ParameterDecl> {
        self.expect(VerilogToken::Hash);
        self.expect(VerilogToken::LeftParen);

        let mut params = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            // Expect `parameter` keyword
            loop {
                let param = self.parse_single_parameter_decl(false);
                params.push(param);
                if !self.eat(VerilogToken::Comma) {
                    break;
                }
            }
        }

        self.expect(VerilogToken::RightParen);
        params
    }

    /// Parses a single parameter declaration.
    pub(crate) fn parse_single_parameter_decl(&mut self, local: bool) -> ParameterDecl {
        let start = self.current_span();
        let is_local = if self.eat(VerilogToken::Localparam) {
            true
        } else {
            self.eat(VerilogToken::Parameter);
            local
        };

        let signed = self.eat(VerilogToken::Signed);
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };

        let name = self.expect_ident();

        let value = if self.eat(VerilogToken::Equals) {
            Some(self.parse_expr())
        } else {
            None
        };

        let span = start.merge(self.prev_span());
        ParameterDecl {
            local: is_local,
            signed,
            range,
            name,
            value,
            span,
        }
    }

    /// Parses a port list — detects ANSI vs non-ANSI style.
    ///
    /// ANSI: `(input a, output b)` — direction keyword after `(`
    /// Non-ANSI: `(a, b)` — just identifiers
    fn parse_port_list(&mut self) -> (PortStyle, Vec<PortDecl>, Vec<Ident>) {
        self.expect(VerilogToken::LeftParen);

        // Empty port list
        if self.at(VerilogToken::RightParen) {
            self.advance();
            return (PortStyle::Empty, Vec::new(), Vec::new());
        }

        // Detect ANSI vs non-ANSI: peek for direction keyword or net type
        if self.current().is_direction()
            || self.at(VerilogToken::Wire)
            || self.at(VerilogToken::Reg)
        {
            // ANSI-style port declarations
            let ports = self.parse_ansi_port_list();
            self.expect(VerilogToken::RightParen);
            (PortStyle::Ansi, ports, Vec::new())
        } else {
            // Non-ANSI: just identifier names
            let names = self.parse_port_name_list();
            self.expect(VerilogToken::RightParen);
            (PortStyle::NonAnsi, Vec::new(), names)
        }
    }

    /// Parses ANSI-style port declarations: `dir [type] [range] name {, name}`.
    fn parse_ansi_port_list(&mut self) -> Vec<PortDecl> {
        let mut ports = Vec::new();
        let mut current_dir = Direction::Input;

        loop {
            let start = self.current_span();

            // Direction (optional — inherits from previous)
            let dir = if self.at(VerilogToken::Input) {
                self.advance();
                current_dir = Direction::Input;
                Direction::Input
            } else if self.at(VerilogToken::Output) {
                self.advance();
                current_dir = Direction::Output;
                Direction::Output
            } else if self.at(VerilogToken::Inout) {
                self.advance();
                current_dir = Direction::Inout;
                Direction::Inout
            } else {
                current_dir
            };

            // Optional net type
            let net_type = self.eat_net_type();

            // Optional signed
            let signed = self.eat(VerilogToken::Signed);

            // Optional range
            let range = if self.at(VerilogToken::LeftBracket) {
                Some(self.parse_range())
            } else {
                None
            };

            // Names
            let mut names = Vec::new();
            names.push(self.expect_ident());
            // Allow comma-separated names with same type
            while self.at(VerilogToken::Comma) {
                // Peek ahead to see if next is a new direction/type or just another name
                let next = self.peek_kind(1);
                if next == VerilogToken::Input
                    || next == VerilogToken::Output
                    || next == VerilogToken::Inout
                    || next == VerilogToken::Wire
                    || next == VerilogToken::Reg
                {
                    break;
                }
                self.advance(); // eat comma
                if self.at(VerilogToken::Identifier) {
                    names.push(self.expect_ident());
                } else {
                    break;
                }
            }

            let span = start.merge(self.prev_span());
            ports.push(PortDecl {
                direction: dir,
                net_type,
                signed,
                range,
                names,
                span,
            });

            if !self.eat(VerilogToken::Comma) {
                break;
            }
        }

        ports
    }

    /// Parses a non-ANSI port name list: `name {, name}`.
    fn parse_port_name_list(&mut self) -> Vec<Ident> {
        let mut names = Vec::new();
        names.push(self.expect_ident());
        while self.eat(VerilogToken::Comma) {
            names.push(self.expect_ident());
        }
        names
    }

    /// Tries to consume a net type keyword, returning the type if found.
    pub(crate) fn eat_net_type(&mut self) -> Option<NetType> {
        match self.current() {
            VerilogToken::Wire => {
                self.advance();
                Some(NetType::Wire)
            }
            VerilogToken::Reg => {
                self.advance();
                Some(NetType::Reg)
            }
            VerilogToken::Integer => {
                self.advance();
                Some(NetType::Integer)
            }
            VerilogToken::Real => {
                self.advance();
                Some(NetType::Real)
            }
            VerilogToken::Tri => {
                self.advance();
                Some(NetType::Tri)
            }
            VerilogToken::Supply0 => {
                self.advance();
                Some(NetType::Supply0)
            }
            VerilogToken::Supply1 => {
                self.advance();
                Some(NetType::Supply1)
            }
            _ => None,
        }
    }

    /// Parses a range: `[ expr : expr ]`.
    pub(crate) fn parse_range(&mut self) -> Range {
        let start = self.current_span();
        self.expect(VerilogToken::LeftBracket);
        let msb = self.parse_expr();
        self.expect(VerilogToken::Colon);
        let lsb = self.parse_expr();
        self.expect(VerilogToken::RightBracket);
        let span = start.merge(self.prev_span());
        Range { msb, lsb, span }
    }

    /// Parses a comma-separated list of identifiers.
    pub(crate) fn parse_identifier_list(&mut self) -> Vec<Ident> {
        let mut names = Vec::new();
        names.push(self.expect_ident());
        while self.eat(VerilogToken::Comma) {
            names.push(self.expect_ident());
        }
        names
    }
}

/// The description and literal text to insert for a missing token of this
/// kind, for the punctuation and delimiters an `expect()` call actually
/// recovers from a single missing-token typo. Returns `None` for token
/// kinds with no single well-known insertion (keywords, literals).
fn missing_token_fix(kind: VerilogToken) -> Option<(&'static str, &'static str)> {
    match kind {
        VerilogToken::Semicolon => Some(("semicolon", ";")),
        VerilogToken::RightParen => Some(("closing parenthesis", ")")),
        VerilogToken::LeftParen => Some(("opening parenthesis", "(")),
        VerilogToken::RightBracket => Some(("closing bracket", "]")),
        VerilogToken::LeftBracket => Some(("opening bracket", "[")),
        VerilogToken::RightBrace => Some(("closing brace", "}")),
        VerilogToken::LeftBrace => Some(("opening brace", "{")),
        VerilogToken::Colon => Some(("colon", ":")),
        VerilogToken::Comma => Some(("comma", ",")),
        VerilogToken::Endmodule => Some(("`endmodule`", "endmodule")),
        _ => None,
    }
}
