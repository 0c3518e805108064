//! Lexical analyzer for Verilog-2005 source text.
//!
//! Converts source text into a sequence of [`Token`]s, handling case-sensitive
//! keywords, sized/based literals (`4'b1010`) resolved to [`LogicVec`] values at
//! lex time, string literals with C-style escapes, line and block comments,
//! attribute instances (`(* ... *)`), system identifiers, and compiler
//! directives (discarded, not yet supported). Errors are reported to the
//! [`DiagnosticSink`] and produce [`VerilogToken::Error`] tokens.

use crate::token::{lookup_keyword, ResolvedLiteral, Token, VerilogToken};
use aion_common::{Logic, LogicVec};
use aion_diagnostics::code::{Category, DiagnosticCode};
use aion_diagnostics::{Diagnostic, DiagnosticSink};
use aion_source::{FileId, Span};

/// The width given to an unsized decimal literal absent an explicit base
/// (IEEE 1364-2005 §5: `integer` and bare decimal constants are 32 bits).
const DEFAULT_LITERAL_WIDTH: u32 = 32;

/// Lexes the given Verilog source text into a vector of tokens.
///
/// Whitespace and comments are skipped. The returned vector always ends with
/// a [`VerilogToken::Eof`] token. Lexer errors are reported via the diagnostic
/// sink and produce [`VerilogToken::Error`] tokens in the output.
pub fn lex(source: &str, file: FileId, sink: &DiagnosticSink) -> Vec<Token> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        file,
        sink,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    file: FileId,
    sink: &'a DiagnosticSink,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                tokens.push(Token::new(
                    VerilogToken::Eof,
                    Span::new(self.file, self.pos as u32, self.pos as u32),
                ));
                break;
            }
            tokens.push(self.next_token());
        }
        tokens
    }

    fn peek(&self) -> u8 {
        if self.pos < self.source.len() {
            self.source[self.pos]
        } else {
            0
        }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.source.len() {
            self.source[idx]
        } else {
            0
        }
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        b
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file, start as u32, self.pos as u32)
    }

    fn text_from(&self, start: usize) -> &str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("")
    }

    fn error(&self, msg: &str, span: Span) {
        self.sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Error, 100),
            msg,
            span,
        ));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.source.len() {
                return;
            }
            // Line comment: //
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                self.pos += 2;
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            // Block comment: /* ... */ (non-nesting in Verilog)
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos >= self.source.len() {
                        self.error("unterminated block comment", self.span_from(start));
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.peek_at(1) == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            // Compiler directive: `identifier. Not supported; discard the
            // rest of the line silently so line alignment is preserved.
            if self.peek() == b'`' {
                self.pos += 1;
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let b = self.peek();

        // Attribute instance: (* ... *)
        if b == b'(' && self.peek_at(1) == b'*' {
            return self.lex_attribute(start);
        }

        // Identifiers and keywords
        if is_ident_start(b) {
            return self.lex_identifier_or_keyword(start);
        }

        // System identifier: $name
        if b == b'$' {
            return self.lex_system_identifier(start);
        }

        // Numeric literals (possibly sized: 4'b1010)
        if b.is_ascii_digit() {
            return self.lex_number(start);
        }

        // Unsized based literal: 'b1010, 'hFF etc. (tick without preceding digits)
        if b == b'\'' && self.pos + 1 < self.source.len() {
            let next = self.peek_at(1).to_ascii_lowercase();
            if matches!(next, b'b' | b'o' | b'd' | b'h' | b's') {
                return self.lex_unsized_based_literal(start);
            }
        }

        // String literal
        if b == b'"' {
            return self.lex_string(start);
        }

        // Operators and punctuation
        self.lex_operator(start)
    }

    fn lex_attribute(&mut self, start: usize) -> Token {
        self.pos += 2; // skip (*
        loop {
            if self.pos >= self.source.len() {
                self.error("unterminated attribute instance", self.span_from(start));
                return Token::new(VerilogToken::Error, self.span_from(start));
            }
            if self.source[self.pos] == b'*' && self.peek_at(1) == b')' {
                self.pos += 2;
                return Token::new(VerilogToken::Attribute, self.span_from(start));
            }
            self.pos += 1;
        }
    }

    fn lex_identifier_or_keyword(&mut self, start: usize) -> Token {
        while self.pos < self.source.len() && is_ident_char(self.source[self.pos]) {
            self.pos += 1;
        }

        let text = self.text_from(start);
        let kind = lookup_keyword(text).unwrap_or(VerilogToken::Identifier);

        Token::new(kind, self.span_from(start))
    }

    fn lex_system_identifier(&mut self, start: usize) -> Token {
        self.pos += 1; // skip $
        if self.pos < self.source.len() && is_ident_start(self.source[self.pos]) {
            while self.pos < self.source.len() && is_ident_char(self.source[self.pos]) {
                self.pos += 1;
            }
            Token::new(VerilogToken::SystemIdentifier, self.span_from(start))
        } else {
            self.error("expected identifier after '$'", self.span_from(start));
            Token::new(VerilogToken::Error, self.span_from(start))
        }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        let digits_start = self.pos;
        self.eat_decimal_digits();
        let unsized_digits = self.text_from(digits_start).to_string();

        // Check for sized literal: digits ' [s] base digits
        if self.pos < self.source.len() && self.source[self.pos] == b'\'' {
            let next = if self.pos + 1 < self.source.len() {
                self.source[self.pos + 1].to_ascii_lowercase()
            } else {
                0
            };
            let signed = next == b's';
            let base_offset = if signed { 2 } else { 1 };
            let base = self.peek_at(base_offset).to_ascii_lowercase();
            if matches!(base, b'b' | b'o' | b'd' | b'h') {
                let width = unsized_digits.parse::<u32>().unwrap_or(DEFAULT_LITERAL_WIDTH);
                self.pos += base_offset + 1;
                let digit_start = self.pos;
                self.eat_based_digits(base);
                let digits = self.text_from(digit_start).to_string();
                let value = digits_to_logic_vec(&digits, base, width);
                return Token::with_literal(
                    VerilogToken::SizedLiteral,
                    self.span_from(start),
                    value,
                    signed,
                );
            }
        }

        // Real literal: digits.digits
        if self.pos < self.source.len()
            && self.source[self.pos] == b'.'
            && self.pos + 1 < self.source.len()
            && self.source[self.pos + 1].is_ascii_digit()
        {
            self.pos += 1;
            self.eat_decimal_digits();
            self.eat_exponent();
            return Token::new(VerilogToken::RealLiteral, self.span_from(start));
        }

        // Optional exponent for integer (1e3 is real in Verilog)
        if self.pos < self.source.len()
            && (self.source[self.pos] == b'e' || self.source[self.pos] == b'E')
        {
            self.eat_exponent();
            return Token::new(VerilogToken::RealLiteral, self.span_from(start));
        }

        let value = decimal_digits_to_logic_vec(&unsized_digits, DEFAULT_LITERAL_WIDTH);
        Token::with_literal(VerilogToken::IntLiteral, self.span_from(start), value, true)
    }

    /// Lex an unsized based literal starting with tick: `'b1010`, `'hFF`, `'sb1010`
    fn lex_unsized_based_literal(&mut self, start: usize) -> Token {
        self.pos += 1; // skip '
        let next = self.source[self.pos].to_ascii_lowercase();
        let signed = next == b's';
        if signed {
            self.pos += 1;
        }
        let base = self.source[self.pos].to_ascii_lowercase();
        self.pos += 1;
        let digit_start = self.pos;
        self.eat_based_digits(base);
        let digits = self.text_from(digit_start).to_string();
        let value = digits_to_logic_vec(&digits, base, DEFAULT_LITERAL_WIDTH);
        Token::with_literal(VerilogToken::SizedLiteral, self.span_from(start), value, signed)
    }

    fn eat_decimal_digits(&mut self) {
        while self.pos < self.source.len() {
            let ch = self.source[self.pos];
            if ch.is_ascii_digit() || ch == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn eat_based_digits(&mut self, base: u8) {
        while self.pos < self.source.len() {
            let ch = self.source[self.pos].to_ascii_lowercase();
            let valid = match base {
                b'b' => matches!(ch, b'0' | b'1' | b'x' | b'z' | b'?' | b'_'),
                b'o' => matches!(ch, b'0'..=b'7' | b'x' | b'z' | b'?' | b'_'),
                b'd' => ch.is_ascii_digit() || ch == b'_',
                b'h' => ch.is_ascii_hexdigit() || matches!(ch, b'x' | b'z' | b'?' | b'_'),
                _ => false,
            };
            if valid {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn eat_exponent(&mut self) {
        if self.pos < self.source.len()
            && (self.source[self.pos] == b'e' || self.source[self.pos] == b'E')
        {
            self.pos += 1;
            if self.pos < self.source.len()
                && (self.source[self.pos] == b'+' || self.source[self.pos] == b'-')
            {
                self.pos += 1;
            }
            self.eat_decimal_digits();
        }
    }

    fn lex_string(&mut self, start: usize) -> Token {
        self.pos += 1; // skip opening "
        loop {
            if self.pos >= self.source.len() || self.source[self.pos] == b'\n' {
                self.error("unterminated string literal", self.span_from(start));
                return Token::new(VerilogToken::Error, self.span_from(start));
            }
            if self.source[self.pos] == b'\\' {
                self.pos += 2;
                continue;
            }
            if self.source[self.pos] == b'"' {
                self.pos += 1;
                return Token::new(VerilogToken::StringLiteral, self.span_from(start));
            }
            self.pos += 1;
        }
    }

    fn lex_operator(&mut self, start: usize) -> Token {
        let b = self.advance();
        let kind = match b {
            b'(' => VerilogToken::LeftParen,
            b')' => VerilogToken::RightParen,
            b'[' => VerilogToken::LeftBracket,
            b']' => VerilogToken::RightBracket,
            b'{' => VerilogToken::LeftBrace,
            b'}' => VerilogToken::RightBrace,
            b',' => VerilogToken::Comma,
            b';' => VerilogToken::Semicolon,
            b':' => VerilogToken::Colon,
            b'.' => VerilogToken::Dot,
            b'#' => VerilogToken::Hash,
            b'@' => VerilogToken::At,
            b'?' => VerilogToken::Question,
            b'=' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    if self.peek() == b'=' {
                        self.pos += 1;
                        VerilogToken::TripleEquals
                    } else {
                        VerilogToken::DoubleEquals
                    }
                } else if self.peek() == b'>' {
                    self.pos += 1;
                    VerilogToken::FatArrow
                } else {
                    VerilogToken::Equals
                }
            }
            b'!' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    if self.peek() == b'=' {
                        self.pos += 1;
                        VerilogToken::BangDoubleEquals
                    } else {
                        VerilogToken::BangEquals
                    }
                } else {
                    VerilogToken::Bang
                }
            }
            b'<' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    VerilogToken::LessEquals
                } else if self.peek() == b'<' {
                    self.pos += 1;
                    if self.peek() == b'<' {
                        self.pos += 1;
                        VerilogToken::TripleLess
                    } else {
                        VerilogToken::DoubleLess
                    }
                } else {
                    VerilogToken::LessThan
                }
            }
            b'>' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    VerilogToken::GreaterEquals
                } else if self.peek() == b'>' {
                    self.pos += 1;
                    if self.peek() == b'>' {
                        self.pos += 1;
                        VerilogToken::TripleGreater
                    } else {
                        VerilogToken::DoubleGreater
                    }
                } else {
                    VerilogToken::GreaterThan
                }
            }
            b'+' => {
                if self.peek() == b':' {
                    self.pos += 1;
                    VerilogToken::PlusColon
                } else {
                    VerilogToken::Plus
                }
            }
            b'-' => {
                if self.peek() == b':' {
                    self.pos += 1;
                    VerilogToken::MinusColon
                } else if self.peek() == b'>' {
                    self.pos += 1;
                    VerilogToken::Arrow
                } else {
                    VerilogToken::Minus
                }
            }
            b'*' => {
                if self.peek() == b'*' {
                    self.pos += 1;
                    VerilogToken::DoubleStar
                } else {
                    VerilogToken::Star
                }
            }
            b'/' => VerilogToken::Slash,
            b'%' => VerilogToken::Percent,
            b'&' => {
                if self.peek() == b'&' {
                    self.pos += 1;
                    VerilogToken::DoubleAmpersand
                } else {
                    VerilogToken::Ampersand
                }
            }
            b'|' => {
                if self.peek() == b'|' {
                    self.pos += 1;
                    VerilogToken::DoublePipe
                } else {
                    VerilogToken::Pipe
                }
            }
            b'^' => {
                if self.peek() == b'~' {
                    self.pos += 1;
                    VerilogToken::TildeCaret
                } else {
                    VerilogToken::Caret
                }
            }
            b'~' => {
                if self.peek() == b'^' {
                    self.pos += 1;
                    VerilogToken::TildeCaret
                } else if self.peek() == b'&' {
                    self.pos += 1;
                    VerilogToken::TildeAmpersand
                } else if self.peek() == b'|' {
                    self.pos += 1;
                    VerilogToken::TildePipe
                } else {
                    VerilogToken::Tilde
                }
            }
            _ => {
                self.error(
                    &format!("unrecognized character '{}'", b as char),
                    self.span_from(start),
                );
                VerilogToken::Error
            }
        };
        Token::new(kind, self.span_from(start))
    }
}

/// Converts a based-literal digit string (binary/octal/decimal/hex, possibly
/// containing `x`/`z`/`?` and underscores) into a [`LogicVec`] of `width`
/// bits, MSB-aligned digit-by-digit from the right.
fn digits_to_logic_vec(digits: &str, base: u8, width: u32) -> LogicVec {
    if base == b'd' {
        return decimal_digits_to_logic_vec(digits, width);
    }
    let bits_per_digit: u32 = match base {
        b'b' => 1,
        b'o' => 3,
        b'h' => 4,
        _ => 1,
    };
    let mut v = LogicVec::new(width);
    let chars: Vec<char> = digits.chars().filter(|c| *c != '_').collect();
    let mut bit = 0u32;
    for c in chars.iter().rev() {
        if bit >= width {
            break;
        }
        if matches!(c, 'x' | 'X' | 'z' | 'Z' | '?') {
            let logic = if matches!(c, 'z' | 'Z') { Logic::Z } else { Logic::X };
            for b in 0..bits_per_digit {
                if bit + b < width {
                    v.set(bit + b, logic);
                }
            }
        } else if let Some(digit) = c.to_digit(16) {
            for b in 0..bits_per_digit {
                if bit + b < width {
                    let on = (digit >> b) & 1 != 0;
                    v.set(bit + b, if on { Logic::One } else { Logic::Zero });
                }
            }
        }
        bit += bits_per_digit;
    }
    v
}

/// Converts a plain decimal digit string (no base prefix) into a `LogicVec`.
/// Values wider than 64 bits saturate at `u64::MAX`.
fn decimal_digits_to_logic_vec(digits: &str, width: u32) -> LogicVec {
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let value = cleaned.parse::<u64>().unwrap_or(u64::MAX);
    LogicVec::from_u64(value, width)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(source: &str) -> Vec<Token> {
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = lex(source, file, &sink);
        assert!(
            !sink.has_errors(),
            "unexpected errors: {:?}",
            sink.diagnostics()
        );
        tokens
    }

    fn lex_tokens_with_errors(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = lex(source, file, &sink);
        (tokens, sink.take_all())
    }

    fn kinds(tokens: &[Token]) -> Vec<VerilogToken> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input() {
        let tokens = lex_tokens("");
        assert_eq!(kinds(&tokens), vec![VerilogToken::Eof]);
    }

    #[test]
    fn whitespace_only() {
        let tokens = lex_tokens("  \t\n  ");
        assert_eq!(kinds(&tokens), vec![VerilogToken::Eof]);
    }

    #[test]
    fn keywords_case_sensitive() {
        let tokens = lex_tokens("module Module MODULE");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Module,
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn new_keywords() {
        let tokens = lex_tokens("event time realtime");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Event,
                VerilogToken::Time,
                VerilogToken::Realtime,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn identifiers() {
        let tokens = lex_tokens("my_signal clk data_in_0");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn system_identifiers() {
        let tokens = lex_tokens("$display $clog2 $finish");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::SystemIdentifier,
                VerilogToken::SystemIdentifier,
                VerilogToken::SystemIdentifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn integer_literal_resolves_value() {
        let tokens = lex_tokens("42");
        let lit = tokens[0].literal.as_ref().unwrap();
        assert_eq!(lit.value.to_u64(), Some(42));
        assert_eq!(lit.value.width(), DEFAULT_LITERAL_WIDTH);
    }

    #[test]
    fn sized_binary_literal_resolves_value() {
        let tokens = lex_tokens("4'b1010");
        assert_eq!(tokens[0].kind, VerilogToken::SizedLiteral);
        let lit = tokens[0].literal.as_ref().unwrap();
        assert_eq!(lit.value.width(), 4);
        assert_eq!(lit.value.to_u64(), Some(0b1010));
        assert!(!lit.signed);
    }

    #[test]
    fn sized_hex_literal_resolves_value() {
        let tokens = lex_tokens("16'hFF");
        let lit = tokens[0].literal.as_ref().unwrap();
        assert_eq!(lit.value.width(), 16);
        assert_eq!(lit.value.to_u64(), Some(0xFF));
    }

    #[test]
    fn sized_octal_literal_resolves_value() {
        let tokens = lex_tokens("8'o17");
        let lit = tokens[0].literal.as_ref().unwrap();
        assert_eq!(lit.value.to_u64(), Some(0o17));
    }

    #[test]
    fn sized_decimal_literal_resolves_value() {
        let tokens = lex_tokens("32'd255");
        let lit = tokens[0].literal.as_ref().unwrap();
        assert_eq!(lit.value.to_u64(), Some(255));
    }

    #[test]
    fn sized_literal_with_xz() {
        let tokens = lex_tokens("4'bxx0z 8'hxF");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::SizedLiteral,
                VerilogToken::SizedLiteral,
                VerilogToken::Eof,
            ]
        );
        assert!(tokens[0].literal.as_ref().unwrap().value.to_u64().is_none());
    }

    #[test]
    fn unsized_based_literal() {
        let tokens = lex_tokens("'b1 'hFF 'd10");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::SizedLiteral,
                VerilogToken::SizedLiteral,
                VerilogToken::SizedLiteral,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn signed_sized_literal() {
        let tokens = lex_tokens("8'sb10101010");
        let lit = tokens[0].literal.as_ref().unwrap();
        assert!(lit.signed);
    }

    #[test]
    fn real_literals() {
        let tokens = lex_tokens("1.5 0.0 1.0e3 2.5E-2");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::RealLiteral,
                VerilogToken::RealLiteral,
                VerilogToken::RealLiteral,
                VerilogToken::RealLiteral,
                VerilogToken::Eof,
            ]
        );
        assert!(tokens[0].literal.is_none());
    }

    #[test]
    fn string_literal() {
        let tokens = lex_tokens("\"hello\" \"world\"");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::StringLiteral,
                VerilogToken::StringLiteral,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_with_escapes() {
        let tokens = lex_tokens("\"say \\\"hi\\\"\"");
        assert_eq!(
            kinds(&tokens),
            vec![VerilogToken::StringLiteral, VerilogToken::Eof]
        );
    }

    #[test]
    fn plus_colon_and_minus_colon() {
        let tokens = lex_tokens("+: -:");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::PlusColon,
                VerilogToken::MinusColon,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn arrow_and_fat_arrow() {
        let tokens = lex_tokens("-> =>");
        assert_eq!(
            kinds(&tokens),
            vec![VerilogToken::Arrow, VerilogToken::FatArrow, VerilogToken::Eof]
        );
    }

    #[test]
    fn attribute_instance() {
        let tokens = lex_tokens("(* full_case *) case");
        assert_eq!(
            kinds(&tokens),
            vec![VerilogToken::Attribute, VerilogToken::Case, VerilogToken::Eof]
        );
    }

    #[test]
    fn minus_alone_is_not_arrow() {
        let tokens = lex_tokens("a - b");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Identifier,
                VerilogToken::Minus,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn operators_and_punctuation() {
        let tokens = lex_tokens("( ) [ ] { } , ; : . # @ = == != === !== < <= > >= + - * ** / % & && | || ^ ~^ ~ ~& ~| ! << >> <<< >>> ?");
        let k = kinds(&tokens);
        assert_eq!(k[0], VerilogToken::LeftParen);
        assert_eq!(k[1], VerilogToken::RightParen);
        assert_eq!(*k.last().unwrap(), VerilogToken::Eof);
        assert!(k.contains(&VerilogToken::TripleEquals));
        assert!(k.contains(&VerilogToken::TripleGreater));
    }

    #[test]
    fn line_comment() {
        let tokens = lex_tokens("wire // this is a comment\nclk");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Wire,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn block_comment() {
        let tokens = lex_tokens("wire /* block\ncomment */ clk");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Wire,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn compiler_directive_silently_discarded() {
        let (tokens, errors) = lex_tokens_with_errors("`timescale 1ns/1ps\nmodule top;");
        let k = kinds(&tokens);
        assert_eq!(k[0], VerilogToken::Module);
        assert!(errors.is_empty());
    }

    #[test]
    fn unterminated_string_error() {
        let (tokens, errors) = lex_tokens_with_errors("\"unterminated\n");
        assert!(tokens.iter().any(|t| t.kind == VerilogToken::Error));
        assert!(!errors.is_empty());
    }

    #[test]
    fn unterminated_block_comment_error() {
        let (tokens, errors) = lex_tokens_with_errors("/* unterminated");
        assert_eq!(tokens.last().unwrap().kind, VerilogToken::Eof);
        assert!(!errors.is_empty());
    }

    #[test]
    fn unrecognized_char_error() {
        let (tokens, errors) = lex_tokens_with_errors("\u{a7}");
        assert!(tokens.iter().any(|t| t.kind == VerilogToken::Error));
        assert!(!errors.is_empty());
    }

    #[test]
    fn spans_are_correct() {
        let tokens = lex_tokens("module top");
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 6);
        assert_eq!(tokens[1].span.start, 7);
        assert_eq!(tokens[1].span.end, 10);
    }

    #[test]
    fn eof_always_present() {
        let tokens = lex_tokens("module");
        assert_eq!(tokens.last().unwrap().kind, VerilogToken::Eof);
    }

    #[test]
    fn dollar_without_ident_error() {
        let (tokens, errors) = lex_tokens_with_errors("$ ;");
        assert!(tokens.iter().any(|t| t.kind == VerilogToken::Error));
        assert!(!errors.is_empty());
    }
}
