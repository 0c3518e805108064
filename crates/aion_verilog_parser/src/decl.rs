//! Declaration and module item parsing for Verilog-2005.
//!
//! Handles net/reg/integer/real declarations, parameter/localparam, continuous
//! assign, always/initial blocks, module instantiation, generate blocks,
//! function/task declarations, gate primitives, and genvar/defparam.
//!
//! **Instantiation detection:** When an identifier appears at module-item level,
//! the parser peeks at the next token — if it's also an identifier or `#`,
//! this is a module instantiation rather than a declaration.

use crate::ast::*;
use crate::parser::VerilogParser;
use crate::token::VerilogToken;
use aion_common::LogicVec;
use aion_source::Span;

impl VerilogParser<'_> {
    /// Parses module items until `endmodule` or EOF.
    pub fn parse_module_items(&mut self) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        while !self.at(VerilogToken::Endmodule) && !self.at_eof() {
            items.extend(self.parse_module_item_inner());
        }
        items
    }

    /// Returns `true` if the current position looks like the start of a declaration.
    pub(crate) fn is_at_declaration_start(&self) -> bool {
        matches!(
            self.current(),
            VerilogToken::Wire
                | VerilogToken::Reg
                | VerilogToken::Integer
                | VerilogToken::Real
                | VerilogToken::Tri
                | VerilogToken::Supply0
                | VerilogToken::Supply1
                | VerilogToken::Parameter
                | VerilogToken::Localparam
                | VerilogToken::Input
                | VerilogToken::Output
                | VerilogToken::Inout
                | VerilogToken::Genvar
        )
    }

    /// Parses a single module item. May return multiple items for a
    /// comma-separated `parameter`/`localparam` declaration list.
    pub(crate) fn parse_module_item_inner(&mut self) -> Vec<ModuleItem> {
        let attrs = self.parse_attrs();
        match self.current() {
            // Net declarations
            VerilogToken::Wire
            | VerilogToken::Tri
            | VerilogToken::Supply0
            | VerilogToken::Supply1 => vec![self.parse_net_declaration(attrs)],

            // Reg declaration
            VerilogToken::Reg => vec![self.parse_reg_declaration(attrs)],

            // Integer declaration
            VerilogToken::Integer => vec![self.parse_integer_declaration(attrs)],

            // Real declaration
            VerilogToken::Real => vec![self.parse_real_declaration(attrs)],

            // Parameter
            VerilogToken::Parameter => self.parse_parameter_item(false, attrs),

            // Localparam
            VerilogToken::Localparam => self.parse_parameter_item(true, attrs),

            // Port declarations (non-ANSI style)
            VerilogToken::Input | VerilogToken::Output | VerilogToken::Inout => {
                vec![self.parse_port_declaration(attrs)]
            }

            // Continuous assignment
            VerilogToken::Assign => vec![self.parse_continuous_assign(attrs)],

            // Always block
            VerilogToken::Always => vec![self.parse_always_block(attrs)],

            // Initial block
            VerilogToken::Initial => vec![self.parse_initial_block(attrs)],

            // Generate block
            VerilogToken::Generate => vec![self.parse_generate_block(attrs)],

            // Genvar
            VerilogToken::Genvar => vec![self.parse_genvar_declaration(attrs)],

            // Function
            VerilogToken::Function => vec![self.parse_function_declaration(attrs)],

            // Task
            VerilogToken::Task => vec![self.parse_task_declaration(attrs)],

            // Defparam
            VerilogToken::Defparam => vec![self.parse_defparam(attrs)],

            // Gate primitives: and, or, nand, nor, xor, xnor, not, buf
            VerilogToken::And
            | VerilogToken::Or
            | VerilogToken::Nand
            | VerilogToken::Nor
            | VerilogToken::Xor
            | VerilogToken::Xnor
            | VerilogToken::Not
            | VerilogToken::Buf => vec![self.parse_gate_instantiation(attrs)],

            // Identifier: could be module instantiation
            VerilogToken::Identifier => {
                // Detect instantiation: ident ident or ident #
                let next = self.peek_kind(1);
                if next == VerilogToken::Identifier || next == VerilogToken::Hash {
                    vec![self.parse_module_instantiation(attrs)]
                } else {
                    let span = self.current_span();
                    self.error("expected module item");
                    self.recover_to_semicolon();
                    vec![ModuleItem::Error(span)]
                }
            }

            _ => {
                let span = self.current_span();
                self.error("expected module item");
                self.recover_to_semicolon();
                vec![ModuleItem::Error(span)]
            }
        }
    }

    /// Parses a net declaration (wire, tri, supply0, supply1).
    fn parse_net_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        let net_type = self.eat_net_type().expect("should be at net type");
        let signed = self.eat(VerilogToken::Signed);
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };

        let names = self.parse_decl_name_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());

        ModuleItem::NetDecl(NetDecl {
            net_type,
            signed,
            range,
            names,
            attrs,
            span,
        })
    }

    /// Parses a reg declaration.
    fn parse_reg_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Reg);
        let signed = self.eat(VerilogToken::Signed);
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };

        let names = self.parse_decl_name_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());

        ModuleItem::RegDecl(RegDecl {
            signed,
            range,
            names,
            attrs,
            span,
        })
    }

    /// Parses an integer variable declaration.
    fn parse_integer_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Integer);
        let names = self.parse_decl_name_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());
        ModuleItem::IntegerDecl(IntegerDecl { names, attrs, span })
    }

    /// Parses a real variable declaration.
    fn parse_real_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Real);
        let names = self.parse_decl_name_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());
        ModuleItem::RealDecl(RealDecl { names, attrs, span })
    }

    /// Parses a comma-separated list of declaration names with optional dimensions and init.
    fn parse_decl_name_list(&mut self) -> Vec<DeclName> {
        let mut names = Vec::new();
        names.push(self.parse_decl_name());
        while self.eat(VerilogToken::Comma) {
            names.push(self.parse_decl_name());
        }
        names
    }

    /// Parses a single declaration name with optional array dimensions and init.
    fn parse_decl_name(&mut self) -> DeclName {
        let start = self.current_span();
        let name = self.expect_ident();
        let mut dimensions = Vec::new();
        while self.at(VerilogToken::LeftBracket) {
            dimensions.push(self.parse_range());
        }
        let init = if self.eat(VerilogToken::Equals) {
            Some(self.parse_expr())
        } else {
            None
        };
        let span = start.merge(self.prev_span());
        DeclName {
            name,
            dimensions,
            init,
            span,
        }
    }

    /// Parses a parameter or localparam item in a module body. Each
    /// comma-separated declarator produces its own [`ModuleItem`].
    fn parse_parameter_item(&mut self, local: bool, attrs: Vec<String>) -> Vec<ModuleItem> {
        let param = self.parse_single_parameter_decl(local);
        let mut params = vec![param];
        while self.eat(VerilogToken::Comma) {
            let p_start = self.current_span();
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
            let span = p_start.merge(self.prev_span());
            params.push(ParameterDecl {
                local,
                signed,
                range,
                name,
                value,
                attrs: Vec::new(),
                span,
            });
        }
        self.expect(VerilogToken::Semicolon);

        params
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                if i == 0 {
                    p.attrs = attrs.clone();
                }
                if local {
                    ModuleItem::LocalparamDecl(p)
                } else {
                    ModuleItem::ParameterDecl(p)
                }
            })
            .collect()
    }

    /// Parses a non-ANSI port declaration in the module body.
    fn parse_port_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        let direction = match self.current() {
            VerilogToken::Input => {
                self.advance();
                Direction::Input
            }
            VerilogToken::Output => {
                self.advance();
                Direction::Output
            }
            VerilogToken::Inout => {
                self.advance();
                Direction::Inout
            }
            _ => {
                self.error("expected port direction");
                Direction::Input
            }
        };

        let net_type = self.eat_net_type();
        let signed = self.eat(VerilogToken::Signed);
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };

        let names = self.parse_identifier_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());

        ModuleItem::PortDecl(PortDecl {
            direction,
            net_type,
            signed,
            range,
            names,
            attrs,
            span,
        })
    }

    /// Parses a continuous assignment.
    fn parse_continuous_assign(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Assign);
        let target = self.parse_expr();
        self.expect(VerilogToken::Equals);
        let value = self.parse_expr();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());
        ModuleItem::ContinuousAssign(ContinuousAssign {
            target,
            value,
            attrs,
            span,
        })
    }

    /// Parses an always block.
    fn parse_always_block(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Always);
        let body = self.parse_statement();
        let span = start.merge(self.prev_span());
        ModuleItem::AlwaysBlock(AlwaysBlock { body, attrs, span })
    }

    /// Parses an initial block.
    fn parse_initial_block(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Initial);
        let body = self.parse_statement();
        let span = start.merge(self.prev_span());
        ModuleItem::InitialBlock(InitialBlock { body, attrs, span })
    }

    /// Parses a module instantiation.
    fn parse_module_instantiation(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        let module_name = self.expect_ident();

        // Optional parameter overrides: #(...)
        let param_overrides = if self.at(VerilogToken::Hash) {
            self.advance();
            self.parse_connection_list()
        } else {
            Vec::new()
        };

        // Parse instances (there can be multiple: mod u1(...), u2(...);)
        let mut instances = Vec::new();
        loop {
            let inst = self.parse_single_instance();
            instances.push(inst);
            if !self.eat(VerilogToken::Comma) {
                break;
            }
        }

        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());

        ModuleItem::Instantiation(Instantiation {
            module_name,
            param_overrides,
            instances,
            attrs,
            span,
        })
    }

    /// Parses a single instance: `name [range] ( connections )`.
    fn parse_single_instance(&mut self) -> Instance {
        let start = self.current_span();
        let name = self.expect_ident();
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };
        let connections = self.parse_connection_list();
        let span = start.merge(self.prev_span());
        Instance {
            name,
            range,
            connections,
            span,
        }
    }

    /// Parses a connection list: `( connection {, connection} )`.
    fn parse_connection_list(&mut self) -> Vec<Connection> {
        self.expect(VerilogToken::LeftParen);
        let mut connections = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            loop {
                connections.push(self.parse_connection());
                if !self.eat(VerilogToken::Comma) {
                    break;
                }
            }
        }
        self.expect(VerilogToken::RightParen);
        connections
    }

    /// Parses a single connection (named or positional).
    fn parse_connection(&mut self) -> Connection {
        let start = self.current_span();
        // Named connection: .name(expr) or .name()
        if self.at(VerilogToken::Dot) {
            self.advance();
            let formal = self.expect_ident();
            self.expect(VerilogToken::LeftParen);
            let actual = if self.at(VerilogToken::RightParen) {
                None
            } else {
                Some(self.parse_expr())
            };
            self.expect(VerilogToken::RightParen);
            let span = start.merge(self.prev_span());
            Connection {
                formal: Some(formal),
                actual,
                span,
            }
        } else {
            // Positional connection
            let actual = self.parse_expr();
            let span = start.merge(actual.span());
            Connection {
                formal: None,
                actual: Some(actual),
                span,
            }
        }
    }

    /// Parses a gate primitive instantiation.
    fn parse_gate_instantiation(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        let text = self.current_text();
        let gate_type = self.interner.get_or_intern(text);
        self.advance();

        // Optional instance name
        let name = if self.at(VerilogToken::Identifier) && self.peek_is(VerilogToken::LeftParen) {
            Some(self.expect_ident())
        } else {
            None
        };

        self.expect(VerilogToken::LeftParen);
        let mut ports = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            ports.push(self.parse_expr());
            while self.eat(VerilogToken::Comma) {
                ports.push(self.parse_expr());
            }
        }
        self.expect(VerilogToken::RightParen);
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());

        ModuleItem::GateInst(GateInst {
            gate_type,
            name,
            ports,
            attrs,
            span,
        })
    }

    /// Parses a generate block.
    fn parse_generate_block(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Generate);

        let block = if self.at(VerilogToken::For) {
            self.parse_generate_for(start)
        } else if self.at(VerilogToken::If) {
            self.parse_generate_if(start)
        } else if self.at(VerilogToken::Case) {
            self.parse_generate_case(start)
        } else {
            // Just a generate ... endgenerate wrapper
            let mut items = Vec::new();
            while !self.at(VerilogToken::Endgenerate) && !self.at_eof() {
                items.extend(self.parse_module_item_inner());
            }
            self.expect(VerilogToken::Endgenerate);
            let span = start.merge(self.prev_span());
            return ModuleItem::GenerateBlock(GenerateBlock::If {
                condition: Expr::Literal {
                    value: LogicVec::from_bool(true),
                    signed: false,
                    span,
                },
                then_items: items,
                else_items: Vec::new(),
                span,
            });
        };

        self.expect(VerilogToken::Endgenerate);
        let _ = attrs;
        ModuleItem::GenerateBlock(block)
    }

    /// Parses a generate-for loop.
    fn parse_generate_for(&mut self, start: Span) -> GenerateBlock {
        self.expect(VerilogToken::For);
        self.expect(VerilogToken::LeftParen);

        let init = Box::new(self.parse_blocking_assignment_stmt());
        let condition = self.parse_expr();
        self.expect(VerilogToken::Semicolon);
        let step = Box::new(self.parse_blocking_assignment_no_semi());
        self.expect(VerilogToken::RightParen);

        // Optional begin : label
        let label = if self.eat(VerilogToken::Begin) {
            if self.eat(VerilogToken::Colon) {
                Some(self.expect_ident())
            } else {
                None
            }
        } else {
            None
        };

        let mut items = Vec::new();
        let has_begin = label.is_some() || self.at(VerilogToken::End);
        if has_begin {
            // Wrapped in begin...end
            while !self.at(VerilogToken::End) && !self.at_eof() {
                items.extend(self.parse_module_item_inner());
            }
            self.expect(VerilogToken::End);
        } else {
            // Single item after for (...)
            while !self.at(VerilogToken::Endgenerate) && !self.at_eof() {
                let parsed = self.parse_module_item_inner();
                let done = !parsed.is_empty();
                items.extend(parsed);
                if done {
                    break;
                }
            }
        }

        let span = start.merge(self.prev_span());
        GenerateBlock::For {
            init,
            condition,
            step,
            label,
            items,
            span,
        }
    }

    /// Parses a generate-if conditional.
    fn parse_generate_if(&mut self, start: Span) -> GenerateBlock {
        self.expect(VerilogToken::If);
        self.expect(VerilogToken::LeftParen);
        let condition = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let then_items = self.parse_generate_body();

        let else_items = if self.eat(VerilogToken::Else) {
            self.parse_generate_body()
        } else {
            Vec::new()
        };

        let span = start.merge(self.prev_span());
        GenerateBlock::If {
            condition,
            then_items,
            else_items,
            span,
        }
    }

    /// Parses a generate-case conditional.
    fn parse_generate_case(&mut self, start: Span) -> GenerateBlock {
        self.expect(VerilogToken::Case);
        self.expect(VerilogToken::LeftParen);
        let expr = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let mut arms = Vec::new();
        while !self.at(VerilogToken::Endcase) && !self.at_eof() {
            let arm_start = self.current_span();
            let (patterns, is_default) = if self.eat(VerilogToken::Default) {
                (Vec::new(), true)
            } else {
                let mut patterns = vec![self.parse_expr()];
                while self.eat(VerilogToken::Comma) {
                    patterns.push(self.parse_expr());
                }
                (patterns, false)
            };
            self.expect(VerilogToken::Colon);
            let items = self.parse_generate_body();
            let span = arm_start.merge(self.prev_span());
            arms.push(GenerateCaseArm {
                patterns,
                is_default,
                items,
                span,
            });
        }
        self.expect(VerilogToken::Endcase);

        let span = start.merge(self.prev_span());
        GenerateBlock::Case { expr, arms, span }
    }

    /// Parses a generate body: either a begin...end block or a single item.
    fn parse_generate_body(&mut self) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        if self.eat(VerilogToken::Begin) {
            // Optional label
            if self.eat(VerilogToken::Colon) {
                let _ = self.expect_ident();
            }
            while !self.at(VerilogToken::End) && !self.at_eof() {
                items.extend(self.parse_module_item_inner());
            }
            self.expect(VerilogToken::End);
        } else {
            items.extend(self.parse_module_item_inner());
        }
        items
    }

    /// Parses a genvar declaration.
    fn parse_genvar_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Genvar);
        let names = self.parse_identifier_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());
        ModuleItem::GenvarDecl(GenvarDecl { names, attrs, span })
    }

    /// Parses a defparam statement.
    fn parse_defparam(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Defparam);
        let target = self.parse_expr();
        self.expect(VerilogToken::Equals);
        let value = self.parse_expr();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());
        ModuleItem::DefparamDecl(DefparamDecl {
            target,
            value,
            attrs,
            span,
        })
    }

    /// Parses a function declaration.
    fn parse_function_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Function);

        let automatic = self.eat(VerilogToken::Automatic);
        let signed = self.eat(VerilogToken::Signed);
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };

        let name = self.expect_ident();
        self.expect(VerilogToken::Semicolon);

        // Parse inputs and declarations
        let mut inputs = Vec::new();
        let mut decls = Vec::new();
        while !self.at(VerilogToken::Begin) && !self.at(VerilogToken::Endfunction) && !self.at_eof()
        {
            if self.at(VerilogToken::Input) {
                let port = self.parse_port_decl_in_subprogram();
                inputs.push(port);
            } else if self.is_at_declaration_start() {
                decls.extend(self.parse_module_item_inner());
            } else {
                break;
            }
        }

        // Body statements
        let mut body = Vec::new();
        if self.at(VerilogToken::Begin) {
            let block = self.parse_statement();
            body.push(block);
        } else {
            // Single statement or just statements until endfunction
            while !self.at(VerilogToken::Endfunction) && !self.at_eof() {
                body.push(self.parse_statement());
            }
        }

        self.expect(VerilogToken::Endfunction);
        let span = start.merge(self.prev_span());

        ModuleItem::FunctionDecl(FunctionDecl {
            automatic,
            signed,
            range,
            name,
            inputs,
            decls,
            body,
            attrs,
            span,
        })
    }

    /// Parses a task declaration.
    fn parse_task_declaration(&mut self, attrs: Vec<String>) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Task);

        let automatic = self.eat(VerilogToken::Automatic);
        let name = self.expect_ident();
        self.expect(VerilogToken::Semicolon);

        // Parse ports and declarations
        let mut ports = Vec::new();
        let mut decls = Vec::new();
        while !self.at(VerilogToken::Begin) && !self.at(VerilogToken::Endtask) && !self.at_eof() {
            if self.current().is_direction() {
                let port = self.parse_port_decl_in_subprogram();
                ports.push(port);
            } else if self.is_at_declaration_start() {
                decls.extend(self.parse_module_item_inner());
            } else {
                break;
            }
        }

        let mut body = Vec::new();
        while !self.at(VerilogToken::Endtask) && !self.at_eof() {
            body.push(self.parse_statement());
        }

        self.expect(VerilogToken::Endtask);
        let span = start.merge(self.prev_span());

        ModuleItem::TaskDecl(TaskDecl {
            automatic,
            name,
            ports,
            decls,
            body,
            attrs,
            span,
        })
    }

    /// Parses a port declaration inside a function or task.
    fn parse_port_decl_in_subprogram(&mut self) -> PortDecl {
        let start = self.current_span();
        let direction = match self.current() {
            VerilogToken::Input => {
                self.advance();
                Direction::Input
            }
            VerilogToken::Output => {
                self.advance();
                Direction::Output
            }
            VerilogToken::Inout => {
                self.advance();
                Direction::Inout
            }
            _ => {
                self.error("expected port direction");
                Direction::Input
            }
        };

        let net_type = self.eat_net_type();
        let signed = self.eat(VerilogToken::Signed);
        let range = if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        };

        let names = self.parse_identifier_list();
        self.expect(VerilogToken::Semicolon);
        let span = start.merge(self.prev_span());

        PortDecl {
            direction,
            net_type,
            signed,
            range,
            names,
            attrs: Vec::new(),
            span,
        }
    }
}
