//! Recursive-descent parser.
//!
//! One function per grammar rule (`parse_function`, `parse_struct_def`,
//! `parse_statement`, a precedence-climbing ladder for `parse_expr`), driving
//! the AST builder operations `pie_core::ast` exposes. Returns
//! `Result<Module, ParseError>`; the caller (the CLI driver) maps failure to
//! exit code 2.

use std::fmt;

use pie_core::ast::{self, BinaryOp, Node, TypeAnnotation, UnaryOp, Visibility};
use pie_core::Module;

use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// 0-indexed, as produced by the lexer; displayed 1-indexed to users.
    pub line: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line + 1, self.message)
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.at(&kind) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(ParseError {
                message: format!("expected {what}, found '{}'", found.text),
                line: found.line,
            })
        }
    }

    /// Statements may omit their trailing `;` when they are the last
    /// statement in a block, matching every end-to-end source fragment this
    /// grammar is fixed against (`return a }` with no semicolon).
    fn consume_statement_terminator(&mut self) -> Result<(), ParseError> {
        if self.at(&TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else if self.at(&TokenKind::RBrace) {
            Ok(())
        } else {
            let found = self.peek();
            Err(ParseError {
                message: format!("expected ';', found '{}'", found.text),
                line: found.line,
            })
        }
    }

    fn check_error_token(&self) -> Result<(), ParseError> {
        if self.at(&TokenKind::Error) {
            let token = self.peek();
            Err(ParseError {
                message: token.text.clone(),
                line: token.line,
            })
        } else {
            Ok(())
        }
    }

    pub fn parse(&mut self, module_name: &str) -> Result<Module, ParseError> {
        let mut module = Module::new(module_name);
        while !self.at(&TokenKind::Eof) {
            self.check_error_token()?;
            let is_public = if self.at(&TokenKind::Public) {
                self.advance();
                true
            } else {
                false
            };

            if self.at(&TokenKind::Import) {
                module.imports.push(self.parse_import(is_public)?);
            } else if self.at(&TokenKind::Struct) {
                module.struct_defs.push(self.parse_struct_def()?);
            } else if self.at(&TokenKind::Fn) {
                module.functions.push(self.parse_function(is_public)?);
            } else {
                let found = self.peek();
                return Err(ParseError {
                    message: format!("expected 'import', 'struct', or 'fn', found '{}'", found.text),
                    line: found.line,
                });
            }
        }
        Ok(module)
    }

    fn parse_import(&mut self, is_public: bool) -> Result<ast::Import, ParseError> {
        self.expect(TokenKind::Import, "'import'")?;
        let mut segments = vec![self.expect(TokenKind::Identifier, "module path")?.text];
        let mut import_all = false;
        while self.at(&TokenKind::Dot) {
            self.advance();
            if self.at(&TokenKind::Star) {
                self.advance();
                import_all = true;
                break;
            }
            segments.push(self.expect(TokenKind::Identifier, "module path segment")?.text);
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(ast::Import {
            module_name: segments.join("."),
            visibility: Visibility::from_flag(is_public),
            import_all,
        })
    }

    fn parse_struct_def(&mut self) -> Result<ast::StructDef, ParseError> {
        self.expect(TokenKind::Struct, "'struct'")?;
        let name = self.expect(TokenKind::Identifier, "struct name")?.text;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        if !self.at(&TokenKind::RBrace) {
            loop {
                let field_name = self.expect(TokenKind::Identifier, "field name")?.text;
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type_annotation()?;
                fields.push((field_name, ty));
                if self.at(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(ast::StructDef { name, fields })
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, ParseError> {
        let name = self.expect(TokenKind::Identifier, "type name")?.text;
        let is_array = if self.at(&TokenKind::LBracket) {
            self.advance();
            self.expect(TokenKind::RBracket, "']'")?;
            true
        } else {
            false
        };
        Ok(TypeAnnotation::new(name, is_array))
    }

    fn parse_function(&mut self, is_public: bool) -> Result<ast::Function, ParseError> {
        self.expect(TokenKind::Fn, "'fn'")?;
        let name = self.expect(TokenKind::Identifier, "function name")?.text;
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let param_name = self.expect(TokenKind::Identifier, "parameter name")?.text;
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type_annotation()?;
                params.push(ast::Param {
                    name: param_name,
                    type_annotation: ty,
                });
                if self.at(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let return_type = if self.at(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = self.parse_block_statements()?;
        Ok(ast::Function {
            name,
            visibility: Visibility::from_flag(is_public),
            params,
            return_type,
            body,
        })
    }

    fn parse_block_statements(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            self.check_error_token()?;
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(statements)
    }

    fn parse_block(&mut self) -> Result<Node, ParseError> {
        Ok(ast::make_block(self.parse_block_statements()?))
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        if self.at(&TokenKind::Let) {
            self.parse_let_statement()
        } else if self.at(&TokenKind::Return) {
            self.parse_return_statement()
        } else if self.at(&TokenKind::If) {
            self.parse_if_statement()
        } else {
            let expr = self.parse_assignment()?;
            self.consume_statement_terminator()?;
            Ok(expr)
        }
    }

    fn parse_let_statement(&mut self) -> Result<Node, ParseError> {
        self.expect(TokenKind::Let, "'let'")?;
        let name = self.expect(TokenKind::Identifier, "variable name")?.text;
        let type_annotation = if self.at(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let initializer = if self.at(&TokenKind::Eq) {
            self.advance();
            Some(self.parse_or()?)
        } else {
            None
        };
        self.consume_statement_terminator()?;
        Ok(ast::make_let(name, type_annotation, initializer))
    }

    fn parse_return_statement(&mut self) -> Result<Node, ParseError> {
        self.expect(TokenKind::Return, "'return'")?;
        let expr = if self.at(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_or()?)
        };
        self.consume_statement_terminator()?;
        Ok(ast::make_return(expr))
    }

    fn parse_if_statement(&mut self) -> Result<Node, ParseError> {
        self.expect(TokenKind::If, "'if'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_or()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_block = self.parse_block()?;
        let else_branch = if self.at(&TokenKind::Else) {
            self.advance();
            if self.at(&TokenKind::If) {
                Some(self.parse_if_statement()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(ast::make_if(condition, then_block, else_branch))
    }

    fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_or()?;
        if self.at(&TokenKind::Eq) {
            self.advance();
            let rhs = self.parse_assignment()?;
            Ok(ast::make_assign(lhs, rhs))
        } else if self.at(&TokenKind::PlusEq) {
            self.advance();
            let rhs = self.parse_assignment()?;
            Ok(ast::make_binary_op(BinaryOp::AddAssign, lhs, rhs))
        } else if self.at(&TokenKind::MinusEq) {
            self.advance();
            let rhs = self.parse_assignment()?;
            Ok(ast::make_binary_op(BinaryOp::SubAssign, lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.at(&TokenKind::OrOr) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = ast::make_binary_op(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.at(&TokenKind::AndAnd) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = ast::make_binary_op(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.at(&TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.at(&TokenKind::NotEq) {
                BinaryOp::Ne
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = ast::make_binary_op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.at(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.at(&TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.at(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.at(&TokenKind::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = ast::make_binary_op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.at(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.at(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = ast::make_binary_op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.at(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.at(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.at(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = ast::make_binary_op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.at(&TokenKind::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(ast::make_unary_op(UnaryOp::Neg, operand))
        } else if self.at(&TokenKind::Bang) {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(ast::make_unary_op(UnaryOp::Not, operand))
        } else if self.at(&TokenKind::PlusPlus) {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(ast::make_unary_op(UnaryOp::Inc, operand))
        } else if self.at(&TokenKind::MinusMinus) {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(ast::make_unary_op(UnaryOp::Dec, operand))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;
        while self.at(&TokenKind::Dot) {
            self.advance();
            let field = self.expect(TokenKind::Identifier, "field name")?.text;
            node = ast::make_field_access(node, field);
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        self.check_error_token()?;
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int => {
                self.advance();
                let value: i64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError {
                        message: format!("invalid integer literal '{}'", token.text),
                        line: token.line,
                    })?;
                Ok(ast::make_int(value))
            }
            TokenKind::Double => {
                self.advance();
                let value: f64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError {
                        message: format!("invalid double literal '{}'", token.text),
                        line: token.line,
                    })?;
                Ok(ast::make_double(value))
            }
            TokenKind::String => {
                self.advance();
                Ok(ast::make_string(token.text))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.at(&TokenKind::LParen) {
                    let args = self.parse_call_arguments()?;
                    Ok(ast::make_function_call(token.text, args))
                } else if self.at(&TokenKind::LBrace) {
                    let fields = self.parse_struct_literal_fields()?;
                    Ok(ast::make_struct_literal(token.text, fields))
                } else {
                    Ok(ast::make_identifier(token.text))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(ParseError {
                message: format!("unexpected token '{}'", token.text),
                line: token.line,
            }),
        }
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.at(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn parse_struct_literal_fields(&mut self) -> Result<Vec<(String, Node)>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        if !self.at(&TokenKind::RBrace) {
            loop {
                let name = self.expect(TokenKind::Identifier, "field name")?.text;
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_or()?;
                fields.push((name, value));
                if self.at(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(fields)
    }
}

pub fn parse(source: &str, module_name: &str) -> Result<Module, ParseError> {
    let tokens = crate::lexer::tokenize(source);
    Parser::new(tokens).parse(module_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pie_core::ast::Node;

    #[test]
    fn parses_minimal_main_function() {
        let module = parse("fn main() : int { return 0; }", "test").unwrap();
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].name, "main");
    }

    #[test]
    fn parses_if_else() {
        let module = parse(
            "fn main() : int { if (1 < 2) { return 7; } else { return 9; } }",
            "test",
        )
        .unwrap();
        match &module.functions[0].body[0] {
            Node::If(i) => assert!(i.else_branch.is_some()),
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn parses_struct_def_and_literal() {
        let module = parse(
            "struct Point { x: int, y: int } fn main() : int { let p: Point = Point { x: 3, y: 4 }; return p.x + p.y; }",
            "test",
        )
        .unwrap();
        assert_eq!(module.struct_defs.len(), 1);
        assert_eq!(module.struct_defs[0].fields.len(), 2);
    }

    #[test]
    fn parses_compound_assignment() {
        let module = parse(
            "fn main() : int { let a: int = 1; a += 2; return a; }",
            "test",
        )
        .unwrap();
        match &module.functions[0].body[1] {
            Node::BinaryOp(b) => assert_eq!(b.op, BinaryOp::AddAssign),
            other => panic!("expected BinaryOp, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_a_parse_error() {
        let err = parse("fn main() : int { let s: string = \"oops; return 0; }", "test").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn missing_closing_brace_is_a_parse_error() {
        let err = parse("fn main() : int { return 0;", "test").unwrap_err();
        assert!(err.message.contains("'}'"));
    }

    #[test]
    fn function_call_arguments_are_parsed_left_to_right() {
        let module = parse("fn main() : int { print(\"hi \" + 5); return 0; }", "test").unwrap();
        match &module.functions[0].body[0] {
            Node::FunctionCall(call) => {
                assert_eq!(call.callee_name, "print");
                assert_eq!(call.arguments.len(), 1);
            }
            other => panic!("expected FunctionCall, got {other:?}"),
        }
    }
}
