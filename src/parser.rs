//! Recursive-descent parser.
//!
//! Builds a [`Program`] from a flat [`Token`] stream, one method per grammar
//! production, bottoming out in `primary`. Binary-operator precedence is
//! handled by a ladder of methods (`logical_or` down to `multiplicative`),
//! each a `while`-loop over a left-associative operator set, the same shape
//! as the lexer's own cursor-based scanning: `peek`/`advance`/`previous`
//! plus small lookahead helpers for the few ambiguous productions
//! (typed declaration vs. plain assignment, the two `for` forms).
//!
//! Unlike many C-family grammars this one has no statement terminator:
//! `if`/`while` conditions are bare expressions (no surrounding parens) and
//! statements inside a block simply run one after another until the next
//! token can't continue the current production. `NEWLINE` tokens carry no
//! grammatical weight beyond being skippable wherever a statement is
//! expected; they are never required and never looked for inside an
//! expression.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> PResult<Program> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.is_at_end() {
            statements.push(self.statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    // ---- statements ----------------------------------------------------

    fn statement(&mut self) -> PResult<Statement> {
        self.skip_newlines();
        match &self.peek().kind {
            TokenKind::Fn => self.function_decl(),
            TokenKind::TypeInt | TokenKind::TypeFloat | TokenKind::TypeString | TokenKind::TypeBool => {
                self.typed_declaration()
            }
            TokenKind::Identifier(_) if self.peek_is_assignment() => self.assignment(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::LeftBrace => Ok(Statement::Block(self.block()?)),
            _ => {
                let expr = self.expression()?;
                Ok(Statement::ExpressionStatement(expr))
            }
        }
    }

    fn type_tag(&mut self) -> PResult<TypeTag> {
        let tok = self.advance().clone();
        match tok.kind {
            TokenKind::TypeInt => Ok(TypeTag::Int),
            TokenKind::TypeFloat => Ok(TypeTag::Float),
            TokenKind::TypeString => Ok(TypeTag::String),
            TokenKind::TypeBool => Ok(TypeTag::Bool),
            _ => Err(ParseError::ExpectedTypeTag {
                line: tok.line,
                column: tok.column,
            }),
        }
    }

    fn is_type_tag(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::TypeInt | TokenKind::TypeFloat | TokenKind::TypeString | TokenKind::TypeBool
        )
    }

    fn identifier_name(&mut self) -> PResult<String> {
        let tok = self.advance().clone();
        match tok.kind {
            TokenKind::Identifier(name) => Ok(name),
            TokenKind::Main => Ok("main".to_string()),
            _ => Err(ParseError::ExpectedIdentifier {
                line: tok.line,
                column: tok.column,
            }),
        }
    }

    /// `type_tag IDENTIFIER '=' expression` - a typed declaration always
    /// defines `name` fresh in the current frame (see `ast::Statement`).
    fn typed_declaration(&mut self) -> PResult<Statement> {
        let type_tag = self.type_tag()?;
        let name = self.identifier_name()?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.expression()?;
        Ok(Statement::TypedDeclaration {
            type_tag,
            name,
            value,
        })
    }

    /// `IDENTIFIER '=' expression` - updates the nearest existing binding,
    /// or defines one in the current frame if none exists.
    fn assignment(&mut self) -> PResult<Statement> {
        let name = self.identifier_name()?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.expression()?;
        Ok(Statement::Assignment { name, value })
    }

    /// `'fn' (IDENTIFIER | 'main') '(' params? ')' block`, where each
    /// param is `IDENTIFIER [type_tag]` - the type tag is optional and,
    /// unlike a typed declaration, comes *after* the name.
    fn function_decl(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Fn, "'fn'")?;
        let name = self.identifier_name()?;
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let name = self.identifier_name()?;
                let type_tag = if self.is_type_tag() {
                    Some(self.type_tag()?)
                } else {
                    None
                };
                params.push(Param { name, type_tag });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        let body = self.block()?;
        Ok(Statement::FunctionDecl { name, params, body })
    }

    /// `'if' expression block ['else' block]` - no parens around the
    /// condition; an `else if` chain is just a nested `If` inside the
    /// else branch.
    fn if_statement(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::If, "'if'")?;
        let condition = self.expression()?;
        let then_branch = self.block()?;
        self.skip_newlines_before_else();
        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `else` may sit on the line after the closing `}` of the `then`
    /// block; newlines there are still "between statements", not inside
    /// an expression, so they're safe to skip.
    fn skip_newlines_before_else(&mut self) {
        let mut lookahead = self.current;
        while matches!(self.tokens.get(lookahead).map(|t| &t.kind), Some(TokenKind::Newline)) {
            lookahead += 1;
        }
        if matches!(self.tokens.get(lookahead).map(|t| &t.kind), Some(TokenKind::Else)) {
            self.current = lookahead;
        }
    }

    /// `'while' expression block` - no parens around the condition.
    fn while_statement(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::While, "'while'")?;
        let condition = self.expression()?;
        let body = self.block()?;
        Ok(Statement::While { condition, body })
    }

    /// Accepts both the minimal `for { body }` infinite-loop form and the
    /// richer `for init; cond; update { body }` form (no parens around the
    /// clause list, matching `if`/`while`'s bare-expression style). A
    /// missing `cond` reads as always-true.
    fn for_statement(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::For, "'for'")?;

        if self.check(&TokenKind::LeftBrace) {
            let body = self.block()?;
            return Ok(Statement::For {
                init: None,
                condition: None,
                update: None,
                body,
            });
        }

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.for_clause()?))
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let update = if self.check(&TokenKind::LeftBrace) {
            None
        } else {
            Some(Box::new(self.for_clause()?))
        };

        let body = self.block()?;
        Ok(Statement::For {
            init,
            condition,
            update,
            body,
        })
    }

    /// A single `for`-clause position: a typed declaration or a plain
    /// assignment, without the surrounding semicolon/brace that
    /// `for_statement` consumes itself.
    fn for_clause(&mut self) -> PResult<Statement> {
        if self.is_type_tag() {
            self.typed_declaration()
        } else {
            self.assignment()
        }
    }

    /// `'return' [expression]` - a bare `return` followed by something
    /// that can't start an expression (closing brace, newline, EOF) has no
    /// value.
    fn return_statement(&mut self) -> PResult<Statement> {
        self.expect(TokenKind::Return, "'return'")?;
        if self.starts_expression() {
            Ok(Statement::Return(Some(self.expression()?)))
        } else {
            Ok(Statement::Return(None))
        }
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek().kind,
            TokenKind::RightBrace | TokenKind::Newline | TokenKind::Eof | TokenKind::Semicolon
        )
    }

    fn block(&mut self) -> PResult<Vec<Statement>> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                let tok = self.peek();
                return Err(ParseError::ExpectedClosing {
                    kind: "}".to_string(),
                    line: tok.line,
                    column: tok.column,
                });
            }
            statements.push(self.statement()?);
            self.skip_newlines();
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(statements)
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    // ---- expressions (precedence ladder) --------------------------------

    fn expression(&mut self) -> PResult<Expression> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> PResult<Expression> {
        let mut expr = self.logical_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.logical_and()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator: BinaryOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> PResult<Expression> {
        let mut expr = self.equality()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.equality()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator: BinaryOperator::And,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expression> {
        let mut expr = self.comparison()?;
        loop {
            let operator = match &self.peek().kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expression> {
        let mut expr = self.additive()?;
        loop {
            let operator = match &self.peek().kind {
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn additive(&mut self) -> PResult<Expression> {
        let mut expr = self.multiplicative()?;
        loop {
            let operator = match &self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> PResult<Expression> {
        let mut expr = self.unary()?;
        loop {
            let operator = match &self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expression> {
        match &self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expression::Unary {
                    operator: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expression::Unary {
                    operator: UnaryOperator::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> PResult<Expression> {
        let tok = self.advance().clone();
        match tok.kind {
            TokenKind::IntLit(n) => Ok(Expression::IntLit(n)),
            TokenKind::FloatLit(n) => Ok(Expression::FloatLit(n)),
            TokenKind::StringLit(s) => Ok(Expression::StringLit(s)),
            TokenKind::True => Ok(Expression::BoolLit(true)),
            TokenKind::False => Ok(Expression::BoolLit(false)),
            TokenKind::Identifier(name) => {
                if self.check(&TokenKind::LeftParen) {
                    self.advance();
                    let args = self.argument_list()?;
                    self.expect(TokenKind::RightParen, "')'")?;
                    Ok(Expression::Call { name, args })
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            TokenKind::LeftParen => {
                let expr = self.expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEOF {
                line: tok.line,
                column: tok.column,
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "an expression".to_string(),
                got: other.to_string(),
                line: tok.line,
                column: tok.column,
            }),
        }
    }

    fn argument_list(&mut self) -> PResult<Vec<Expression>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(args)
    }

    // ---- cursor helpers --------------------------------------------------

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_ahead(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    /// True when the current `Identifier` is followed immediately by a bare
    /// `=` (not `==`), i.e. this is an assignment rather than an expression
    /// statement such as a bare function call.
    fn peek_is_assignment(&self) -> bool {
        matches!(
            self.peek_ahead(1).map(|t| &t.kind),
            Some(TokenKind::Assign)
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: tok.kind.to_string(),
                line: tok.line,
                column: tok.column,
            })
        }
    }
}
