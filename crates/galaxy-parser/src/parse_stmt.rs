//! Statement parsing.

use std::rc::Rc;

use crate::parser::Parser;
use galaxy_lexer::token::TokenKind;
use galaxy_types::ast::*;
use galaxy_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            } else {
                self.synchronize();
            }
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        if !self.enter() {
            return None;
        }
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Const | TokenKind::Let | TokenKind::Var => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon();
                Some(Stmt::VarDecl(decl))
            }
            TokenKind::Function if matches!(self.look_ahead(1), TokenKind::Identifier(_)) => {
                self.parse_function_decl()
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::Break | TokenKind::Continue => {
                let token = self.advance();
                if self.loop_depth == 0 {
                    self.error_at(
                        ErrorCode::ILLEGAL_JUMP,
                        format!("'{}' is only allowed inside a loop", token.kind),
                        token.span,
                    );
                }
                self.consume_semicolon();
                Some(match token.kind {
                    TokenKind::Break => Stmt::Break(token.span),
                    _ => Stmt::Continue(token.span),
                })
            }
            TokenKind::Import => self.parse_import(),
            TokenKind::Semicolon => Some(Stmt::Empty(self.advance().span)),
            _ => {
                let expr = self.parse_expression()?;
                let span = expr.span;
                self.consume_semicolon();
                Some(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    /// `const a = 1, b` (no terminator; shared with `for` headers)
    fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let start = self.current_span();
        let kind = match self.advance().kind {
            TokenKind::Const => DeclKind::Const,
            TokenKind::Let => DeclKind::Let,
            _ => DeclKind::Var,
        };
        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if kind.is_const() && init.is_none() {
                self.error_with_suggestion(
                    ErrorCode::MISSING_INITIALIZER,
                    format!("missing initializer in const declaration of '{}'", name.name),
                    name.span,
                    format!("write 'const {} = ...' or use 'let'", name.name),
                );
            }
            let span = name.span.merge(self.previous_span());
            declarators.push(Declarator { name, init, span });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let span = start.merge(self.previous_span());
        Some(VarDecl {
            kind,
            declarators,
            span,
        })
    }

    /// `function name(params) { body }`
    fn parse_function_decl(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `function`
        let name = self.expect_identifier()?;
        let function = self.parse_function_rest(Some(name), start)?;
        Some(Stmt::Function(Rc::new(function)))
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `if`
        let condition = self.parse_paren_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    /// `while (cond) stmt`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `while`
        let condition = self.parse_paren_condition()?;
        let body = Box::new(self.loop_body(Self::parse_statement)?);
        let span = start.merge(self.previous_span());
        Some(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    fn parse_paren_condition(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        Some(condition)
    }

    /// `for (const x of xs) stmt` or `for (init; cond; update) stmt`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `for`
        self.expect(&TokenKind::LParen)?;

        let is_decl = matches!(
            self.peek_kind(),
            TokenKind::Const | TokenKind::Let | TokenKind::Var
        );
        if is_decl
            && matches!(self.look_ahead(1), TokenKind::Identifier(_))
            && matches!(self.look_ahead(2), TokenKind::Identifier(n) if n == "of")
        {
            let kind = match self.advance().kind {
                TokenKind::Const => DeclKind::Const,
                TokenKind::Let => DeclKind::Let,
                _ => DeclKind::Var,
            };
            let binding = self.expect_identifier()?;
            self.advance(); // eat `of`
            let iterable = self.parse_assignment()?;
            self.expect(&TokenKind::RParen)?;
            let body = Box::new(self.loop_body(Self::parse_statement)?);
            let span = start.merge(self.previous_span());
            return Some(Stmt::ForOf(ForOfStmt {
                kind,
                binding,
                iterable,
                body,
                span,
            }));
        }

        let init = if self.check_exact(&TokenKind::Semicolon) {
            None
        } else if is_decl {
            Some(Box::new(Stmt::VarDecl(self.parse_var_decl()?)))
        } else {
            let expr = self.parse_expression()?;
            let span = expr.span;
            Some(Box::new(Stmt::Expr(ExprStmt { expr, span })))
        };
        self.expect(&TokenKind::Semicolon)?;
        let condition = if self.check_exact(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check_exact(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.loop_body(Self::parse_statement)?);
        let span = start.merge(self.previous_span());
        Some(Stmt::For(ForStmt {
            init,
            condition,
            update,
            body,
            span,
        }))
    }

    /// `return [expr]`. A line break right after `return` ends the statement.
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `return`
        let value = if self.check_exact(&TokenKind::Semicolon)
            || self.check_exact(&TokenKind::RBrace)
            || self.at_end()
            || self.newline_before_current()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = start.merge(self.previous_span());
        self.consume_semicolon();
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `throw expr`
    fn parse_throw_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `throw`
        if self.newline_before_current() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "line break is not allowed after 'throw'",
            );
            return None;
        }
        let value = self.parse_expression()?;
        let span = start.merge(self.previous_span());
        self.consume_semicolon();
        Some(Stmt::Throw(ThrowStmt { value, span }))
    }

    /// `import { a, b } from 'module'`
    fn parse_import(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `import`
        self.expect(&TokenKind::LBrace)?;
        let mut names = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            names.push(self.expect_identifier()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        if !self.check_contextual("from") {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected 'from', got '{}'", self.peek_kind()),
            );
            return None;
        }
        self.advance(); // eat `from`
        let source = match self.peek_kind().clone() {
            TokenKind::StringLiteral(s) => {
                self.advance();
                s
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected module name string, got '{other}'"),
                );
                return None;
            }
        };
        let span = start.merge(self.previous_span());
        self.consume_semicolon();
        Some(Stmt::Import(ImportDecl {
            names,
            source,
            span,
        }))
    }
}
