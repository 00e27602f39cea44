//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 9. assignment `=`, `+=`, ... and arrow functions (right-associative)
//! 8. conditional `? :`
//! 7. `??`
//! 6. `||`
//! 5. `&&`
//! 4. `==`, `!=`, `===`, `!==`
//! 3. `<`, `>`, `<=`, `>=`
//! 2. `+`, `-` then `*`, `/`, `%`
//! 1. unary `!`, `-`, `+`, `typeof`, `++`/`--`, then postfix `++`/`--`,
//!    member access, calls and `new`

use std::collections::HashSet;
use std::rc::Rc;

use galaxy_lexer::token::TokenKind;
use galaxy_types::ast::*;
use galaxy_types::{ErrorCode, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_assignment()
    }

    /// `Assignment = Arrow | Conditional [ AssignOp Assignment ]`
    pub(crate) fn parse_assignment(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let result = self.parse_assignment_inner();
        self.leave();
        result
    }

    fn parse_assignment_inner(&mut self) -> Option<Expr> {
        if self.arrow_ahead() {
            return self.parse_arrow();
        }

        let target = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::ModAssign,
            _ => return Some(target),
        };
        if !is_assignable(&target) {
            self.error_with_suggestion(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "invalid assignment target",
                target.span,
                "only variables and properties can be assigned; use '===' to compare",
            );
            return None;
        }
        self.advance(); // eat operator
        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);
        Some(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Arrow Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// `x =>` or `( ... ) =>` at the cursor.
    fn arrow_ahead(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Identifier(_) => *self.look_ahead(1) == TokenKind::FatArrow,
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut n = 0;
                loop {
                    match self.look_ahead(n) {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return *self.look_ahead(n + 1) == TokenKind::FatArrow;
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    n += 1;
                }
            }
            _ => false,
        }
    }

    /// `x => body` or `(a, b) => body`
    fn parse_arrow(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let params = if self.eat(&TokenKind::LParen) {
            let params = self.parse_param_list()?;
            self.expect(&TokenKind::RParen)?;
            params
        } else {
            vec![self.expect_identifier()?]
        };
        self.expect(&TokenKind::FatArrow)?;
        let body = self.function_body(|p| {
            if p.check_exact(&TokenKind::LBrace) {
                p.parse_block().map(FunctionBody::Block)
            } else {
                p.parse_assignment().map(|e| FunctionBody::Expr(Box::new(e)))
            }
        })?;
        let span = start.merge(self.previous_span());
        let function = FunctionExpr {
            name: None,
            params,
            body,
            is_arrow: true,
            span,
        };
        Some(Expr::new(ExprKind::Function(Rc::new(function)), span))
    }

    /// Comma-separated parameter names, without the parentheses.
    fn parse_param_list(&mut self) -> Option<Vec<Ident>> {
        let mut params: Vec<Ident> = Vec::new();
        let mut seen = HashSet::new();
        while !self.check_exact(&TokenKind::RParen) {
            let param = self.expect_identifier()?;
            if !seen.insert(param.name.clone()) {
                self.error_at(
                    ErrorCode::DUPLICATE_PARAMETER,
                    format!("duplicate parameter name '{}'", param.name),
                    param.span,
                );
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// `(params) { body }` after `function [name]`.
    pub(crate) fn parse_function_rest(&mut self, name: Option<Ident>, start: Span) -> Option<FunctionExpr> {
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.function_body(Self::parse_block)?;
        let span = start.merge(self.previous_span());
        Some(FunctionExpr {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span,
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Conditional = Nullish [ "?" Assignment ":" Assignment ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let test = self.parse_nullish()?;
        if !self.eat(&TokenKind::Question) {
            return Some(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;
        let span = test.span.merge(alternate.span);
        Some(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_nullish(&mut self) -> Option<Expr> {
        let mut left = self.parse_or()?;
        while self.eat(&TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            left = logical(left, LogicalOp::Nullish, right);
        }
        Some(left)
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = logical(left, LogicalOp::Or, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = logical(left, LogicalOp::And, right);
        }
        Some(left)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEqEq => BinOp::StrictEq,
                TokenKind::BangEqEq => BinOp::StrictNotEq,
                TokenKind::EqEq => BinOp::LooseEq,
                TokenKind::BangEq => BinOp::LooseNotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::LessEq => BinOp::LessEq,
                TokenKind::GreaterEq => BinOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `Unary = ( "!" | "-" | "+" | "typeof" | "++" | "--" ) Unary | Postfix`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::TypeOf,
            TokenKind::PlusPlus | TokenKind::MinusMinus => return self.parse_prefix_update(),
            _ => return self.parse_postfix(),
        };
        self.advance();
        if !self.enter() {
            return None;
        }
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_prefix_update(&mut self) -> Option<Expr> {
        let token = self.advance();
        let op = if token.kind == TokenKind::PlusPlus {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        };
        let target = self.parse_unary()?;
        self.update_expr(op, true, target, token.span)
    }

    /// `Postfix = CallMember [ "++" | "--" ]` (no line break before the operator)
    fn parse_postfix(&mut self) -> Option<Expr> {
        let expr = self.parse_call_member()?;
        let op = match self.peek_kind() {
            TokenKind::PlusPlus if !self.newline_before_current() => UpdateOp::Increment,
            TokenKind::MinusMinus if !self.newline_before_current() => UpdateOp::Decrement,
            _ => return Some(expr),
        };
        self.advance();
        let start = expr.span;
        self.update_expr(op, false, expr, start)
    }

    fn update_expr(&mut self, op: UpdateOp, prefix: bool, target: Expr, start: Span) -> Option<Expr> {
        if !is_assignable(&target) {
            self.error_at(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "invalid increment/decrement operand",
                target.span,
            );
            return None;
        }
        let span = start.merge(target.span).merge(self.previous_span());
        Some(Expr::new(
            ExprKind::Update {
                op,
                prefix,
                target: Box::new(target),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls & Member Access
    // ══════════════════════════════════════════════════════════════════════════

    /// `CallMember = ( New | Primary ) { "." Name | "[" Expr "]" | "(" Args ")" }`
    fn parse_call_member(&mut self) -> Option<Expr> {
        let mut expr = if self.check_exact(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            expr = match self.peek_kind() {
                TokenKind::Dot | TokenKind::LBracket => self.parse_member(expr)?,
                TokenKind::LParen => {
                    self.advance(); // eat `(`
                    let args = self.parse_args()?;
                    let span = expr.span.merge(self.previous_span());
                    Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    )
                }
                _ => break,
            };
        }
        Some(expr)
    }

    /// `new Callee [ "(" Args ")" ]`
    fn parse_new(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `new`
        if !self.enter() {
            return None;
        }
        let callee = if self.check_exact(&TokenKind::New) {
            self.parse_new()
        } else {
            self.parse_primary()
        };
        self.leave();
        let mut callee = callee?;
        while matches!(self.peek_kind(), TokenKind::Dot | TokenKind::LBracket) {
            callee = self.parse_member(callee)?;
        }
        let args = if self.eat(&TokenKind::LParen) {
            self.parse_args()?
        } else {
            Vec::new()
        };
        let span = start.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    /// One `.name` or `[expr]` suffix.
    fn parse_member(&mut self, object: Expr) -> Option<Expr> {
        let property = if self.eat(&TokenKind::Dot) {
            MemberProperty::Named(self.expect_property_name()?)
        } else {
            self.expect(&TokenKind::LBracket)?;
            let index = self.parse_expression()?;
            self.expect(&TokenKind::RBracket)?;
            MemberProperty::Computed(Box::new(index))
        };
        let span = object.span.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
            },
            span,
        ))
    }

    /// Arguments after `(`, including the closing `)`.
    fn parse_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check_exact(&TokenKind::RParen) {
            args.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(args)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            // ── Literals ────────────────────────────────────────────────
            TokenKind::NumberLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Number(n), start))
            }
            TokenKind::StringLiteral(s) | TokenKind::TemplateLiteral(s) => {
                self.advance();
                Some(Expr::new(ExprKind::Str(s), start))
            }
            TokenKind::TemplateStart(s) => {
                self.advance();
                self.parse_template(s, start)
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(false), start))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::new(ExprKind::Null, start))
            }
            TokenKind::Undefined => {
                self.advance();
                Some(Expr::new(ExprKind::Undefined, start))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier(name), start))
            }

            // ── Collections ─────────────────────────────────────────────
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),

            // ── Grouping ────────────────────────────────────────────────
            TokenKind::LParen => {
                self.advance(); // eat `(`
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                Some(Expr::new(inner.kind, span))
            }

            // ── Function expression ─────────────────────────────────────
            TokenKind::Function => {
                self.advance(); // eat `function`
                let name = match self.peek_kind() {
                    TokenKind::Identifier(_) => Some(self.expect_identifier()?),
                    _ => None,
                };
                let function = self.parse_function_rest(name, start)?;
                let span = function.span;
                Some(Expr::new(ExprKind::Function(Rc::new(function)), span))
            }

            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                None
            }
        }
    }

    /// `[expr, ...]`
    fn parse_array_literal(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `[`
        let mut elements = Vec::new();
        while !self.check_exact(&TokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Array(elements), span))
    }

    /// `{ key: value, shorthand, method(args) { ... } }`
    fn parse_object_literal(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `{`
        let mut properties = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            let is_plain_identifier = matches!(self.peek_kind(), TokenKind::Identifier(_));
            let key = match self.peek_kind().clone() {
                TokenKind::StringLiteral(s) => Ident::new(s, self.advance().span),
                TokenKind::NumberLit(n) => Ident::new(n.to_string(), self.advance().span),
                _ => self.expect_property_name()?,
            };
            let value = if self.eat(&TokenKind::Colon) {
                self.parse_assignment()?
            } else if self.check_exact(&TokenKind::LParen) {
                let method = self.parse_function_rest(Some(key.clone()), key.span)?;
                let span = method.span;
                Expr::new(ExprKind::Function(Rc::new(method)), span)
            } else if is_plain_identifier {
                Expr::new(ExprKind::Identifier(key.name.clone()), key.span)
            } else {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected ':' after property '{}'", key.name),
                );
                return None;
            };
            properties.push(Property { key, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Object(properties), span))
    }

    /// `` `text ${expr} more ${expr} end` ``
    ///
    /// Called after the `TemplateStart` token has been consumed.
    fn parse_template(&mut self, head: String, start: Span) -> Option<Expr> {
        let mut quasis = vec![head];
        let mut exprs = Vec::new();
        loop {
            self.expect(&TokenKind::InterpolationStart)?;
            exprs.push(self.parse_expression()?);
            self.expect(&TokenKind::InterpolationEnd)?;
            match self.peek_kind().clone() {
                TokenKind::TemplatePart(s) => {
                    self.advance();
                    quasis.push(s);
                }
                TokenKind::TemplateEnd(s) => {
                    self.advance();
                    quasis.push(s);
                    break;
                }
                _ => {
                    self.error_at_current(
                        ErrorCode::UNCLOSED_DELIMITER,
                        "unterminated template literal",
                    );
                    return None;
                }
            }
        }
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Template { quasis, exprs }, span))
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::Member { .. })
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn logical(left: Expr, op: LogicalOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
