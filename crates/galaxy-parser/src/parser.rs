//! Core parser infrastructure: token cursor, error reporting, helpers.

use galaxy_lexer::token::{Token, TokenKind};
use galaxy_types::ast::{Ident, Program};
use galaxy_types::{CompileErrors, ErrorCode, GalaxyError, SourceFile, Span};

/// Maximum nesting of statements and expressions combined.
pub const MAX_NESTING: u32 = 64;

/// The mission-language parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects errors and attempts recovery when possible.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    file_name: String,
    errors: CompileErrors,
    /// Current statement/expression nesting depth.
    pub(crate) depth: u32,
    /// Enclosing loops within the current function body.
    pub(crate) loop_depth: u32,
}

/// Result of parsing.
pub struct ParseResult {
    /// `None` when the program could not be parsed at all.
    pub program: Option<Program>,
    pub errors: CompileErrors,
}

impl ParseResult {
    /// The program, but only if parsing produced no errors.
    pub fn into_program(self) -> Result<Program, CompileErrors> {
        match self.program {
            Some(program) if !self.errors.has_errors() => Ok(program),
            _ => Err(self.errors),
        }
    }
}

impl<'src> Parser<'src> {
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map_or(Span::point(1, 1), |t| t.span);
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            pos: 0,
            file_name: source_file.name.clone(),
            source_file,
            errors: CompileErrors::empty(),
            depth: 0,
            loop_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// The current token. The stream always ends with `Eof`, which is
    /// returned again once the cursor reaches it.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::point(1, 1),
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Whether a line break separates the current token from the previous one.
    pub(crate) fn newline_before_current(&self) -> bool {
        self.peek().newline_before
    }

    /// Is the current token the identifier `name`? (`of`, `from`)
    pub(crate) fn check_contextual(&self, name: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(n) if n == name)
    }

    // ── Statement Termination ─────────────────────────────────────────────────

    /// Consume a `;`, or accept an automatically inserted one before a line
    /// break, a `}` or the end of input.
    pub(crate) fn consume_semicolon(&mut self) {
        if self.eat(&TokenKind::Semicolon) {
            return;
        }
        if self.at_end() || self.check_exact(&TokenKind::RBrace) || self.newline_before_current() {
            return;
        }
        self.error_at_current(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected ';', got '{}'", self.peek_kind()),
        );
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            let code = if self.at_end() && is_closing(expected) {
                ErrorCode::UNCLOSED_DELIMITER
            } else {
                ErrorCode::UNEXPECTED_TOKEN
            };
            self.error_at_current(
                code,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            kind => {
                if kind.is_keyword() {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("'{kind}' is a reserved word and cannot be used as a name"),
                    );
                } else {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected identifier, got '{kind}'"),
                    );
                }
                None
            }
        }
    }

    /// A property name after `.` or as an object key: identifiers and
    /// reserved words alike (`subscriber.new`, `{ default: 1 }`).
    pub(crate) fn expect_property_name(&mut self) -> Option<Ident> {
        let kind = self.peek_kind().clone();
        match &kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ if kind.is_keyword() => {
                let span = self.advance().span;
                Some(Ident::new(kind.to_string(), span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected property name, got '{kind}'"),
                );
                None
            }
        }
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Enter one nesting level. Returns `false` (after reporting) when the
    /// limit is exceeded; the caller must not call [`Parser::leave`] then.
    pub(crate) fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                format!("maximum nesting depth is {MAX_NESTING}"),
            );
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Parse a loop body, where `break` and `continue` are allowed.
    pub(crate) fn loop_body<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.loop_depth += 1;
        let body = parse(self);
        self.loop_depth -= 1;
        body
    }

    /// Parse a function body: loops outside it do not count.
    pub(crate) fn function_body<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let outer = std::mem::take(&mut self.loop_depth);
        let body = parse(self);
        self.loop_depth = outer;
        body
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = GalaxyError::new(&self.file_name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = GalaxyError::new(&self.file_name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(error);
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.at_limit()
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until a likely statement boundary.
    /// Used after an error to resume at a known-good position.
    pub(crate) fn synchronize(&mut self) {
        let start = self.pos;
        while !self.at_end() {
            if self.eat(&TokenKind::Semicolon) {
                return;
            }
            if self.pos > start && self.newline_before_current() {
                return;
            }
            match self.peek_kind() {
                TokenKind::Const
                | TokenKind::Let
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::Import
                | TokenKind::RBrace
                    if self.pos > start =>
                {
                    return
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program` AST.
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        ParseResult {
            program,
            errors: self.errors,
        }
    }

    /// `Program = { Statement }`
    fn parse_program(&mut self) -> Option<Program> {
        let start = self.current_span();
        let mut body = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.check_exact(&TokenKind::RBrace) {
                let span = self.current_span();
                self.error_with_suggestion(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "unexpected '}'",
                    span,
                    "remove the extra closing brace",
                );
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        let span = start.merge(self.previous_span());
        Some(Program { body, span })
    }
}

fn is_closing(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket | TokenKind::InterpolationEnd
    )
}
