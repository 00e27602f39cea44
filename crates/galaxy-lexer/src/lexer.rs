//! Core mission-language lexer: converts source text to a token stream.
//!
//! Features:
//! - JavaScript-style literals: decimal, exponent and `0x` numbers, single
//!   and double quoted strings, template literals with `${expr}` substitution
//!   tracked via a mode stack
//! - `//` and `/* */` comments stripped
//! - Newlines are not tokens; each token records whether a line break
//!   preceded it so the parser can insert semicolons
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use galaxy_types::{CompileErrors, ErrorCode, GalaxyError, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// Tracks whether we're scanning code or the text of a template literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside a template literal, scanning text until `` ` `` or `${`.
    Template,
    /// Inside a `${...}` substitution. `brace_depth` counts nested `{}` so
    /// the closing `}` of the substitution can be told apart.
    Interpolation { brace_depth: u32 },
}

/// The mission-language lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`galaxy_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    file_name: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    errors: CompileErrors,
    mode_stack: Vec<Mode>,
    /// Tokens to emit before the next scan (used for substitutions).
    pending: Vec<Token>,
    /// A line break was skipped since the last token.
    saw_newline: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            file_name: &source_file.name,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
            mode_stack: vec![Mode::Normal],
            pending: Vec::new(),
            saw_newline: false,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.at_limit() {
                break;
            }

            if let Some(pending) = self.pending.pop() {
                tokens.push(pending);
                continue;
            }

            let mut token = match self.current_mode() {
                Mode::Template => self.scan_template_continuation(),
                Mode::Normal | Mode::Interpolation { .. } => self.scan_normal(),
            };
            token.newline_before = std::mem::take(&mut self.saw_newline);

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);

            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column.
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn text_from(&self, start: usize) -> &'src str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("")
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = GalaxyError::new(self.file_name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = GalaxyError::new(self.file_name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments, remembering any line break.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'\n') => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNCLOSED_DELIMITER,
                        "Unterminated block comment",
                        span,
                        "close the comment with */",
                    );
                    return;
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                Some(b'\n') => {
                    self.saw_newline = true;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Normal-mode scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token outside template text.
    fn scan_normal(&mut self) -> Token {
        self.skip_trivia();

        if self.errors.at_limit() {
            return Token::new(TokenKind::Eof, self.current_span());
        }

        if self.at_end() {
            if self
                .mode_stack
                .iter()
                .any(|m| matches!(m, Mode::Template | Mode::Interpolation { .. }))
            {
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unterminated template literal",
                    self.current_span(),
                );
            }
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.current_span());
        };

        match ch {
            // ── Literals ──
            b'"' | b'\'' => self.scan_string(ch, start_line, start_col),
            b'`' => self.scan_template(start_line, start_col),
            b'0'..=b'9' => self.scan_number(start, start_line, start_col),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                self.scan_number(start, start_line, start_col)
            }

            // ── Identifiers & keywords ──
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => {
                self.scan_identifier(start, start_line, start_col)
            }

            // ── Operators ──
            b'+' => match self.peek() {
                Some(b'+') => {
                    self.advance();
                    self.token_from(TokenKind::PlusPlus, start_line, start_col)
                }
                Some(b'=') => {
                    self.advance();
                    self.token_from(TokenKind::PlusEq, start_line, start_col)
                }
                _ => self.token_from(TokenKind::Plus, start_line, start_col),
            },
            b'-' => match self.peek() {
                Some(b'-') => {
                    self.advance();
                    self.token_from(TokenKind::MinusMinus, start_line, start_col)
                }
                Some(b'=') => {
                    self.advance();
                    self.token_from(TokenKind::MinusEq, start_line, start_col)
                }
                _ => self.token_from(TokenKind::Minus, start_line, start_col),
            },
            b'*' => self.with_eq(TokenKind::Star, TokenKind::StarEq, start_line, start_col),
            b'/' => self.with_eq(TokenKind::Slash, TokenKind::SlashEq, start_line, start_col),
            b'%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq, start_line, start_col),

            b'=' => match (self.peek(), self.peek_at(1)) {
                (Some(b'='), Some(b'=')) => {
                    self.advance();
                    self.advance();
                    self.token_from(TokenKind::EqEqEq, start_line, start_col)
                }
                (Some(b'='), _) => {
                    self.advance();
                    self.token_from(TokenKind::EqEq, start_line, start_col)
                }
                (Some(b'>'), _) => {
                    self.advance();
                    self.token_from(TokenKind::FatArrow, start_line, start_col)
                }
                _ => self.token_from(TokenKind::Eq, start_line, start_col),
            },

            b'!' => match (self.peek(), self.peek_at(1)) {
                (Some(b'='), Some(b'=')) => {
                    self.advance();
                    self.advance();
                    self.token_from(TokenKind::BangEqEq, start_line, start_col)
                }
                (Some(b'='), _) => {
                    self.advance();
                    self.token_from(TokenKind::BangEq, start_line, start_col)
                }
                _ => self.token_from(TokenKind::Bang, start_line, start_col),
            },

            b'<' => self.with_eq(TokenKind::Less, TokenKind::LessEq, start_line, start_col),
            b'>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq, start_line, start_col),

            b'&' if self.peek() == Some(b'&') => {
                self.advance();
                self.token_from(TokenKind::AmpAmp, start_line, start_col)
            }
            b'|' if self.peek() == Some(b'|') => {
                self.advance();
                self.token_from(TokenKind::PipePipe, start_line, start_col)
            }

            b'?' => {
                if self.peek() == Some(b'?') {
                    self.advance();
                    self.token_from(TokenKind::QuestionQuestion, start_line, start_col)
                } else {
                    self.token_from(TokenKind::Question, start_line, start_col)
                }
            }

            // ── Punctuation ──
            b'.' => self.token_from(TokenKind::Dot, start_line, start_col),
            b'(' => self.token_from(TokenKind::LParen, start_line, start_col),
            b')' => self.token_from(TokenKind::RParen, start_line, start_col),
            b'[' => self.token_from(TokenKind::LBracket, start_line, start_col),
            b']' => self.token_from(TokenKind::RBracket, start_line, start_col),
            b',' => self.token_from(TokenKind::Comma, start_line, start_col),
            b':' => self.token_from(TokenKind::Colon, start_line, start_col),
            b';' => self.token_from(TokenKind::Semicolon, start_line, start_col),

            b'{' => {
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    *brace_depth += 1;
                }
                self.token_from(TokenKind::LBrace, start_line, start_col)
            }

            b'}' => {
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    if *brace_depth == 0 {
                        // Closes the substitution; back to template text.
                        self.pop_mode();
                        self.push_mode(Mode::Template);
                        return self.token_from(TokenKind::InterpolationEnd, start_line, start_col);
                    }
                    *brace_depth -= 1;
                }
                self.token_from(TokenKind::RBrace, start_line, start_col)
            }

            _ => {
                // Skip the rest of a multi-byte character.
                while matches!(self.peek(), Some(b) if b & 0xC0 == 0x80) {
                    self.advance();
                }
                let span = self.span_from(start_line, start_col);
                let text = self.text_from(start);
                let message = format!("Unexpected character '{text}'");
                match ch {
                    b'&' | b'|' => self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        message,
                        span,
                        format!("use '{text}{text}' for logical operators"),
                    ),
                    _ => self.emit_error(ErrorCode::UNEXPECTED_CHARACTER, message, span),
                }
                self.scan_normal()
            }
        }
    }

    fn token_from(&self, kind: TokenKind, start_line: u32, start_col: u32) -> Token {
        Token::new(kind, self.span_from(start_line, start_col))
    }

    /// `op` or `op=` depending on the next byte.
    fn with_eq(&mut self, plain: TokenKind, eq: TokenKind, line: u32, col: u32) -> Token {
        if self.peek() == Some(b'=') {
            self.advance();
            Token::new(eq, self.span_from(line, col))
        } else {
            Token::new(plain, self.span_from(line, col))
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        let first = self.source[start];

        let value = if first == b'0' && matches!(self.peek(), Some(b'x' | b'X')) {
            self.advance();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
                self.advance();
            }
            u64::from_str_radix(self.text_from(digits_start), 16)
                .ok()
                .map(|v| v as f64)
        } else {
            // `first` is a digit or a leading '.'
            if first != b'.' {
                self.skip_digits();
                if self.peek() == Some(b'.') {
                    self.advance();
                }
            }
            self.skip_digits();
            if matches!(self.peek(), Some(b'e' | b'E')) {
                let exp_sign = self.peek_at(1);
                let exp_digit = match exp_sign {
                    Some(b'+' | b'-') => self.peek_at(2),
                    other => other,
                };
                if matches!(exp_digit, Some(b'0'..=b'9')) {
                    self.advance();
                    if matches!(exp_sign, Some(b'+' | b'-')) {
                        self.advance();
                    }
                    self.skip_digits();
                }
            }
            self.text_from(start).parse::<f64>().ok()
        };

        // `3in`, `0xg`: an identifier may not start right after a number.
        if matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$') {
            while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
            {
                self.advance();
            }
            let span = self.span_from(start_line, start_col);
            let text = self.text_from(start);
            self.emit_error(
                ErrorCode::INVALID_NUMBER,
                format!("Invalid number literal '{text}'"),
                span,
            );
            return Token::new(TokenKind::NumberLit(0.0), span);
        }

        let span = self.span_from(start_line, start_col);
        match value {
            Some(v) => Token::new(TokenKind::NumberLit(v), span),
            None => {
                let text = self.text_from(start);
                self.emit_error(
                    ErrorCode::INVALID_NUMBER,
                    format!("Invalid number literal '{text}'"),
                    span,
                );
                Token::new(TokenKind::NumberLit(0.0), span)
            }
        }
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = self.text_from(start);
        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // Strings & templates
    // ─────────────────────────────────────────────────────────────

    /// Scan a quoted string after its opening quote.
    fn scan_string(&mut self, quote: u8, start_line: u32, start_col: u32) -> Token {
        let mut buf = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                        format!("close the string with {}", quote as char),
                    );
                    return Token::new(TokenKind::StringLiteral(into_string(buf)), span);
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Token::new(
                        TokenKind::StringLiteral(into_string(buf)),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'\\') => self.scan_escape_sequence(&mut buf),
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan a template literal after its opening backtick.
    fn scan_template(&mut self, start_line: u32, start_col: u32) -> Token {
        match self.scan_template_text(start_line, start_col) {
            TemplateStop::Close(text) => Token::new(
                TokenKind::TemplateLiteral(text),
                self.span_from(start_line, start_col),
            ),
            TemplateStop::Substitution(text, interp_span) => {
                self.push_mode(Mode::Interpolation { brace_depth: 0 });
                self.pending
                    .push(Token::new(TokenKind::InterpolationStart, interp_span));
                Token::new(
                    TokenKind::TemplateStart(text),
                    self.span_from(start_line, start_col),
                )
            }
        }
    }

    /// Continue template text after a substitution's closing `}`.
    fn scan_template_continuation(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        match self.scan_template_text(start_line, start_col) {
            TemplateStop::Close(text) => {
                self.pop_mode();
                Token::new(
                    TokenKind::TemplateEnd(text),
                    self.span_from(start_line, start_col),
                )
            }
            TemplateStop::Substitution(text, interp_span) => {
                self.pop_mode();
                self.push_mode(Mode::Interpolation { brace_depth: 0 });
                self.pending
                    .push(Token::new(TokenKind::InterpolationStart, interp_span));
                Token::new(
                    TokenKind::TemplatePart(text),
                    self.span_from(start_line, start_col),
                )
            }
        }
    }

    fn scan_template_text(&mut self, start_line: u32, start_col: u32) -> TemplateStop {
        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated template literal",
                        span,
                        "close the template with `",
                    );
                    return TemplateStop::Close(into_string(buf));
                }
                Some(b'`') => {
                    self.advance();
                    return TemplateStop::Close(into_string(buf));
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    let interp_line = self.line;
                    let interp_col = self.col;
                    self.advance();
                    self.advance();
                    let interp_span = self.span_from(interp_line, interp_col);
                    return TemplateStop::Substitution(into_string(buf), interp_span);
                }
                Some(b'\\') => self.scan_escape_sequence(&mut buf),
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence starting at the `\`, appending its value.
    fn scan_escape_sequence(&mut self, buf: &mut Vec<u8>) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        let escaped = match self.advance() {
            Some(b'n') => '\n',
            Some(b't') => '\t',
            Some(b'r') => '\r',
            Some(b'0') => '\0',
            Some(b'b') => '\u{8}',
            Some(b'v') => '\u{b}',
            Some(b'f') => '\u{c}',
            // Line continuation
            Some(b'\n') => return,
            Some(b'u') => match self.scan_unicode_escape() {
                Some(c) => c,
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        "Invalid unicode escape sequence",
                        span,
                    );
                    return;
                }
            },
            Some(ch) if ch.is_ascii() => ch as char,
            Some(ch) => {
                // Identity escape of a multi-byte character.
                buf.push(ch);
                return;
            }
            None => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unexpected end of file in escape sequence",
                    span,
                );
                return;
            }
        };
        let mut tmp = [0u8; 4];
        buf.extend_from_slice(escaped.encode_utf8(&mut tmp).as_bytes());
    }

    /// `\uXXXX` or `\u{X...}` after the `u`.
    fn scan_unicode_escape(&mut self) -> Option<char> {
        let braced = self.peek() == Some(b'{');
        if braced {
            self.advance();
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
            if !braced && self.pos - digits_start == 4 {
                break;
            }
            self.advance();
        }
        let digits = self.text_from(digits_start);
        if braced {
            if self.peek() != Some(b'}') {
                return None;
            }
            self.advance();
        } else if digits.len() != 4 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
    }
}

/// Where a run of template text stopped.
enum TemplateStop {
    /// At the closing backtick.
    Close(String),
    /// At a `${`, with the span of the `${`.
    Substitution(String, Span),
}

fn into_string(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
