//! Token types for the mission-language lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the mission language and
//! [`Token`], which pairs a kind with a source [`Span`].

use galaxy_types::Span;
use std::fmt;

/// Reserved words of the mission language.
///
/// `of` and `from` are deliberately absent: `of` is a stream factory and
/// both are only special in `for ... of` and `import ... from` positions.
pub const ALL_KEYWORDS: &[&str] = &[
    // Declarations (4)
    "const", "let", "var", "function",
    // Control flow (9)
    "if", "else", "for", "while", "return", "throw", "break", "continue", "import",
    // Literals (4)
    "true", "false", "null", "undefined",
    // Operators (2)
    "new", "typeof",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    /// The parser uses it for automatic semicolon insertion.
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }

    /// Returns `true` if this token is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the mission language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Numeric literal: `42`, `3.14`, `1e3`, `0xff`
    NumberLit(f64),
    /// Quoted string literal: `"hello"` or `'hello'`
    StringLiteral(String),
    /// Template literal without substitutions: `` `hello` ``
    TemplateLiteral(String),
    True,
    False,
    Null,
    Undefined,

    // ── Template substitution ────────────────────────────────

    /// Text before the first `${` of a template literal.
    TemplateStart(String),
    /// Text between a `}` and the next `${`.
    TemplatePart(String),
    /// Text after the last `}` up to the closing backtick.
    TemplateEnd(String),
    /// The `${` that opens a substitution.
    InterpolationStart,
    /// The `}` that closes a substitution.
    InterpolationEnd,

    // ── Identifiers ──────────────────────────────────────────

    /// User-defined identifier: `numbers$`, `results`, `_tmp`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    Const,
    Let,
    Var,
    Function,
    If,
    Else,
    For,
    While,
    Return,
    Throw,
    Break,
    Continue,
    Import,
    New,
    Typeof,

    // ── Operators ────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Bang,
    AmpAmp,
    PipePipe,
    Question,
    QuestionQuestion,
    /// `=>`
    FatArrow,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,

    // ── Special ──────────────────────────────────────────────
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for user identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "const" => TokenKind::Const,
            "let" => TokenKind::Let,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "throw" => TokenKind::Throw,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "import" => TokenKind::Import,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "new" => TokenKind::New,
            "typeof" => TokenKind::Typeof,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Const
                | TokenKind::Let
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Import
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Undefined
                | TokenKind::New
                | TokenKind::Typeof
        )
    }

    /// Compound assignment operators and plain `=`.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Literals
            TokenKind::NumberLit(n) => write!(f, "{n}"),
            TokenKind::StringLiteral(s) => write!(f, "\"{s}\""),
            TokenKind::TemplateLiteral(s) => write!(f, "`{s}`"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Null => f.write_str("null"),
            TokenKind::Undefined => f.write_str("undefined"),
            // Templates
            TokenKind::TemplateStart(_) => f.write_str("template start"),
            TokenKind::TemplatePart(_) => f.write_str("template part"),
            TokenKind::TemplateEnd(_) => f.write_str("template end"),
            TokenKind::InterpolationStart => f.write_str("${"),
            TokenKind::InterpolationEnd => f.write_str("substitution end"),
            TokenKind::Identifier(s) => f.write_str(s),
            // Keywords
            TokenKind::Const => f.write_str("const"),
            TokenKind::Let => f.write_str("let"),
            TokenKind::Var => f.write_str("var"),
            TokenKind::Function => f.write_str("function"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::For => f.write_str("for"),
            TokenKind::While => f.write_str("while"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Throw => f.write_str("throw"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::Continue => f.write_str("continue"),
            TokenKind::Import => f.write_str("import"),
            TokenKind::New => f.write_str("new"),
            TokenKind::Typeof => f.write_str("typeof"),
            // Operators
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::PlusPlus => f.write_str("++"),
            TokenKind::MinusMinus => f.write_str("--"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::PlusEq => f.write_str("+="),
            TokenKind::MinusEq => f.write_str("-="),
            TokenKind::StarEq => f.write_str("*="),
            TokenKind::SlashEq => f.write_str("/="),
            TokenKind::PercentEq => f.write_str("%="),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::EqEqEq => f.write_str("==="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::BangEqEq => f.write_str("!=="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::AmpAmp => f.write_str("&&"),
            TokenKind::PipePipe => f.write_str("||"),
            TokenKind::Question => f.write_str("?"),
            TokenKind::QuestionQuestion => f.write_str("??"),
            TokenKind::FatArrow => f.write_str("=>"),
            // Punctuation
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
