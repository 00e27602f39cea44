use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of errors stored before the rest are only counted.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Scope,
    Structure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => f.write_str("syntax"),
            Self::Scope => f.write_str("scope"),
            Self::Structure => f.write_str("structure"),
        }
    }
}

/// Numeric error code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_DELIMITER: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);
    pub const UNEXPECTED_CHARACTER: Self = Self(104);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(105);
    pub const MISSING_INITIALIZER: Self = Self(106);
    pub const ILLEGAL_JUMP: Self = Self(107);

    // ── Scope errors (E500–E599) ──
    pub const DUPLICATE_PARAMETER: Self = Self(500);

    // ── Structure errors (E600–E699) ──
    pub const NESTING_LIMIT_EXCEEDED: Self = Self(600);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Structure,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured error found while lexing or parsing a mission program.
///
/// The UI renders these fields directly; it never parses the display string.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{span}: {code} [{category}] {message}")]
pub struct GalaxyError {
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    /// Derived from `code`.
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl GalaxyError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Errors collected by one front-end stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<GalaxyError>,
    pub total_errors: usize,
}

impl CompileErrors {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Record an error; only the first [`MAX_ERRORS`] are stored.
    pub fn push_error(&mut self, error: GalaxyError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Whether the stage should stop scanning.
    pub fn at_limit(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Append every error of another stage.
    pub fn extend(&mut self, other: CompileErrors) {
        let hidden = other.total_errors - other.errors.len();
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += hidden;
    }

    pub fn first(&self) -> Option<&GalaxyError> {
        self.errors.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: ErrorCode) -> GalaxyError {
        GalaxyError::new(
            "mission.js",
            code,
            "expected ')', got ';'",
            Span::new(3, 14, 3, 14),
            "const xs = of(1, 2;",
        )
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::MISSING_INITIALIZER.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::DUPLICATE_PARAMETER.category(), ErrorCategory::Scope);
        assert_eq!(
            ErrorCode::NESTING_LIMIT_EXCEEDED.category(),
            ErrorCategory::Structure
        );
    }

    #[test]
    fn test_error_display() {
        let err = sample(ErrorCode::UNEXPECTED_TOKEN);
        assert_eq!(err.to_string(), "3:14: E100 [syntax] expected ')', got ';'");
    }

    #[test]
    fn test_error_json_shape() {
        let err = sample(ErrorCode::UNCLOSED_DELIMITER).with_suggestion("close the call with ')'");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 101);
        assert_eq!(json["category"], "syntax");
        assert_eq!(json["line"], 3);
        assert_eq!(json["column"], 14);
        assert_eq!(json["suggestion"], "close the call with ')'");

        let plain = serde_json::to_value(sample(ErrorCode::UNCLOSED_DELIMITER)).unwrap();
        assert!(plain.get("suggestion").is_none());
    }

    #[test]
    fn test_compile_errors_limit() {
        let mut errs = CompileErrors::empty();
        for _ in 0..25 {
            errs.push_error(sample(ErrorCode::UNEXPECTED_TOKEN));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.at_limit());
    }

    #[test]
    fn test_compile_errors_extend_keeps_hidden_count() {
        let mut lex = CompileErrors::empty();
        for _ in 0..22 {
            lex.push_error(sample(ErrorCode::UNEXPECTED_CHARACTER));
        }
        let mut all = CompileErrors::empty();
        all.push_error(sample(ErrorCode::UNEXPECTED_TOKEN));
        all.extend(lex);
        assert_eq!(all.total_errors, 23);
        assert_eq!(all.errors.len(), MAX_ERRORS);
        assert_eq!(all.first().map(|e| e.code), Some(ErrorCode::UNEXPECTED_TOKEN));
    }
}
