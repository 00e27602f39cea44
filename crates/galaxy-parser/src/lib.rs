//! Mission-language parser: converts a token stream into an AST.

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser, MAX_NESTING};

use galaxy_lexer::Lexer;
use galaxy_types::SourceFile;

/// Lex and parse a source file in one step.
///
/// Lexer errors are reported on their own; the parser only runs on a clean
/// token stream.
pub fn parse_source(source_file: &SourceFile) -> ParseResult {
    let lexed = Lexer::new(source_file).lex();
    if lexed.errors.has_errors() {
        return ParseResult {
            program: None,
            errors: lexed.errors,
        };
    }
    Parser::new(lexed.tokens, source_file).parse()
}
