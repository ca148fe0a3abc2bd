pub mod ast;
pub mod lexer;
mod parser;
pub mod printer;
pub mod visit;

pub use lexer::{LineTable, Lexer, Pos};
pub use parser::Parser;
pub use printer::{PrintError, Printer, format_expr, format_file};

use thiserror::Error;

/// A lexing or parsing failure, located in its source file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("error: {message}\n  --> {file}:{line}:{column}")]
pub struct SyntaxError {
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: &str, file: &str, line: usize, column: usize) -> Self {
        Self {
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
        }
    }
}

/// Parse a complete Go source file.
pub fn parse_file(filename: &str, source: &str) -> Result<ast::File, SyntaxError> {
    let mut lexer = Lexer::new(filename, source);
    let tokens = lexer.scan_tokens()?;
    let comments = lexer.into_comments();

    let mut parser = Parser::new(filename, source, tokens);
    parser.parse_file(comments)
}

/// Parse a standalone type, rejecting trailing tokens.
pub fn parse_type(filename: &str, source: &str) -> Result<ast::Expr, SyntaxError> {
    let mut lexer = Lexer::new(filename, source);
    let tokens = lexer.scan_tokens()?;

    let mut parser = Parser::new(filename, source, tokens);
    parser.parse_standalone_type()
}
