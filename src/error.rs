//! Errors raised while generating a specialized map.

use crate::syntax::{PrintError, SyntaxError};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The category a template declaration is dispatched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclKind {
    Function,
    Type,
    Value,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeclKind::Function => "function",
            DeclKind::Type => "type",
            DeclKind::Value => "value",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error)]
pub enum GenError {
    // Caller input
    #[error("invalid map type `{literal}`: {reason}")]
    InvalidMapType { literal: String, reason: String },

    #[error("invalid {what} name `{name}`: {reason}")]
    InvalidIdentifier {
        what: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("failed to load config '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    // Template integrity
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("unrecognized {kind} `{name}`")]
    Unrecognized { kind: DeclKind, name: String },

    #[error("{kind} `{name}` was never matched")]
    NeverMatched { kind: DeclKind, name: String },

    #[error("mismatch values length: {0}")]
    ValueArity(usize),

    #[error("unexpected shape of `{decl}`: {reason}")]
    UnexpectedShape { decl: String, reason: String },

    #[error("rename collision: `{0}` is declared more than once")]
    RenameCollision(String),

    #[error("declaration registry was used after it failed")]
    RegistryAborted,

    // I/O
    #[error("failed to read template '{path}': {source}")]
    TemplateRead { path: PathBuf, source: io::Error },

    #[error("cannot locate GOROOT: {0}")]
    GoRoot(String),

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    // Output
    #[error("{0}")]
    Print(#[from] PrintError),

    #[error("`{command}` failed: {reason}")]
    PostProcess { command: String, reason: String },
}

impl GenError {
    pub fn shape(decl: &str, reason: impl Into<String>) -> Self {
        GenError::UnexpectedShape {
            decl: decl.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = GenError::Unrecognized {
            kind: DeclKind::Function,
            name: "Swap".to_string(),
        };
        assert_eq!(err.to_string(), "unrecognized function `Swap`");

        let err = GenError::NeverMatched {
            kind: DeclKind::Type,
            name: "entry".to_string(),
        };
        assert_eq!(err.to_string(), "type `entry` was never matched");

        assert_eq!(GenError::ValueArity(2).to_string(), "mismatch values length: 2");
    }

    #[test]
    fn test_syntax_error_passes_through() {
        let err: GenError = SyntaxError::new("expected type", "map.go", 3, 7).into();
        assert_eq!(err.to_string(), "error: expected type\n  --> map.go:3:7");
    }
}
