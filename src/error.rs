//! Error types for the language frontend and evaluator.
//!
//! Every error that can interrupt the `lex -> parse -> evaluate` pipeline is
//! modeled here as a `thiserror`-derived enum, one per phase, wrapped in the
//! top-level [`LangError`]. The top-level entry points in `lib.rs` translate
//! these into the `result.err` shape of the external interface: a `kind`
//! tag, a human message, and an optional line/column.

use thiserror::Error;

/// Errors raised while turning source text into tokens.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },

    #[error("unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("unterminated block comment starting at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },

    #[error("numeric literal '{lexeme}' out of range at line {line}, column {column}")]
    InvalidNumber { lexeme: String, line: usize, column: usize },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedCharacter { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::UnterminatedComment { line, column }
            | LexError::InvalidNumber { line, column, .. } => (*line, *column),
        }
    }
}

/// Errors raised while building the AST from a token stream.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found {got} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        got: String,
        line: usize,
        column: usize,
    },

    #[error("unexpected end of input at line {line}, column {column}")]
    UnexpectedEOF { line: usize, column: usize },

    #[error("expected an identifier at line {line}, column {column}")]
    ExpectedIdentifier { line: usize, column: usize },

    #[error("expected a type tag (int, float, string, bool) at line {line}, column {column}")]
    ExpectedTypeTag { line: usize, column: usize },

    #[error("expected closing '{kind}' at line {line}, column {column}")]
    ExpectedClosing {
        kind: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::UnexpectedToken { line, column, .. }
            | ParseError::UnexpectedEOF { line, column }
            | ParseError::ExpectedIdentifier { line, column }
            | ParseError::ExpectedTypeTag { line, column }
            | ParseError::ExpectedClosing { line, column, .. } => (*line, *column),
        }
    }
}

/// Errors raised while executing the AST.
///
/// Runtime errors don't always carry a source position - a `TypeError`
/// raised deep inside an expression tree has none to attach unless the
/// evaluator stamped one on, so `position` is `None` for most variants.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("undefined function: {0}")]
    UndefinedFunction(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("conversion error: {0}")]
    ConversionError(String),

    #[error("return statement outside of a function")]
    ReturnOutsideFunction,

    #[error("no standard input is attached to this evaluation")]
    InputUnavailable,
}

/// Top-level error for the whole pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LangError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LangError {
    /// The `result.err.kind` tag from the external interface.
    pub fn kind(&self) -> &'static str {
        match self {
            LangError::Lex(_) => "LexError",
            LangError::Parse(_) => "ParseError",
            LangError::Runtime(_) => "RuntimeError",
        }
    }

    /// The `result.err.line`/`column` pair, when the error originated in the
    /// lexer or parser. Runtime errors generally carry no position.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            LangError::Lex(e) => Some(e.position()),
            LangError::Parse(e) => Some(e.position()),
            LangError::Runtime(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LangError>;
