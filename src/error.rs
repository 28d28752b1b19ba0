//! Centralised error hierarchy for the **Kix interpreter**.
//!
//! All pipeline stages (scanner, parser, resolver, runtime) convert their
//! failure modes into one of the variants defined here. The `Display` of each
//! variant is exactly the diagnostic line printed by the driver, so callers
//! only ever need `eprintln!("{}", err)`.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::debug;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum KixError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error. `location` is empty, `" at end"` or
    /// `" at '<lexeme>'"`.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure found by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Resolver finding that is reported but does not block execution.
    #[error("[line {line}] Warning{location}: {message}")]
    Lint {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error. Aborts the current run.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error`. Stored as text so the enum stays `Clone`.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for KixError {
    fn from(err: io::Error) -> Self {
        KixError::Io(err.to_string())
    }
}

/// Render the `<location>` part of a token-anchored diagnostic.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl KixError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Lex error: line={}, msg={}", line, message);

        KixError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Parse error: line={}, msg={}", token.line, message);

        KixError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Resolve error: line={}, msg={}", token.line, message);

        KixError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for resolver warnings.
    pub fn lint<S: Into<String>>(token: &Token, msg: S) -> Self {
        KixError::Lint {
            message: msg.into(),
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Runtime error: line={}, msg={}", token.line, message);

        KixError::Runtime {
            message,
            line: token.line,
        }
    }

    /// Lexical, syntax or resolution failure (exit status 65).
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            KixError::Lex { .. } | KixError::Parse { .. } | KixError::Resolve { .. }
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, KixError>;
