use log::debug;
use thiserror::Error;

use crate::token::{Span, Token};

#[derive(Debug, Error)]
pub enum LoxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[line {line}] Error: {message}")]
    Scan {
        line: usize,
        span: Span,
        message: String,
    },

    #[error("[line {line}] Error {location}: {message}")]
    Parse {
        line: usize,
        span: Span,
        location: String,
        message: String,
    },

    #[error("[line {line}] Error {location}: {message}")]
    Resolution {
        line: usize,
        span: Span,
        location: String,
        message: String,
    },

    #[error("{message}\n[line {line}]")]
    Runtime {
        line: usize,
        span: Span,
        lexeme: String,
        message: String,
    },
}

impl LoxError {
    pub fn scan<S: Into<String>>(line: usize, span: Span, message: S) -> Self {
        let message = message.into();
        debug!("scan error at line {} ({:?}): {}", line, span, message);
        LoxError::Scan {
            line,
            span,
            message,
        }
    }

    pub fn parse<S: Into<String>>(token: &Token, message: S) -> Self {
        let message = message.into();
        debug!("parse error at '{}' (line {}): {}", token.lexeme, token.line, message);
        LoxError::Parse {
            line: token.line,
            span: token.span.clone(),
            location: token.location(),
            message,
        }
    }

    pub fn resolution<S: Into<String>>(token: &Token, message: S) -> Self {
        let message = message.into();
        debug!("resolution error at '{}' (line {}): {}", token.lexeme, token.line, message);
        LoxError::Resolution {
            line: token.line,
            span: token.span.clone(),
            location: token.location(),
            message,
        }
    }

    pub fn runtime<S: Into<String>>(token: &Token, message: S) -> Self {
        let message = message.into();
        debug!("runtime error at '{}' (line {}): {}", token.lexeme, token.line, message);
        LoxError::Runtime {
            line: token.line,
            span: token.span.clone(),
            lexeme: token.lexeme.clone(),
            message,
        }
    }

    /// Source line the error points at, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Io(_) => None,
            LoxError::Scan { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolution { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
        }
    }

    /// Byte range of the offending source text.
    pub fn span(&self) -> Option<&Span> {
        match self {
            LoxError::Io(_) => None,
            LoxError::Scan { span, .. }
            | LoxError::Parse { span, .. }
            | LoxError::Resolution { span, .. }
            | LoxError::Runtime { span, .. } => Some(span),
        }
    }

    /// The bare message, without the `[line N]` decoration.
    pub fn message(&self) -> String {
        match self {
            LoxError::Io(e) => e.to_string(),
            LoxError::Scan { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolution { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
        }
    }

    /// Scan, parse and resolution errors: the program must not be run.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Scan { .. } | LoxError::Parse { .. } | LoxError::Resolution { .. }
        )
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime { .. })
    }
}
