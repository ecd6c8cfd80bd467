//! Unified engine error model.
//! One enum covers every failure the engine surfaces to an embedder: lexing
//! and parsing faults, semantic misuse, missing adapter capabilities,
//! adapter-side failures, and transaction bracket failures. Nothing is
//! retried; every error is fatal for the current script.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineError {
    /// Lexer or parser cannot continue. `position` is a byte offset into the
    /// statement text when known.
    #[error("syntax error at {position}: {message}")]
    Syntax { message: String, position: usize },

    /// Well-formed text with an invalid meaning, e.g. DELETE of a variable
    /// that is not the scoped pattern variable.
    #[error("semantic error: {message}")]
    Semantic { message: String },

    /// The statement needs an optional storage operation the adapter does
    /// not provide.
    #[error("adapter does not support {op}")]
    FeatureUnsupported { op: String },

    /// Propagated verbatim from the storage adapter.
    #[error("{message}")]
    Storage { message: String },

    /// Non-arithmetic evaluation fault (arithmetic soft-errors surface as
    /// NaN values instead).
    #[error("evaluation error: {message}")]
    Evaluation { message: String },

    /// Adapter failed inside begin/commit/rollback.
    #[error("transaction error: {message}")]
    Transaction { message: String },
}

impl EngineError {
    pub fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        EngineError::Syntax { message: message.into(), position }
    }

    pub fn semantic<S: Into<String>>(message: S) -> Self {
        EngineError::Semantic { message: message.into() }
    }

    pub fn unsupported<S: Into<String>>(op: S) -> Self {
        EngineError::FeatureUnsupported { op: op.into() }
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        EngineError::Storage { message: message.into() }
    }

    pub fn evaluation<S: Into<String>>(message: S) -> Self {
        EngineError::Evaluation { message: message.into() }
    }

    pub fn transaction<S: Into<String>>(message: S) -> Self {
        EngineError::Transaction { message: message.into() }
    }

    /// True for errors raised before any execution started (pure text faults).
    pub fn is_parse_error(&self) -> bool {
        matches!(self, EngineError::Syntax { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
