//! Error types for dml-preview.

use thiserror::Error;

use crate::messages::MessageKey;
use crate::statement::StatementKind;

/// The main error type for conversion operations.
///
/// Only [`ConvertError::Precondition`] aborts a whole batch. Every other
/// statement-level variant is turned into a failed
/// [`ConversionRecord`](crate::output::ConversionRecord) by the converter.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The batch failed one of the fixed precondition checks.
    #[error("Precondition failed: {0}")]
    Precondition(PreconditionFailure),

    /// The statement does not match its kind's skeleton.
    #[error("{kind} statement has an invalid shape ({key})")]
    HeaderShape { kind: StatementKind, key: MessageKey },

    /// One or more predicate fragments failed classification.
    #[error("{kind} statement has {} unrecognized predicate(s)", .fragments.len())]
    ParameterGrammar {
        kind: StatementKind,
        fragments: Vec<String>,
    },

    /// A bounded pattern match ran out of time.
    #[error(transparent)]
    Timeout(#[from] MatchTimeout),

    /// Leading keyword is not UPDATE, DELETE or MERGE.
    #[error("Unsupported statement: '{keyword}'")]
    Unsupported { keyword: String },

    /// The rewritten text does not start with SELECT or WITH.
    #[error("{kind} statement did not produce a SELECT")]
    FinalShape { kind: StatementKind, sql: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConvertError {
    /// Create a header shape error.
    pub fn header(kind: StatementKind, key: MessageKey) -> Self {
        Self::HeaderShape { kind, key }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// A bounded pattern match exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Pattern match exceeded its {limit_ms}ms budget")]
pub struct MatchTimeout {
    pub limit_ms: u64,
}

/// The five batch-level precondition causes, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionFailure {
    MissingSqlAndId,
    MissingSql,
    MissingId,
    SmartQuote,
    NoTerminator,
}

impl PreconditionFailure {
    pub fn message_key(self) -> MessageKey {
        match self {
            PreconditionFailure::MissingSqlAndId => MessageKey::DefaultRequirements,
            PreconditionFailure::MissingSql => MessageKey::SqlRequired,
            PreconditionFailure::MissingId => MessageKey::IdRequired,
            PreconditionFailure::SmartQuote => MessageKey::InvalidSingleQuote,
            PreconditionFailure::NoTerminator => MessageKey::NoTerminator,
        }
    }
}

impl std::fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            PreconditionFailure::MissingSqlAndId => "sql and id are empty",
            PreconditionFailure::MissingSql => "sql is empty",
            PreconditionFailure::MissingId => "id is empty",
            PreconditionFailure::SmartQuote => "sql contains a smart quote",
            PreconditionFailure::NoTerminator => "sql has no statement terminator",
        };
        f.write_str(text)
    }
}

/// Result type alias for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
