//! Error types for parsing, configuration, storage and the report service.

use std::path::PathBuf;
use thiserror::Error;

/// A fatal problem with one classified line.
///
/// Parsing is fail-fast: the first `ParseError` aborts the whole file and
/// nothing from that file is stored.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number in the uploaded file
    pub line: u64,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The line has fewer fields than the layout of its event kind requires.
    #[error("{event} field '{field}' at index {index} is out of range (line has {len} fields)")]
    FieldOutOfRange {
        event: &'static str,
        field: &'static str,
        index: usize,
        len: usize,
    },

    /// A numeric field did not parse.
    #[error("{event} field '{field}' has invalid numeric value '{value}'")]
    InvalidNumber {
        event: &'static str,
        field: &'static str,
        value: String,
    },

    /// The `month/day hh:mm:ss.fff` prefix did not form a valid date-time.
    #[error("invalid timestamp '{raw}'")]
    InvalidTimestamp { raw: String },
}

impl ParseErrorKind {
    pub fn at(self, line: u64) -> ParseError {
        ParseError { line, kind: self }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error '{}': {source}", path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config '{field}' = '{value}' is out of range, expected {expected}")]
    ValueOutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("stored report '{}' is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Owner or report id that cannot be used as a storage key
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("storage lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A blocking storage task panicked or was cancelled
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
