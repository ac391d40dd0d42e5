use std::fmt;

use crate::model::LedgerSource;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tolerance, duplicate tier, etc.).
    ConfigValidation(String),
    /// A ledger could not be turned into records at all. Stops the whole run.
    LoadFailure { source: LedgerSource, reason: String },
    /// A ledger was handed to the wrong side of the engine.
    SourceMismatch { expected: LedgerSource, found: LedgerSource },
    /// IO error (file read, etc.).
    Io(String),
    /// Report could not be serialized.
    Serialize(String),
}

impl ReconError {
    pub(crate) fn load(source: LedgerSource, reason: impl Into<String>) -> Self {
        Self::LoadFailure { source, reason: reason.into() }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::LoadFailure { source, reason } => {
                write!(f, "cannot load {source} ledger: {reason}")
            }
            Self::SourceMismatch { expected, found } => {
                write!(f, "expected a {expected} ledger, got a {found} ledger")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Serialize(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
