//! Error types for NeuralCare core
//!
//! Provides error handling for:
//! - Row store operations (select/insert/update)
//! - Identity operations (sign-up, sign-in, sign-out)
//! - Configuration loading and validation
//! - Parsing of textual enum values coming from the backend

use crate::store::Table;
use std::path::PathBuf;

/// Errors raised by a row store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend rejected or failed the request
    #[error("backend error on {table}: {message}")]
    Backend { table: Table, message: String },

    /// A row could not be decoded into the requested record type
    #[error("failed to decode {table} row: {source}")]
    Decode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded into a row
    #[error("failed to encode {table} record: {source}")]
    Encode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },

    /// Encoded record was not a JSON object
    #[error("record for {0} is not an object")]
    NotAnObject(Table),
}

impl StoreError {
    /// Create backend error for table
    pub fn backend(table: Table, message: impl Into<String>) -> Self {
        Self::Backend {
            table,
            message: message.into(),
        }
    }

    /// Check if error came from the backend rather than local encoding
    #[inline]
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Identity/session errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// E-mail already has an account
    #[error("user already registered: {0}")]
    AlreadyRegistered(String),

    /// Unknown e-mail or wrong password
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Sign-up metadata incomplete for the requested role
    #[error("invalid sign-up metadata: {0}")]
    InvalidMetadata(String),

    /// Identity backend failure
    #[error("identity backend error: {0}")]
    Backend(String),

    /// Row store failure while provisioning or looking up records
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Check if the failure is the caller's input rather than the backend
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered(_) | Self::InvalidCredentials | Self::InvalidMetadata(_)
        )
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or type error
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Values parsed but violate a constraint
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Unknown textual value for a domain enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    /// Enum being parsed
    pub kind: &'static str,
    /// Offending input
    pub value: String,
}

impl ParseEnumError {
    /// Create parse error
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
