use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::ConfigEntityKind;

/// Main error type for the console binary and library entry points
#[derive(Error, Debug)]
pub enum ConsoleError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Store errors
    #[error("Load failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Machine-readable reason attached to a single field failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldErrorCode {
    MissingField,
    WrongType,
    Constraint,
    UnknownField,
    KeyMismatch,
}

impl FieldErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "missing-field",
            Self::WrongType => "wrong-type",
            Self::Constraint => "constraint",
            Self::UnknownField => "unknown-field",
            Self::KeyMismatch => "key-mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{} is required", field),
            field,
            code: FieldErrorCode::MissingField,
        }
    }

    pub fn wrong_type(field: impl Into<String>, expected: &str) -> Self {
        let field = field.into();
        Self {
            message: format!("{} must be {}", field, expected),
            field,
            code: FieldErrorCode::WrongType,
        }
    }

    pub fn constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: FieldErrorCode::Constraint,
            message: message.into(),
        }
    }

    pub fn unknown(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{} is not a known field", field),
            field,
            code: FieldErrorCode::UnknownField,
        }
    }

    pub fn key_mismatch(field: impl Into<String>, existing: &str, requested: &str) -> Self {
        Self {
            field: field.into(),
            code: FieldErrorCode::KeyMismatch,
            message: format!("cannot change key from '{}' to '{}'", existing, requested),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

/// Every field failure found for one record, collected rather than short-circuited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub kind: ConfigEntityKind,
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(kind: ConfigEntityKind, errors: Vec<FieldError>) -> Self {
        Self { kind, errors }
    }

    pub fn single(kind: ConfigEntityKind, error: FieldError) -> Self {
        Self {
            kind,
            errors: vec![error],
        }
    }

    pub fn has(&self, field: &str, code: FieldErrorCode) -> bool {
        self.errors
            .iter()
            .any(|e| e.field == field && e.code == code)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{} record rejected: {}", self.kind, joined.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Failure reported by a remote implementation, before the store classifies it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// List/load failure. Existing records stay untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{kind}: transport failure: {message}")]
    Transport {
        kind: ConfigEntityKind,
        message: String,
    },

    #[error("{kind}: server returned {status}: {body}")]
    Status {
        kind: ConfigEntityKind,
        status: u16,
        body: String,
    },

    #[error("{kind}: invalid response: {message}")]
    Decode {
        kind: ConfigEntityKind,
        message: String,
    },

    #[error("{kind}: no response within {elapsed_ms}ms")]
    Timeout {
        kind: ConfigEntityKind,
        elapsed_ms: u64,
    },
}

impl FetchError {
    pub fn from_remote(kind: ConfigEntityKind, err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(message) => Self::Transport { kind, message },
            RemoteError::Status { status, body } => Self::Status { kind, status, body },
            RemoteError::Decode(message) => Self::Decode { kind, message },
        }
    }
}

/// Create/update/toggle failure. The optimistic value has been rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{kind} '{key}' does not exist")]
    UnknownKey {
        kind: ConfigEntityKind,
        key: String,
    },

    #[error("{kind} '{key}' already exists")]
    DuplicateKey {
        kind: ConfigEntityKind,
        key: String,
    },

    #[error("{kind} '{key}': transport failure: {message}")]
    Transport {
        kind: ConfigEntityKind,
        key: String,
        message: String,
    },

    #[error("{kind} '{key}': server returned {status}: {body}")]
    Status {
        kind: ConfigEntityKind,
        key: String,
        status: u16,
        body: String,
    },

    #[error("{kind} '{key}': invalid response: {message}")]
    Decode {
        kind: ConfigEntityKind,
        key: String,
        message: String,
    },

    #[error("{kind} '{key}': no response within {elapsed_ms}ms")]
    Timeout {
        kind: ConfigEntityKind,
        key: String,
        elapsed_ms: u64,
    },
}

impl CommitError {
    pub fn from_remote(kind: ConfigEntityKind, key: &str, err: RemoteError) -> Self {
        let key = key.to_string();
        match err {
            RemoteError::Transport(message) => Self::Transport { kind, key, message },
            RemoteError::Status { status, body } => Self::Status {
                kind,
                key,
                status,
                body,
            },
            RemoteError::Decode(message) => Self::Decode { kind, key, message },
        }
    }

    /// True when the failure happened before anything was sent
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnknownKey { .. } | Self::DuplicateKey { .. }
        )
    }
}

impl From<ValidationErrors> for CommitError {
    fn from(err: ValidationErrors) -> Self {
        CommitError::Validation(err)
    }
}

/// The last failure a store observed, kept for the presentation layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Commit(#[from] CommitError),
}
