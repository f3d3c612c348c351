//! # Error Types
//!
//! The gateway error taxonomy. Crate-local errors (crypto, content storage,
//! ledger, processing) convert into [`GatewayError`] at their crate boundary,
//! so callers only ever match on one enum.

use thiserror::Error;

/// Every failure a gateway operation can surface to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The index holds no record for the requested identity or version.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record for this (base identity, version) already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The record exists but is a tombstone.
    #[error("already deleted: {0}")]
    AlreadyDeleted(String),

    /// Malformed identifier or payload.
    #[error("incorrect format: {0}")]
    Format(String),

    /// A required index attribute is missing (corrupt record).
    #[error("required field is empty: {0}")]
    FieldEmpty(String),

    /// Any encryption or decryption failure.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// The record exists but its content has not settled yet.
    #[error("still processing: {0}")]
    StillProcessing(String),

    /// Optimistic-concurrency mismatch. Carries the current last version.
    #[error("precondition failed: current version is {current}")]
    PreconditionFailed {
        /// Identifier of the current last version.
        current: String,
    },

    /// The acting identity may not perform this operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// An external call did not finish in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`GatewayError`], used for metrics labels and matching
/// without caring about context text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AlreadyDeleted,
    Format,
    FieldEmpty,
    Encryption,
    StillProcessing,
    PreconditionFailed,
    AccessDenied,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::AlreadyDeleted => "already_deleted",
            ErrorKind::Format => "format",
            ErrorKind::FieldEmpty => "field_empty",
            ErrorKind::Encryption => "encryption",
            ErrorKind::StillProcessing => "still_processing",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            GatewayError::AlreadyDeleted(_) => ErrorKind::AlreadyDeleted,
            GatewayError::Format(_) => ErrorKind::Format,
            GatewayError::FieldEmpty(_) => ErrorKind::FieldEmpty,
            GatewayError::Encryption(_) => ErrorKind::Encryption,
            GatewayError::StillProcessing(_) => ErrorKind::StillProcessing,
            GatewayError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            GatewayError::AccessDenied(_) => ErrorKind::AccessDenied,
            GatewayError::Timeout(_) => ErrorKind::Timeout,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Prefix the message with the operation and identifiers involved.
    ///
    /// `PreconditionFailed` is returned unchanged: its payload is the current
    /// version and must stay machine-readable.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        let wrap = |msg: String| format!("{ctx}: {msg}");
        match self {
            GatewayError::NotFound(m) => GatewayError::NotFound(wrap(m)),
            GatewayError::AlreadyExists(m) => GatewayError::AlreadyExists(wrap(m)),
            GatewayError::AlreadyDeleted(m) => GatewayError::AlreadyDeleted(wrap(m)),
            GatewayError::Format(m) => GatewayError::Format(wrap(m)),
            GatewayError::FieldEmpty(m) => GatewayError::FieldEmpty(wrap(m)),
            GatewayError::Encryption(m) => GatewayError::Encryption(wrap(m)),
            GatewayError::StillProcessing(m) => GatewayError::StillProcessing(wrap(m)),
            e @ GatewayError::PreconditionFailed { .. } => e,
            GatewayError::AccessDenied(m) => GatewayError::AccessDenied(wrap(m)),
            GatewayError::Timeout(m) => GatewayError::Timeout(wrap(m)),
            GatewayError::Internal(m) => GatewayError::Internal(wrap(m)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
