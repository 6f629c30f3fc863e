//! Error types for the remote gateway.

use std::fmt;

use thiserror::Error;

/// Gateway operation, used to label failures and log events.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// `GET /instances`
    ListInstances,
    /// `GET /snapshots`
    ListSnapshots,
    /// `POST /snapshots`
    CreateSnapshot,
    /// `DELETE /snapshots/{id}`
    DeleteSnapshot,
}

impl Operation {
    /// Status code the provider returns when the operation succeeds.
    #[must_use]
    pub const fn expected_status(self) -> u16 {
        match self {
            Self::ListInstances | Self::ListSnapshots => 200,
            Self::CreateSnapshot => 201,
            Self::DeleteSnapshot => 204,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListInstances => "list instances",
            Self::ListSnapshots => "list snapshots",
            Self::CreateSnapshot => "create snapshot",
            Self::DeleteSnapshot => "delete snapshot",
        })
    }
}

/// Classification of a non-success HTTP status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RejectionKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// Any other status.
    Unknown,
}

impl From<u16> for RejectionKind {
    fn from(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::Unknown => "unknown error",
        })
    }
}

/// Errors raised by [`super::SnapshotGateway`] implementations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GatewayError {
    /// Raised when every attempt failed before an HTTP response arrived.
    #[error("{operation} failed after {attempts} attempt(s): {message}")]
    Transport {
        /// Operation that could not be completed.
        operation: Operation,
        /// Number of attempts made.
        attempts: u32,
        /// Last transport error message.
        message: String,
    },
    /// Raised when the provider answered with an unexpected status.
    #[error("{operation} rejected with status {status} ({kind}): {body}")]
    Rejected {
        /// Operation the provider rejected.
        operation: Operation,
        /// HTTP status code.
        status: u16,
        /// Classification of `status`.
        kind: RejectionKind,
        /// Response body as sent by the provider.
        body: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        /// Operation whose response was malformed.
        operation: Operation,
        /// Parser error message.
        message: String,
    },
}

impl GatewayError {
    /// Builds a rejection for `status`, deriving its classification.
    #[must_use]
    pub fn rejected(operation: Operation, status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            status,
            kind: RejectionKind::from(status),
            body: body.into(),
        }
    }

    /// Returns the operation that failed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Transport { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Decode { operation, .. } => *operation,
        }
    }
}
