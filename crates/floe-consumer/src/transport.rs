use floe_core::{
    error::{Error, ErrorKind, ErrorOrigin, TransportKind},
    method::Method,
};
use thiserror::Error as ThisError;

///
/// TransportRequest
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

///
/// TransportResponse
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

///
/// Transport
///
/// Injected collaborator that moves one request to the remote service and
/// returns its raw response. Connection management, retries, TLS, and
/// timeout enforcement all live behind this seam; the executor only maps
/// the reported outcome.
///

pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

///
/// TransportError
///
/// Failure classes a transport may report. Cancellation and timeout stay
/// distinct through the whole taxonomy; nothing is folded into a generic
/// failure.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request cancelled: {0}")]
    Cancelled(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Timeout(_) => TransportKind::Timeout,
            TransportError::Cancelled(_) => TransportKind::Cancelled,
            TransportError::Connection(_) => TransportKind::Connection,
        };

        Self::transport(kind, err.to_string())
    }
}

///
/// OpKind
/// What the request addressed. Fixes the not-found flavor of the status
/// mapping, so callers see the same taxonomy for local and remote failures.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpKind {
    CollectionRead,
    EntityAccess,
    LinkAccess,
}

/// Deterministic status → taxonomy mapping.
#[must_use]
pub fn status_to_error(status: u16, op: OpKind) -> Error {
    let message = format!("remote returned status {status}");

    match status {
        404 | 410 => match op {
            OpKind::CollectionRead => {
                Error::new(ErrorKind::UnknownEntitySet, ErrorOrigin::Consumer, message)
            }
            OpKind::EntityAccess => {
                Error::new(ErrorKind::EntityNotFound, ErrorOrigin::Consumer, message)
            }
            OpKind::LinkAccess => {
                Error::new(ErrorKind::LinkNotFound, ErrorOrigin::Consumer, message)
            }
        },

        400 => Error::new(ErrorKind::MalformedKey, ErrorOrigin::Consumer, message),

        405 | 409 | 412 => {
            Error::new(ErrorKind::ConstraintViolation, ErrorOrigin::Consumer, message)
        }

        408 | 504 => Error::transport(TransportKind::Timeout, message),

        501 => Error::unsupported(ErrorOrigin::Consumer, message),

        _ => Error::transport(TransportKind::Protocol, message),
    }
}
