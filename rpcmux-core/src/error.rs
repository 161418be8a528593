//! Error types for rpcmux.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`RpcError`] - Failures recorded while serving a single request
//! - [`RegistrationError`] - Failures returned to setup code by service registration

use http::{Method, StatusCode};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure recorded while dispatching one request.
///
/// Every variant maps to exactly one HTTP status through [`RpcError::status`].
/// The negotiation variants are rendered as plain text because no codec exists
/// yet; all others go through the negotiated codec's `write_error`.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No Content-Type header and not exactly one registered codec.
    #[error("rpc: missing Content-Type")]
    MissingContentType,

    /// The Content-Type token matches no registered codec.
    #[error("rpc: unrecognized Content-Type: {0}")]
    UnrecognizedContentType(String),

    /// The server requires POST and received another verb.
    #[error("rpc: POST method required, received {0}")]
    MethodNotAllowed(Method),

    /// The qualified method name is not of the form `Service.Method`.
    #[error("rpc: service/method request ill-formed: {0:?}")]
    IllFormedMethod(String),

    /// No registered service exposes the qualified method name.
    #[error("rpc: can't find method {0:?}")]
    MethodNotFound(String),

    /// The codec could not extract a method name from the request.
    #[error(transparent)]
    Method(BoxError),

    /// The codec could not decode the request arguments.
    #[error(transparent)]
    Decode(BoxError),

    /// The validator rejected the decoded arguments.
    #[error(transparent)]
    Validation(BoxError),

    /// The invoked method returned a failure.
    #[error(transparent)]
    Invocation(BoxError),
}

impl RpcError {
    /// The HTTP status this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::MissingContentType | RpcError::UnrecognizedContentType(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            RpcError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the failure happened before a codec was chosen.
    pub fn is_negotiation(&self) -> bool {
        matches!(
            self,
            RpcError::MissingContentType
                | RpcError::UnrecognizedContentType(_)
                | RpcError::MethodNotAllowed(_)
        )
    }
}

/// Errors returned by service registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The receiver exposes no method of a suitable shape.
    #[error("rpc: {0:?} has no exported methods of suitable type")]
    NoSuitableMethods(String),

    /// A service with the same name is already registered.
    #[error("rpc: service already defined: {0:?}")]
    AlreadyDefined(String),

    /// Service names must be non-empty and free of `.`.
    #[error("rpc: invalid service name: {0:?}")]
    InvalidName(String),

    /// The method table lists the same method name twice.
    #[error("rpc: method {method:?} defined twice on service {service:?}")]
    DuplicateMethod {
        /// Service being registered.
        service: String,
        /// Repeated method name.
        method: String,
    },
}
