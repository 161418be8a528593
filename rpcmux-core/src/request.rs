//! Per-request state shared with hooks and invoked methods.

use crate::error::RpcError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// The transport request the dispatcher works on: head plus fully read body.
pub type HttpRequest = http::Request<Bytes>;

/// Mutable per-request context passed to hooks.
///
/// Only the dispatcher mutates it. Hooks observe it by reference; the
/// interceptor may replace [`RequestInfo::request`] by returning a new request.
#[derive(Debug)]
pub struct RequestInfo {
    /// The request as currently seen by hooks and methods.
    pub request: HttpRequest,
    /// Qualified `Service.Method` name, empty until the codec resolved it.
    pub method: String,
    /// The single recorded failure, if any.
    pub error: Option<RpcError>,
    /// Status the response will be rendered with.
    pub status: StatusCode,
}

impl RequestInfo {
    /// Create the info for a freshly received request.
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            method: String::new(),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Whether a failure has been recorded.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Record a failure and its status.
    ///
    /// The first recorded failure wins; later ones are dropped.
    pub fn fail(&mut self, error: RpcError) {
        if self.error.is_none() {
            self.status = error.status();
            self.error = Some(error);
        }
    }

    /// Borrow the invocation context for the current request.
    pub fn context(&self) -> Context<'_> {
        Context {
            request: &self.request,
            method: &self.method,
        }
    }
}

/// What an invoked method sees of the request.
#[derive(Debug, Clone, Copy)]
pub struct Context<'r> {
    request: &'r HttpRequest,
    method: &'r str,
}

impl<'r> Context<'r> {
    /// Build a context directly, mostly useful when calling methods in tests.
    pub fn new(request: &'r HttpRequest, method: &'r str) -> Self {
        Self { request, method }
    }

    /// The request as it stands after interception.
    pub fn request(&self) -> &'r HttpRequest {
        self.request
    }

    /// Incoming request headers.
    pub fn headers(&self) -> &'r HeaderMap {
        self.request.headers()
    }

    /// Request extensions, where transports stash peer addresses and the like.
    pub fn extensions(&self) -> &'r http::Extensions {
        self.request.extensions()
    }

    /// Qualified name of the method being invoked.
    pub fn method(&self) -> &'r str {
        self.method
    }
}
