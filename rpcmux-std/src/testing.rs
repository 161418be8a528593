//! Testing utilities for rpcmux.
//!
//! This module provides doubles for the collaborators the dispatcher calls
//! into, so pipelines can be exercised without a real wire format.
//!
//! # Features
//!
//! - [`MockCodec`]: A codec that takes the method name from the URI path and
//!   hands out fixed arguments
//! - [`RecordingHook`]: A before/after hook that snapshots every request it sees
//! - [`ReplaceRequest`]: An interceptor that substitutes the request
//! - [`CountingValidator`]: A validator that counts calls and can be told to fail

use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use rpcmux_core::{
    After, Args, Before, BoxError, Codec, CodecRequest, HttpRequest, Interceptor, Reply,
    RequestInfo, ResponseWriter, RpcError, Validator,
};
use std::{
    any::type_name,
    fmt::Display,
    marker::PhantomData,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};
use thiserror::Error;

// ============================================================================
// Mock Codec
// ============================================================================

/// Failures reported by [`MockCodecRequest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MockCodecError {
    /// The request path was empty.
    #[error("mock codec: no method in request path")]
    NoMethod,

    /// The method expects arguments of another type.
    #[error("mock codec: cannot decode into {0}")]
    ArgType(&'static str),
}

/// A codec that decodes every request to the same arguments.
///
/// The method name is the request path without its leading `/`. Replies of
/// type `R` are written with their [`Display`] output; errors as the status
/// plus the error text.
///
/// # Example
///
/// ```rust,ignore
/// let codec = MockCodec::<Service1Request, Service1Response>::new(Service1Request { a: 2, b: 3 });
/// builder.register_codec(codec, "mock");
/// ```
pub struct MockCodec<A, R> {
    args: A,
    _reply: PhantomData<fn() -> R>,
}

impl<A, R> MockCodec<A, R> {
    /// Create a codec that decodes to `args`.
    pub fn new(args: A) -> Self {
        Self {
            args,
            _reply: PhantomData,
        }
    }
}

impl<A, R> Codec for MockCodec<A, R>
where
    A: Clone + Send + Sync + 'static,
    R: Display + 'static,
{
    fn new_request(&self, request: &HttpRequest) -> Box<dyn CodecRequest> {
        Box::new(MockCodecRequest::<A, R> {
            args: self.args.clone(),
            method: request.uri().path().trim_start_matches('/').to_owned(),
            _reply: PhantomData,
        })
    }
}

/// The per-request half of [`MockCodec`].
pub struct MockCodecRequest<A, R> {
    args: A,
    method: String,
    _reply: PhantomData<fn() -> R>,
}

impl<A, R> CodecRequest for MockCodecRequest<A, R>
where
    A: Clone + Send + Sync + 'static,
    R: Display + 'static,
{
    fn method(&self) -> Result<String, BoxError> {
        if self.method.is_empty() {
            return Err(MockCodecError::NoMethod.into());
        }
        Ok(self.method.clone())
    }

    fn read_request(&mut self, args: &mut Args) -> Result<(), BoxError> {
        let slot = args
            .downcast_mut::<A>()
            .ok_or(MockCodecError::ArgType(type_name::<A>()))?;
        *slot = self.args.clone();
        Ok(())
    }

    fn write_response(&self, w: &mut ResponseWriter, reply: &Reply) {
        if let Some(reply) = reply.downcast_ref::<R>() {
            w.write(reply.to_string().as_bytes());
        }
    }

    fn write_error(&self, w: &mut ResponseWriter, status: StatusCode, err: &RpcError) {
        w.write_header(status);
        w.write(err.to_string().as_bytes());
    }
}

// ============================================================================
// Recording Hook
// ============================================================================

/// What a [`RecordingHook`] saw of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Request URI at the time the hook ran.
    pub uri: Uri,
    /// Qualified method name.
    pub method: String,
    /// Recorded status.
    pub status: StatusCode,
    /// Recorded error text, if any.
    pub error: Option<String>,
}

impl Snapshot {
    fn of(info: &RequestInfo) -> Self {
        Self {
            uri: info.request.uri().clone(),
            method: info.method.clone(),
            status: info.status,
            error: info.error.as_ref().map(ToString::to_string),
        }
    }
}

/// A before/after hook that records a [`Snapshot`] of every request.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHook::new();
/// let server = Server::builder().after(recorder.clone()).build();
///
/// server.serve(request).await;
/// assert_eq!(recorder.count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingHook {
    seen: Arc<Mutex<Vec<Snapshot>>>,
}

impl RecordingHook {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots recorded so far, oldest first.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests recorded.
    pub fn count(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record(&self, info: &RequestInfo) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Snapshot::of(info));
    }
}

impl Before for RecordingHook {
    async fn before(&self, info: &RequestInfo) {
        self.record(info);
    }
}

impl After for RecordingHook {
    async fn after(&self, info: &RequestInfo) {
        self.record(info);
    }
}

// ============================================================================
// Replace Request
// ============================================================================

/// An interceptor that substitutes an empty `POST` request to a fixed URI.
#[derive(Debug, Clone)]
pub struct ReplaceRequest {
    uri: Uri,
    calls: Arc<AtomicUsize>,
}

impl ReplaceRequest {
    /// Substitute requests with one addressed to `uri`.
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times the interceptor ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Interceptor for ReplaceRequest {
    async fn intercept(&self, _info: &RequestInfo) -> Option<HttpRequest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut request = http::Request::new(Bytes::new());
        *request.method_mut() = Method::POST;
        *request.uri_mut() = self.uri.clone();
        Some(request)
    }
}

// ============================================================================
// Counting Validator
// ============================================================================

/// A validator that counts invocations and optionally rejects everything.
#[derive(Debug, Clone, Default)]
pub struct CountingValidator {
    calls: Arc<AtomicUsize>,
    reject_with: Option<String>,
}

impl CountingValidator {
    /// A validator that accepts every request.
    pub fn passing() -> Self {
        Self::default()
    }

    /// A validator that rejects every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            reject_with: Some(message.into()),
        }
    }

    /// Number of times the validator ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Validator for CountingValidator {
    async fn validate(&self, _info: &RequestInfo, _args: &Args) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reject_with {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}
