//! # rpcmux-core
//!
//! Core traits for the rpcmux HTTP-RPC dispatch framework.
//!
//! This crate has minimal dependencies and is meant to be imported by codec
//! and hook implementations that don't need the full `rpcmux` server.
//!
//! # Pipeline Vocabulary
//!
//! ## Services ([`Service`], [`Method`])
//!
//! A receiver type publishes a table of methods. Each method has one of two
//! shapes ([`MethodShape`]), with concrete argument and reply types that are
//! allocated zero-valued per request.
//!
//! ## Codecs ([`Codec`], [`CodecRequest`])
//!
//! The wire format is entirely pluggable. A codec is chosen by the request's
//! `Content-Type` and binds a [`CodecRequest`] that names the method, decodes
//! the arguments and encodes the reply or error.
//!
//! ## Hooks ([`Interceptor`], [`Before`], [`Validator`], [`After`])
//!
//! Fixed extension points of the dispatch pipeline, each seeing the
//! per-request [`RequestInfo`].
//!
//! # Error Types
//!
//! - [`RpcError`] - Failures recorded while serving a request
//! - [`RegistrationError`] - Failures returned by service registration

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod codec;
mod error;
mod hook;
mod request;
mod response;
mod service;

// Re-exports
pub use codec::{Args, Codec, CodecRequest, Reply};
pub use error::{BoxError, RegistrationError, RpcError};
pub use hook::{
    After, Before, DynAfter, DynBefore, DynInterceptor, DynValidator, Interceptor, Validator,
};
pub use request::{Context, HttpRequest, RequestInfo};
pub use response::{HttpResponse, ResponseWriter};
pub use service::{HeaderFn, Method, MethodShape, PlainFn, Service, Value};
