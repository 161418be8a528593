//! # rpcmux - HTTP-RPC Dispatch with Pluggable Codecs
//!
//! `rpcmux` exposes methods of plain Rust service types as remotely callable
//! procedures over HTTP. The wire format is not fixed: codecs are registered
//! per media type and chosen by content negotiation for every request.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rpcmux::{BoxError, Context, Server};
//!
//! #[derive(Default)]
//! struct Pair { a: i64, b: i64 }
//!
//! #[derive(Default)]
//! struct Product { result: i64 }
//!
//! struct Arith;
//!
//! #[rpcmux::service]
//! impl Arith {
//!     pub async fn multiply(&self, _ctx: &Context<'_>, req: &Pair, res: &mut Product) -> Result<(), BoxError> {
//!         res.result = req.a * req.b;
//!         Ok(())
//!     }
//! }
//!
//! let server = Server::builder()
//!     .register_service(Arith, "")?
//!     .register_codec(MyCodec, "application/x-my-rpc")
//!     .build();
//!
//! let response = server.serve(request).await;
//! ```
//!
//! ## Pipeline
//!
//! See [`server`] for the exact order in which codecs, hooks and the method
//! are called for each request.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Lets `#[service]` expansions inside this crate resolve `::rpcmux` paths.
extern crate self as rpcmux;

pub use rpcmux_core::{
    // Codec
    Args,
    // Hooks
    After,
    Before,
    // Error types
    BoxError,
    Codec,
    CodecRequest,
    // Requests and responses
    Context,
    DynAfter,
    DynBefore,
    DynInterceptor,
    DynValidator,
    // Services
    HeaderFn,
    HttpRequest,
    HttpResponse,
    Interceptor,
    Method,
    MethodShape,
    PlainFn,
    RegistrationError,
    Reply,
    RequestInfo,
    ResponseWriter,
    RpcError,
    Service,
    Validator,
    Value,
};

pub use futures::future::BoxFuture;
pub use bytes;
pub use http;

#[cfg(feature = "macros")]
pub use rpcmux_macros::service;

pub mod registry;
pub mod server;
#[cfg(feature = "tower")]
mod tower_service;

pub use registry::{CodecRegistry, MethodSpec, ServiceRegistry};
pub use server::{Server, ServerBuilder, ServerConfig};

/// Standard hook implementations.
pub mod hooks {
    pub use rpcmux_std::hooks::{LoggingAfter, TypedValidator};
}

/// Testing utilities.
pub mod testing {
    pub use rpcmux_std::testing::{
        CountingValidator, MockCodec, MockCodecError, MockCodecRequest, RecordingHook,
        ReplaceRequest, Snapshot,
    };
}

/// Prelude module - common imports for rpcmux.
///
/// # Usage
///
/// ```rust,ignore
/// use rpcmux::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, Codec, CodecRequest, Context, RequestInfo, ResponseWriter, RpcError, Server,
        Service,
    };
    #[cfg(feature = "macros")]
    pub use crate::service;
}
