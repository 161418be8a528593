//! # Serialization Layer (Codec)
//!
//! A [`Codec`] is selected per request by content negotiation and binds a
//! fresh [`CodecRequest`] over that request. The codec request is the only
//! component that understands the wire format: it names the target method,
//! decodes the arguments and encodes the reply or the error.
//!
//! Arguments and replies cross this boundary type-erased. The dispatcher
//! allocates them from the method table, so a codec downcasts to the concrete
//! types it knows how to fill.

use crate::{
    error::{BoxError, RpcError},
    request::HttpRequest,
    response::ResponseWriter,
};
use http::StatusCode;
use std::{any::Any, sync::Arc};

/// Decoded method arguments, owned by the dispatcher for one request.
pub type Args = dyn Any + Send + Sync;

/// Method reply, owned by the dispatcher for one request.
pub type Reply = dyn Any + Send + Sync;

/// A pluggable serialization strategy.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Codec",
    label = "missing `Codec` implementation",
    note = "Codecs must implement `new_request` to bind a `CodecRequest` to an incoming request."
)]
pub trait Codec: Send + Sync + 'static {
    /// Bind a codec request over the raw transport request.
    fn new_request(&self, request: &HttpRequest) -> Box<dyn CodecRequest>;
}

impl<C: Codec + ?Sized> Codec for Arc<C> {
    fn new_request(&self, request: &HttpRequest) -> Box<dyn CodecRequest> {
        (**self).new_request(request)
    }
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn new_request(&self, request: &HttpRequest) -> Box<dyn CodecRequest> {
        (**self).new_request(request)
    }
}

/// Codec state bound to a single request.
pub trait CodecRequest: Send {
    /// The qualified `Service.Method` name the request targets.
    fn method(&self) -> Result<String, BoxError>;

    /// Decode the request arguments into `args`.
    fn read_request(&mut self, args: &mut Args) -> Result<(), BoxError>;

    /// Encode a successful reply.
    fn write_response(&self, w: &mut ResponseWriter, reply: &Reply);

    /// Encode a failure with the given status.
    fn write_error(&self, w: &mut ResponseWriter, status: StatusCode, err: &RpcError);
}
