//! # Service Layer (Method tables)
//!
//! A [`Service`] is a receiver type that publishes a table of remotely
//! callable [`Method`]s. Only two method shapes exist:
//!
//! ```text
//! (context, &Args, &mut Reply) -> Result<(), E>
//! (context, &Args, &mut Reply, &mut HeaderMap) -> Result<(), E>
//! ```
//!
//! The `#[rpcmux::service]` attribute builds the table from an `impl` block,
//! skipping every method of any other shape. Tables can also be written by
//! hand with [`Method::new`] and [`Method::with_headers`].
//!
//! Argument and reply types are allocated zero-valued through [`Default`] for
//! every request and then travel type-erased through codecs and hooks.

use crate::{
    codec::{Args, Reply},
    error::BoxError,
    request::Context,
};
use futures::future::{self, BoxFuture};
use http::HeaderMap;
use std::{any::type_name, fmt, sync::Arc};

/// Bound required of argument and reply types.
pub trait Value: Default + Send + Sync + 'static {}
impl<T: Default + Send + Sync + 'static> Value for T {}

/// Entry point of a method taking `(context, &args, &mut reply)`.
pub type PlainFn<S, A, R> =
    for<'a> fn(&'a S, &'a Context<'a>, &'a A, &'a mut R) -> BoxFuture<'a, Result<(), BoxError>>;

/// Entry point of a method that also receives the outgoing headers.
pub type HeaderFn<S, A, R> = for<'a> fn(
    &'a S,
    &'a Context<'a>,
    &'a A,
    &'a mut R,
    &'a mut HeaderMap,
) -> BoxFuture<'a, Result<(), BoxError>>;

/// The two accepted method shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodShape {
    /// `(context, &Args, &mut Reply)`
    Plain,
    /// `(context, &Args, &mut Reply, &mut HeaderMap)`
    WithHeaders,
}

impl MethodShape {
    /// Whether the method receives the outgoing header map.
    pub fn accepts_headers(self) -> bool {
        matches!(self, MethodShape::WithHeaders)
    }
}

/// A receiver type with a table of remotely callable methods.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an rpcmux Service",
    label = "missing `Service` implementation",
    note = "Annotate an `impl {Self}` block with `#[rpcmux::service]` or implement `Service` by hand."
)]
pub trait Service: Send + Sync + Sized + 'static {
    /// Name used when the service is registered without an explicit one.
    ///
    /// Defaults to the last path segment of the Rust type name.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// The methods this service exposes.
    fn methods() -> Vec<Method<Self>>;
}

/// One exposed method of service `S`.
pub struct Method<S> {
    name: String,
    shape: MethodShape,
    arg_type: &'static str,
    reply_type: &'static str,
    handler: Arc<dyn ErasedMethod<S>>,
}

impl<S: Send + Sync + 'static> Method<S> {
    /// A method of shape [`MethodShape::Plain`].
    pub fn new<A: Value, R: Value>(name: impl Into<String>, f: PlainFn<S, A, R>) -> Self {
        Self::from_entry(name.into(), MethodShape::Plain, Entry::Plain(f))
    }

    /// A method of shape [`MethodShape::WithHeaders`].
    pub fn with_headers<A: Value, R: Value>(
        name: impl Into<String>,
        f: HeaderFn<S, A, R>,
    ) -> Self {
        Self::from_entry(name.into(), MethodShape::WithHeaders, Entry::WithHeaders(f))
    }

    fn from_entry<A: Value, R: Value>(
        name: String,
        shape: MethodShape,
        entry: Entry<S, A, R>,
    ) -> Self {
        Self {
            name,
            shape,
            arg_type: type_name::<A>(),
            reply_type: type_name::<R>(),
            handler: Arc::new(entry),
        }
    }
}

impl<S> Method<S> {
    /// Method name, without the service prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which of the two shapes the method has.
    pub fn shape(&self) -> MethodShape {
        self.shape
    }

    /// Rust type name of the argument type.
    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }

    /// Rust type name of the reply type.
    pub fn reply_type(&self) -> &'static str {
        self.reply_type
    }

    /// A zero-valued argument.
    pub fn new_args(&self) -> Box<Args> {
        self.handler.new_args()
    }

    /// A zero-valued reply.
    pub fn new_reply(&self) -> Box<Reply> {
        self.handler.new_reply()
    }

    /// Call the method on `receiver`.
    ///
    /// `headers` is only handed to methods of shape
    /// [`MethodShape::WithHeaders`]. Argument or reply values of the wrong
    /// type are reported as an error rather than a panic.
    pub fn invoke<'a>(
        &'a self,
        receiver: &'a S,
        ctx: &'a Context<'a>,
        args: &'a Args,
        reply: &'a mut Reply,
        headers: &'a mut HeaderMap,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        self.handler.call(receiver, ctx, args, reply, headers)
    }
}

impl<S> Clone for Method<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            shape: self.shape,
            arg_type: self.arg_type,
            reply_type: self.reply_type,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S> fmt::Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("arg_type", &self.arg_type)
            .field("reply_type", &self.reply_type)
            .finish()
    }
}

// ============================================================================
// Type erasure
// ============================================================================

trait ErasedMethod<S>: Send + Sync {
    fn new_args(&self) -> Box<Args>;
    fn new_reply(&self) -> Box<Reply>;
    fn call<'a>(
        &'a self,
        receiver: &'a S,
        ctx: &'a Context<'a>,
        args: &'a Args,
        reply: &'a mut Reply,
        headers: &'a mut HeaderMap,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

enum Entry<S, A, R> {
    Plain(PlainFn<S, A, R>),
    WithHeaders(HeaderFn<S, A, R>),
}

impl<S, A, R> ErasedMethod<S> for Entry<S, A, R>
where
    S: Send + Sync + 'static,
    A: Value,
    R: Value,
{
    fn new_args(&self) -> Box<Args> {
        Box::new(A::default())
    }

    fn new_reply(&self) -> Box<Reply> {
        Box::new(R::default())
    }

    fn call<'a>(
        &'a self,
        receiver: &'a S,
        ctx: &'a Context<'a>,
        args: &'a Args,
        reply: &'a mut Reply,
        headers: &'a mut HeaderMap,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        let Some(args) = args.downcast_ref::<A>() else {
            return mismatch("argument", type_name::<A>());
        };
        let Some(reply) = reply.downcast_mut::<R>() else {
            return mismatch("reply", type_name::<R>());
        };
        match self {
            Entry::Plain(f) => f(receiver, ctx, args, reply),
            Entry::WithHeaders(f) => f(receiver, ctx, args, reply, headers),
        }
    }
}

fn mismatch<'a>(what: &str, expected: &str) -> BoxFuture<'a, Result<(), BoxError>> {
    let err: BoxError = format!("rpc: {what} is not of type {expected}").into();
    Box::pin(future::ready(Err(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderValue;

    #[derive(Default)]
    struct Pair {
        a: i64,
        b: i64,
    }

    #[derive(Default)]
    struct Product {
        result: i64,
    }

    struct Arith;

    impl Arith {
        fn multiply<'a>(
            &'a self,
            _ctx: &'a Context<'a>,
            args: &'a Pair,
            reply: &'a mut Product,
        ) -> BoxFuture<'a, Result<(), BoxError>> {
            Box::pin(async move {
                reply.result = args.a * args.b;
                Ok(())
            })
        }

        fn tagged<'a>(
            &'a self,
            _ctx: &'a Context<'a>,
            args: &'a Pair,
            reply: &'a mut Product,
            headers: &'a mut HeaderMap,
        ) -> BoxFuture<'a, Result<(), BoxError>> {
            Box::pin(async move {
                headers.insert("x-tag", HeaderValue::from_static("arith"));
                reply.result = args.a + args.b;
                Ok(())
            })
        }
    }

    impl Service for Arith {
        fn methods() -> Vec<Method<Self>> {
            vec![
                Method::new("Multiply", Arith::multiply),
                Method::with_headers("Tagged", Arith::tagged),
            ]
        }
    }

    fn request() -> crate::request::HttpRequest {
        http::Request::builder().body(Bytes::new()).unwrap()
    }

    #[test]
    fn default_type_name_is_last_segment() {
        assert_eq!(Arith::type_name(), "Arith");
    }

    #[tokio::test]
    async fn invoke_plain_method() {
        let methods = Arith::methods();
        let multiply = &methods[0];
        assert_eq!(multiply.shape(), MethodShape::Plain);
        assert!(multiply.arg_type().ends_with("Pair"));

        let req = request();
        let ctx = Context::new(&req, "Arith.Multiply");
        let args: Box<Args> = Box::new(Pair { a: 2, b: 3 });
        let mut reply = multiply.new_reply();
        let mut headers = HeaderMap::new();

        multiply
            .invoke(&Arith, &ctx, &*args, &mut *reply, &mut headers)
            .await
            .unwrap();

        assert_eq!(reply.downcast_ref::<Product>().unwrap().result, 6);
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn invoke_header_method() {
        let methods = Arith::methods();
        let tagged = &methods[1];
        assert!(tagged.shape().accepts_headers());

        let req = request();
        let ctx = Context::new(&req, "Arith.Tagged");
        let mut args = tagged.new_args();
        *args.downcast_mut::<Pair>().unwrap() = Pair { a: 2, b: 3 };
        let mut reply = tagged.new_reply();
        let mut headers = HeaderMap::new();

        tagged
            .invoke(&Arith, &ctx, &*args, &mut *reply, &mut headers)
            .await
            .unwrap();

        assert_eq!(reply.downcast_ref::<Product>().unwrap().result, 5);
        assert_eq!(headers["x-tag"], "arith");
    }

    #[tokio::test]
    async fn wrong_argument_type_is_an_error() {
        let methods = Arith::methods();
        let req = request();
        let ctx = Context::new(&req, "Arith.Multiply");
        let mut reply = methods[0].new_reply();
        let mut headers = HeaderMap::new();

        let err = methods[0]
            .invoke(&Arith, &ctx, &"nope", &mut *reply, &mut headers)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("rpc: argument is not of type"));
    }
}
