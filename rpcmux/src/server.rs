//! The dispatch pipeline.
//!
//! [`Server::serve`] turns one HTTP request into one HTTP response:
//!
//! 1. negotiate a codec from `Content-Type` (415 plain text on failure)
//! 2. bind a codec request and resolve the method name
//! 3. run the interceptor
//! 4. look up the method, allocate arguments and reply, decode
//! 5. run the before-hook and the validator
//! 6. invoke the method
//! 7. run the after-hook
//! 8. encode the reply or the recorded error through the codec
//!
//! The first failure is recorded in [`RequestInfo`] and skips the remaining
//! decode, validate and invoke steps. Hooks still run where noted.

use crate::registry::{CodecRegistry, ServiceRegistry};
use http::{
    HeaderValue, Method,
    header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
};
use rpcmux_core::{
    After, Before, Codec, DynAfter, DynBefore, DynInterceptor, DynValidator, HttpRequest,
    HttpResponse, Interceptor, RegistrationError, RequestInfo, ResponseWriter, RpcError, Service,
    Validator,
};
use std::{fmt, sync::Arc};

/// Behavior switches of a [`Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Answer non-`POST` requests with `405` before negotiation.
    pub require_post: bool,
    /// Send `x-content-type-options: nosniff` with codec-rendered responses.
    pub nosniff: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_post: false,
            nosniff: true,
        }
    }
}

#[derive(Default)]
struct Hooks {
    intercept: Option<Box<dyn DynInterceptor>>,
    before: Option<Box<dyn DynBefore>>,
    validate: Option<Box<dyn DynValidator>>,
    after: Option<Box<dyn DynAfter>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("intercept", &self.intercept.is_some())
            .field("before", &self.before.is_some())
            .field("validate", &self.validate.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct Inner {
    services: ServiceRegistry,
    codecs: CodecRegistry,
    hooks: Hooks,
    config: ServerConfig,
}

/// A frozen dispatcher, cheap to clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

impl Server {
    /// Start configuring a server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Registered services.
    pub fn services(&self) -> &ServiceRegistry {
        &self.inner.services
    }

    /// Registered codecs.
    pub fn codecs(&self) -> &CodecRegistry {
        &self.inner.codecs
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Whether `qualified` (`Service.Method`) can be dispatched to.
    pub fn has_method(&self, qualified: &str) -> bool {
        self.inner.services.has_method(qualified)
    }

    /// Serve one request.
    pub async fn serve(&self, request: HttpRequest) -> HttpResponse {
        let mut w = ResponseWriter::new();
        self.serve_into(&mut w, request).await;
        w.into_response()
    }

    /// Serve one request into an existing writer.
    pub async fn serve_into(&self, w: &mut ResponseWriter, request: HttpRequest) {
        let inner = &*self.inner;

        if inner.config.require_post && request.method() != Method::POST {
            let err = RpcError::MethodNotAllowed(request.method().clone());
            w.write_plain(err.status(), &err.to_string());
            return;
        }

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        let codec: &dyn Codec = match inner.codecs.select(&content_type) {
            Ok(codec) => codec,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%err, "rpc content negotiation failed");
                w.write_plain(err.status(), &err.to_string());
                return;
            }
        };

        let mut codec_request = codec.new_request(&request);
        let mut info = RequestInfo::new(request);
        match codec_request.method() {
            Ok(method) => info.method = method,
            Err(err) => info.fail(RpcError::Method(err)),
        }

        if let Some(intercept) = &inner.hooks.intercept {
            if let Some(replacement) = intercept.intercept_dyn(&info).await {
                info.request = replacement;
            }
        }

        let mut reply = None;
        if !info.is_err() {
            match inner.services.lookup(&info.method) {
                Err(err) => info.fail(err),
                Ok(spec) => {
                    let mut args = spec.new_args();
                    let mut out = spec.new_reply();

                    if let Err(err) = codec_request.read_request(&mut *args) {
                        info.fail(RpcError::Decode(err));
                    }
                    if !info.is_err() {
                        if let Some(before) = &inner.hooks.before {
                            before.before_dyn(&info).await;
                        }
                    }
                    if !info.is_err() {
                        if let Some(validate) = &inner.hooks.validate {
                            if let Err(err) = validate.validate_dyn(&info, &*args).await {
                                info.fail(RpcError::Validation(err));
                            }
                        }
                    }
                    if !info.is_err() {
                        let result = {
                            let ctx = info.context();
                            spec.invoke(&ctx, &*args, &mut *out, w.headers_mut()).await
                        };
                        if let Err(err) = result {
                            info.fail(RpcError::Invocation(err));
                        }
                    }
                    reply = Some(out);
                }
            }
        }

        #[cfg(feature = "tracing")]
        match &info.error {
            None => tracing::debug!(method = %info.method, "rpc call succeeded"),
            Some(err) => tracing::debug!(
                method = %info.method,
                status = info.status.as_u16(),
                %err,
                "rpc call failed"
            ),
        }

        if let Some(after) = &inner.hooks.after {
            after.after_dyn(&info).await;
        }

        if inner.config.nosniff {
            w.headers_mut()
                .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        }
        match &info.error {
            Some(err) => codec_request.write_error(w, info.status, err),
            None => {
                if let Some(reply) = &reply {
                    codec_request.write_response(w, &**reply);
                }
            }
        }
    }
}

/// Builder for constructing a [`Server`].
///
/// Registration happens here; [`ServerBuilder::build`] freezes the registries
/// and hooks so that requests are served without locking.
#[derive(Debug, Default)]
pub struct ServerBuilder {
    services: ServiceRegistry,
    codecs: CodecRegistry,
    hooks: Hooks,
    config: ServerConfig,
}

impl ServerBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service; see [`ServiceRegistry::register`].
    pub fn register_service<S: Service>(
        self,
        receiver: S,
        name: &str,
    ) -> Result<Self, RegistrationError> {
        self.register_shared(Arc::new(receiver), name)
    }

    /// Register a service whose receiver is shared with other code.
    pub fn register_shared<S: Service>(
        mut self,
        receiver: Arc<S>,
        name: &str,
    ) -> Result<Self, RegistrationError> {
        self.services.register(receiver, name)?;
        Ok(self)
    }

    /// Register a codec for a media-type token, replacing any previous one.
    pub fn register_codec<C: Codec>(mut self, codec: C, token: &str) -> Self {
        self.codecs.register(codec, token);
        self
    }

    /// Set the interceptor.
    pub fn intercept<I: Interceptor>(mut self, hook: I) -> Self {
        self.hooks.intercept = Some(Box::new(hook));
        self
    }

    /// Set the before-hook.
    pub fn before<B: Before>(mut self, hook: B) -> Self {
        self.hooks.before = Some(Box::new(hook));
        self
    }

    /// Set the validator.
    pub fn validate<V: Validator>(mut self, hook: V) -> Self {
        self.hooks.validate = Some(Box::new(hook));
        self
    }

    /// Set the after-hook.
    pub fn after<A: After>(mut self, hook: A) -> Self {
        self.hooks.after = Some(Box::new(hook));
        self
    }

    /// Answer non-`POST` requests with `405`. Off by default.
    pub fn require_post(mut self, on: bool) -> Self {
        self.config.require_post = on;
        self
    }

    /// Send `x-content-type-options: nosniff`. On by default.
    pub fn nosniff(mut self, on: bool) -> Self {
        self.config.nosniff = on;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Freeze into a [`Server`].
    pub fn build(self) -> Server {
        Server {
            inner: Arc::new(Inner {
                services: self.services,
                codecs: self.codecs,
                hooks: self.hooks,
                config: self.config,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::future::{self, BoxFuture};
    use http::StatusCode;
    use rpcmux_core::{BoxError, Context};
    use rpcmux_std::testing::MockCodec;

    #[derive(Clone, Default)]
    struct Word(String);

    impl fmt::Display for Word {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    struct Echo;

    fn say<'a>(
        _: &'a Echo,
        _: &'a Context<'a>,
        req: &'a Word,
        res: &'a mut Word,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        res.0 = req.0.clone();
        Box::pin(future::ready(Ok(())))
    }

    impl Service for Echo {
        fn methods() -> Vec<rpcmux_core::Method<Self>> {
            vec![rpcmux_core::Method::new("Say", say)]
        }
    }

    fn server() -> Server {
        Server::builder()
            .register_service(Echo, "")
            .unwrap()
            .register_codec(MockCodec::<Word, Word>::new(Word("hi".into())), "mock")
            .build()
    }

    fn post(path: &str) -> HttpRequest {
        http::Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "mock")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn serves_and_sets_nosniff() {
        let response = server().serve(post("/Echo.Say")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"hi");
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[tokio::test]
    async fn nosniff_can_be_disabled() {
        let server = Server::builder()
            .register_service(Echo, "")
            .unwrap()
            .register_codec(MockCodec::<Word, Word>::new(Word::default()), "mock")
            .nosniff(false)
            .build();
        let response = server.serve(post("/Echo.Say")).await;
        assert!(!response.headers().contains_key(X_CONTENT_TYPE_OPTIONS));
    }

    #[tokio::test]
    async fn verbs_are_not_enforced_by_default() {
        let mut request = post("/Echo.Say");
        *request.method_mut() = Method::GET;
        let response = server().serve(request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn require_post_rejects_other_verbs() {
        let server = Server::builder()
            .register_service(Echo, "")
            .unwrap()
            .register_codec(MockCodec::<Word, Word>::new(Word::default()), "mock")
            .require_post(true)
            .build();
        assert!(server.config().require_post);

        let mut request = post("/Echo.Say");
        *request.method_mut() = Method::PUT;
        let response = server.serve(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.body().as_ref(),
            b"rpc: POST method required, received PUT"
        );

        let response = server.serve(post("/Echo.Say")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ill_formed_method_is_400() {
        let response = server().serve(post("/EchoSay")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.body().as_ref(),
            b"rpc: service/method request ill-formed: \"EchoSay\""
        );
    }

    #[test]
    fn server_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Server>();

        fn assert_send<F: std::future::Future + Send>(_: F) {}
        let server = server();
        assert_send(server.serve(post("/Echo.Say")));
    }
}
