#![allow(dead_code)]

use bytes::Bytes;
use http::{HeaderValue, Method, header::CONTENT_TYPE, header::SET_COOKIE};
use rpcmux::{BoxError, Context, HttpRequest, Server, testing::MockCodec};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

// ============================================================================
// Test Value Types
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Service1Request {
    pub a: i64,
    pub b: i64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Service1Response {
    pub result: i64,
}

impl fmt::Display for Service1Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}

// ============================================================================
// Test Services
// ============================================================================

#[derive(Default)]
pub struct Service1 {
    pub calls: Arc<AtomicUsize>,
}

impl Service1 {
    pub fn counting(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[rpcmux::service]
impl Service1 {
    pub async fn multiply(
        &self,
        _ctx: &Context<'_>,
        req: &Service1Request,
        res: &mut Service1Response,
    ) -> Result<(), BoxError> {
        self.record_call();
        res.result = req.a * req.b;
        Ok(())
    }

    pub fn multiply_with_headers(
        &self,
        _ctx: &Context<'_>,
        req: &Service1Request,
        res: &mut Service1Response,
        header: &mut http::HeaderMap,
    ) -> Result<(), BoxError> {
        self.record_call();
        header.append(SET_COOKIE, HeaderValue::from_static("mycookie=delicious"));
        res.result = req.a * req.b;
        Ok(())
    }

    pub async fn divide(
        &self,
        _ctx: &Context<'_>,
        req: &Service1Request,
        res: &mut Service1Response,
    ) -> Result<(), String> {
        self.record_call();
        if req.b == 0 {
            return Err("division by zero".to_owned());
        }
        res.result = req.a / req.b;
        Ok(())
    }

    /// Reports the request path of its context as `result` digits count.
    pub fn path_len(
        &self,
        ctx: &Context<'_>,
        _req: &Service1Request,
        res: &mut Service1Response,
    ) -> Result<(), BoxError> {
        res.result = ctx.request().uri().path().len() as i64;
        Ok(())
    }

    // None of the following have a suitable shape.

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn owned_args(
        &self,
        _ctx: &Context<'_>,
        req: Service1Request,
        res: &mut Service1Response,
    ) -> Result<(), BoxError> {
        res.result = req.a;
        Ok(())
    }

    pub fn no_result(&self, _ctx: &Context<'_>, _req: &Service1Request, _res: &mut Service1Response) {}

    fn private_multiply(
        &self,
        _ctx: &Context<'_>,
        req: &Service1Request,
        res: &mut Service1Response,
    ) -> Result<(), BoxError> {
        res.result = req.a * req.b;
        Ok(())
    }
}

/// Has public methods, none of a suitable shape.
pub struct Service2;

#[rpcmux::service]
impl Service2 {
    pub fn describe(&self) -> &'static str {
        "nothing to see"
    }

    pub fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn mock_codec(a: i64, b: i64) -> MockCodec<Service1Request, Service1Response> {
    MockCodec::new(Service1Request { a, b })
}

/// A server with `Service1` and a `mock` codec decoding to `(a, b)`.
pub fn mock_server(a: i64, b: i64) -> Server {
    Server::builder()
        .register_service(Service1::default(), "")
        .expect("Service1 registers")
        .register_codec(mock_codec(a, b), "mock")
        .build()
}

/// A `POST` to `/<method>` with the given `Content-Type`.
pub fn request(method: &str, content_type: Option<&str>) -> HttpRequest {
    let mut builder = http::Request::builder()
        .method(Method::POST)
        .uri(format!("/{method}"));
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(Bytes::new()).expect("valid test request")
}

pub fn body(response: &rpcmux::HttpResponse) -> &str {
    std::str::from_utf8(response.body()).expect("utf-8 body")
}
