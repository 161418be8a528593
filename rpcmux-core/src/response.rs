//! Response assembly.
//!
//! Codecs and header-accepting methods write into a [`ResponseWriter`]; the
//! dispatcher turns it into an [`HttpResponse`] when the pipeline is done.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};

/// The transport response produced for every request.
pub type HttpResponse = http::Response<Bytes>;

/// Accumulates status, headers and body for one response.
///
/// The status is fixed by the first call to [`write_header`] or, failing that,
/// by the first [`write`], which implies `200 OK`.
///
/// [`write_header`]: ResponseWriter::write_header
/// [`write`]: ResponseWriter::write
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outgoing headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Outgoing headers, for codecs and header-accepting methods.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Set the status. Ignored once a status has been fixed.
    pub fn write_header(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }

    /// Append body bytes.
    pub fn write(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }

    /// Body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Write a plain-text error response, for failures no codec can render.
    pub fn write_plain(&mut self, status: StatusCode, message: &str) {
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.write_header(status);
        self.write(message.as_bytes());
    }

    /// Finish the response.
    pub fn into_response(self) -> HttpResponse {
        let mut response = http::Response::new(self.body.freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
