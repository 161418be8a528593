//! Tower integration for rpcmux.
//!
//! [`Server`] implements `tower::Service<HttpRequest>`, so any tower or hyper
//! based transport can drive it once the request body has been collected.
//!
//! # Example
//!
//! ```rust,ignore
//! use tower::ServiceExt;
//!
//! let response = server.clone().oneshot(request).await?;
//! ```

use crate::server::Server;
use futures::future::BoxFuture;
use rpcmux_core::{HttpRequest, HttpResponse};
use std::{
    convert::Infallible,
    task::{Context, Poll},
};

impl ::tower::Service<HttpRequest> for Server {
    type Response = HttpResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The dispatcher holds no per-connection state
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let server = self.clone();
        Box::pin(async move { Ok(server.serve(request).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use rpcmux_std::testing::MockCodec;
    use tower::ServiceExt;

    #[tokio::test]
    async fn oneshot_through_tower() {
        let server = Server::builder()
            .register_codec(MockCodec::<u8, u8>::new(0), "mock")
            .build();
        let request = http::Request::builder()
            .uri("/Nobody.Home")
            .body(Bytes::new())
            .unwrap();

        let response = server.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.body().as_ref(),
            b"rpc: can't find method \"Nobody.Home\""
        );
    }
}
