//! HTTP server implementation
//!
//! Runs any [`Handler`] behind hyper. Each connection gets its own task, and
//! each request is dispatched into a fresh [`ResponseRecorder`] which is then
//! turned into the hyper response.

use crate::error::BoxError;
use crate::handler::{BoxFuture, Handler};
use crate::request::Request;
use crate::response::{Response, ResponseRecorder};
use bytes::Bytes;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Run a single request through a handler and collect the response
pub async fn dispatch<H: Handler + ?Sized>(handler: &H, request: Request) -> Response {
    let mut recorder = ResponseRecorder::new();
    handler.serve(request, &mut recorder).await;
    recorder.into_response()
}

/// Adapter exposing a [`Handler`] as a `tower::Service`
pub struct HandlerService<H> {
    handler: Arc<H>,
    remote_addr: Option<SocketAddr>,
}

impl<H> HandlerService<H> {
    /// Wrap a shared handler
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            remote_addr: None,
        }
    }

    /// Attach the peer address stamped onto every request
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

impl<H> Clone for HandlerService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            remote_addr: self.remote_addr,
        }
    }
}

impl<H, B> tower_service::Service<http::Request<B>> for HandlerService<H>
where
    H: Handler,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let handler = self.handler.clone();
        let (parts, body) = req.into_parts();
        let mut request = Request::streaming(parts, body);
        if let Some(addr) = self.remote_addr {
            request = request.with_remote_addr(addr);
        }

        Box::pin(async move { Ok(dispatch(handler.as_ref(), request).await) })
    }
}

/// Serve a handler on the given address until the listener fails
///
/// # Example
///
/// ```rust,ignore
/// let app = LoggerMiddleware::new(["password"], TracingSink::new()).wrap(api);
/// redactlog_core::serve("127.0.0.1:8080", app).await?;
/// ```
pub async fn serve<H: Handler>(addr: &str, handler: H) -> Result<(), BoxError> {
    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("redactlog server listening on http://{}", addr);

    let handler = Arc::new(handler);
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        debug!(%remote_addr, "accepted connection");

        let io = TokioIo::new(stream);
        let service = TowerToHyperService::new(
            HandlerService::new(handler.clone()).with_remote_addr(remote_addr),
        );

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Connection error: {}", err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseWriter;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use tower_service::Service;

    struct PeerEcho;

    impl Handler for PeerEcho {
        fn serve<'a>(
            &'a self,
            mut req: Request,
            res: &'a mut dyn ResponseWriter,
        ) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                let peer = req
                    .remote_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                let body = req.take_body().await.unwrap_or_default();
                res.headers_mut()
                    .insert("x-peer", peer.parse().unwrap());
                res.set_status(StatusCode::CREATED);
                let _ = res.write_all(&body);
            })
        }
    }

    #[tokio::test]
    async fn service_streams_body_into_handler() {
        let addr: SocketAddr = "10.0.0.7:5555".parse().unwrap();
        let mut svc = HandlerService::new(Arc::new(PeerEcho)).with_remote_addr(addr);

        let req = http::Request::post("/echo")
            .body(Full::new(Bytes::from("round trip")))
            .unwrap();
        let response = svc.call(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-peer"], "10.0.0.7:5555");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("round trip"));
    }

    #[tokio::test]
    async fn dispatch_defaults_to_ok() {
        struct Silent;
        impl Handler for Silent {
            fn serve<'a>(
                &'a self,
                _req: Request,
                _res: &'a mut dyn ResponseWriter,
            ) -> BoxFuture<'a, ()> {
                Box::pin(async {})
            }
        }

        let req = Request::from_http_request(http::Request::get("/").body(()).unwrap(), "");
        let response = dispatch(&Silent, req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
