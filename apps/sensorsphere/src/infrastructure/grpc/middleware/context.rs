use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tonic::codegen::http::Request;
use tonic::transport::server::{TcpConnectInfo, TlsConnectInfo};
use tower::{Layer, Service};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::split_path;

/// Per-call tags attached as a request extension and recorded on the call span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTags {
    /// Unique id for this call.
    pub request_id: Uuid,
    /// Fully qualified service name.
    pub service: String,
    /// Method name.
    pub method: String,
    /// Remote address, when the transport reports one.
    pub peer: Option<SocketAddr>,
}

impl CallTags {
    fn from_request<B>(request: &Request<B>) -> Self {
        let (service, method) = split_path(request.uri().path());
        let extensions = request.extensions();
        let peer = extensions
            .get::<TcpConnectInfo>()
            .and_then(TcpConnectInfo::remote_addr)
            .or_else(|| {
                extensions
                    .get::<TlsConnectInfo<TcpConnectInfo>>()
                    .and_then(|tls| tls.get_ref().remote_addr())
            });

        Self {
            request_id: Uuid::new_v4(),
            service: service.to_string(),
            method: method.to_string(),
            peer,
        }
    }
}

/// Tower layer tagging every call with [`CallTags`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextTagLayer;

impl<S> Layer<S> for ContextTagLayer {
    type Service = ContextTagService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ContextTagService { inner: service }
    }
}

/// Service produced by [`ContextTagLayer`].
#[derive(Debug, Clone)]
pub struct ContextTagService<S> {
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for ContextTagService<S>
where
    S: Service<Request<ReqBody>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let tags = CallTags::from_request(&req);
        let span = info_span!(
            "grpc.call",
            request_id = %tags.request_id,
            grpc.service = %tags.service,
            grpc.method = %tags.method,
            peer.address = ?tags.peer,
        );
        req.extensions_mut().insert(tags);

        let future = span.in_scope(|| self.inner.call(req));
        Box::pin(future.instrument(span))
    }
}
