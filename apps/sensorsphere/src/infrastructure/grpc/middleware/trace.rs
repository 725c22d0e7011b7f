use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tonic::codegen::http::{HeaderMap, Request, Response};
use tonic::server::NamedService;
use tower::{Layer, Service};
use tracing::{Instrument, Span, field, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{grpc_status, split_path};

/// Tower layer opening an `rpc` span per call, parented on the caller's W3C
/// trace context when one is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcTraceLayer;

impl<S> Layer<S> for GrpcTraceLayer {
    type Service = GrpcTraceService<S>;

    fn layer(&self, service: S) -> Self::Service {
        GrpcTraceService { inner: service }
    }
}

/// Service produced by [`GrpcTraceLayer`].
#[derive(Debug, Clone)]
pub struct GrpcTraceService<S> {
    inner: S,
}

impl<S: NamedService> NamedService for GrpcTraceService<S> {
    const NAME: &'static str = S::NAME;
}

/// Reads propagation headers from gRPC metadata.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(tonic::codegen::http::HeaderName::as_str).collect()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GrpcTraceService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let parent = TraceContextPropagator::new().extract(&HeaderExtractor(req.headers()));
        let (service, method) = split_path(req.uri().path());

        let span = info_span!(
            "rpc",
            otel.name = %format!("{service}/{method}"),
            otel.kind = "server",
            rpc.system = "grpc",
            rpc.service = %service,
            rpc.method = %method,
            rpc.grpc.status_code = field::Empty,
        );
        let _ = span.set_parent(parent);

        let future = span.in_scope(|| self.inner.call(req));

        Box::pin(
            async move {
                let result = future.await;
                if let Ok(response) = &result {
                    Span::current().record("rpc.grpc.status_code", grpc_status(response.headers()));
                }
                result
            }
            .instrument(span),
        )
    }
}
