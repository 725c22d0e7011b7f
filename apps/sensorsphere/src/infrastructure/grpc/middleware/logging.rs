use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tonic::codegen::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, Span};

use super::{CallTags, grpc_status, split_path};

/// Tower layer logging one line per gRPC call.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcLoggingLayer;

impl<S> Layer<S> for GrpcLoggingLayer {
    type Service = GrpcLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        GrpcLoggingService { inner: service }
    }
}

/// Service produced by [`GrpcLoggingLayer`].
#[derive(Debug, Clone)]
pub struct GrpcLoggingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GrpcLoggingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Display,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.extensions().get::<CallTags>().map_or_else(
            || split_path(req.uri().path()).1.to_string(),
            |tags| tags.method.clone(),
        );
        let start = Instant::now();
        let future = self.inner.call(req);
        let span = Span::current();

        Box::pin(
            async move {
                let result = future.await;
                let time_ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let code = grpc_status(response.headers());
                        if code == 0 {
                            tracing::info!(
                                grpc.method = %method,
                                grpc.code = code,
                                grpc.time_ns = time_ns,
                                "finished call"
                            );
                        } else {
                            tracing::warn!(
                                grpc.method = %method,
                                grpc.code = code,
                                grpc.time_ns = time_ns,
                                "finished call"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            grpc.method = %method,
                            grpc.time_ns = time_ns,
                            error = %e,
                            "call failed"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
