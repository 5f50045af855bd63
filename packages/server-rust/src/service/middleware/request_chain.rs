//! Request chain middleware.
//!
//! Wraps every request in its own request unit, activates the request's
//! chain for the duration of the inner service, and reports the request's
//! own id back to the client in the `x-request-id` response header.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{Request, Response};
use reqchain_core::REQUEST_ID_HEADER;
use tower::{Layer, Service};
use tracing::{error, info_span, Instrument};

use crate::propagate::header_value;
use crate::scope::{self, CorrelationScope};
use crate::service::config::ChainConfig;

// ---------------------------------------------------------------------------
// RequestChainLayer
// ---------------------------------------------------------------------------

/// Tower layer that scopes each request to its request id chain.
///
/// Must sit outside any layer whose log output should carry the chain.
#[derive(Debug, Clone, Default)]
pub struct RequestChainLayer {
    scope: CorrelationScope,
}

impl RequestChainLayer {
    #[must_use]
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            scope: CorrelationScope::from_config(config),
        }
    }

    /// Uses a preconfigured scope, e.g. one with a fixed id source.
    #[must_use]
    pub fn with_scope(scope: CorrelationScope) -> Self {
        Self { scope }
    }
}

impl<S> Layer<S> for RequestChainLayer {
    type Service = RequestChainService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestChainService {
            inner,
            scope: self.scope.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestChainService
// ---------------------------------------------------------------------------

/// Service wrapper that activates the request chain around the inner service.
///
/// For each request:
/// 1. reads the inbound `x-request-id` chain (non-UTF-8 counts as absent)
/// 2. enters a fresh request unit and begins the request there
/// 3. inserts the [`RequestIdChain`](reqchain_core::RequestIdChain) into the
///    request extensions
/// 4. runs the inner service inside a `request` span carrying `requestIdChain`
/// 5. sets `x-request-id` on the response to this request's id
#[derive(Debug, Clone)]
pub struct RequestChainService<S> {
    inner: S,
    scope: CorrelationScope,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestChainService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: 'static,
    ReqBody: Send + 'static,
    ResBody: 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let inbound = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        // The instance in `self` is the one that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let scope = self.scope.clone();

        Box::pin(scope::request_unit(async move {
            let guard = match scope.begin_request(inbound.as_deref()) {
                Ok(guard) => guard,
                Err(err) => {
                    error!(error = %err, "request chain not activated");
                    return inner.call(req).await;
                }
            };

            req.extensions_mut().insert(guard.chain().clone());

            // Field name must equal `reqchain_core::LOG_FIELD`.
            let span = info_span!("request", requestIdChain = %guard.chain());
            let mut response = inner.call(req).instrument(span).await?;

            if let Some(value) = header_value(&guard.request_id().to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            Ok(response)
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
