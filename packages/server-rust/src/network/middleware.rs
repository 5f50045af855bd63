//! HTTP middleware stack for the chain server.
//!
//! Builds the Tower middleware pipeline applied to all HTTP requests.
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use crate::service::RequestChainLayer;

/// The composed Tower layer type produced by [`build_http_layers`].
///
/// Each layer wraps the next in a `Stack`, from outermost (first applied)
/// to innermost (last applied).
pub type HttpLayers = tower::layer::util::Stack<
    TimeoutLayer,
    tower::layer::util::Stack<
        TraceLayer<
            tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
        >,
        tower::layer::util::Stack<RequestChainLayer, tower::layer::util::Identity>,
    >,
>;

/// Builds the HTTP-level Tower middleware stack from the network configuration.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `RequestChain` -- activates the request id chain and opens the
///    `request` span, so everything below logs with `requestIdChain`
/// 2. `Tracing` -- logs request/response inside that span
/// 3. `Timeout` -- answers 408 when a handler exceeds the configured duration;
///    the chain layer still sets `x-request-id` on that response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    ServiceBuilder::new()
        .layer(RequestChainLayer::new(&config.chain))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .into_inner()
}
