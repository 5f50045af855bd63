//! Outbound chain propagation.
//!
//! When a request handler calls another service, the full active chain goes
//! along in the `x-request-id` header so the callee can extend it.

use http::HeaderValue;
use reqchain_core::REQUEST_ID_HEADER;
use tracing::error;

use crate::scope::current_chain_string;

/// Sets `x-request-id` on an outgoing request to the active chain.
///
/// Returns the request unchanged when no chain is active.
#[must_use]
pub fn attach_to_outgoing_request<B>(mut request: http::Request<B>) -> http::Request<B> {
    if let Some(value) = current_chain_string().as_deref().and_then(header_value) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    request
}

/// Adds `x-request-id` to a reqwest request builder when a chain is active.
#[must_use]
pub fn inject_chain(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match current_chain_string().as_deref().and_then(header_value) {
        Some(value) => builder.header(REQUEST_ID_HEADER, value),
        None => builder,
    }
}

/// Converts a serialized id or chain into a header value.
///
/// Canonical forms are always representable; anything else is logged and
/// dropped rather than failing the request.
pub(crate) fn header_value(value: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(value) {
        Ok(value) => Some(value),
        Err(err) => {
            error!(error = %err, value, "request id is not a valid header value");
            None
        }
    }
}
