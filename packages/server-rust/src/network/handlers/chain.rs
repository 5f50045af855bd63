//! Chain inspection and relay handlers.
//!
//! `GET /chain` reports the request's own id and active chain. `GET /relay`
//! does the same after calling `<upstream>/chain` with the chain propagated,
//! which makes a multi-hop chain visible end to end.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqchain_core::{RequestId, RequestIdChain};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::propagate::inject_chain;
use crate::scope::current_chain;

/// A service's view of one request's correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Id generated for the request by the reporting service.
    pub request_id: RequestId,
    /// Full active chain, oldest first, ending with `request_id`.
    pub chain: RequestIdChain,
    /// The upstream's report, when the request was relayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Box<ChainReport>>,
}

/// Errors returned by the chain handlers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no request id chain is active")]
    NoActiveChain,
    #[error("no upstream configured")]
    NoUpstream,
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NoActiveChain => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoUpstream => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        warn!(error = %self, %status, "chain handler failed");
        (status, self.to_string()).into_response()
    }
}

/// Builds the report for the current request from the active chain.
fn local_report() -> Result<ChainReport, RelayError> {
    let chain = current_chain().ok_or(RelayError::NoActiveChain)?;
    let request_id = chain.last().ok_or(RelayError::NoActiveChain)?;
    Ok(ChainReport {
        request_id,
        chain,
        upstream: None,
    })
}

/// Reports the current request's id and chain.
///
/// # Errors
///
/// Fails with 500 if the request chain middleware is not installed.
pub async fn chain_handler() -> Result<Json<ChainReport>, RelayError> {
    let report = local_report()?;
    info!(hops = report.chain.len(), "reporting request chain");
    Ok(Json(report))
}

/// Calls the upstream's `/chain` with the active chain propagated and
/// returns both reports.
///
/// # Errors
///
/// 404 without a configured upstream, 502 if the upstream call fails.
pub async fn relay_handler(
    State(state): State<AppState>,
) -> Result<Json<ChainReport>, RelayError> {
    let local = local_report()?;
    let upstream = state
        .config
        .upstream
        .as_deref()
        .ok_or(RelayError::NoUpstream)?;
    let url = format!("{}/chain", upstream.trim_end_matches('/'));

    info!(%url, "relaying request chain upstream");

    let upstream_report: ChainReport = inject_chain(state.client.get(&url))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(Json(ChainReport {
        upstream: Some(Box::new(upstream_report)),
        ..local
    }))
}
