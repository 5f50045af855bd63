//! Per-request active chain context.
//!
//! Each inbound request runs inside its own *request unit*: a tokio task-local
//! scope bound to the request future rather than to the worker thread that
//! happens to poll it. Within a unit the active chain can be set, read and
//! cleared; outside any unit it is simply absent. Because the binding lives
//! and dies with the future, a reused worker never sees a previous request's
//! chain.
//!
//! Lifecycle, as driven by the request chain middleware:
//! 1. [`request_unit`] wraps the request future in an empty unit
//! 2. [`CorrelationScope::begin_request`] activates `inbound chain + new id`
//!    and returns a [`RequestGuard`]
//! 3. log events and outbound calls read the chain via [`current_chain_string`]
//! 4. dropping the guard calls [`end_request`], on every exit path

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use reqchain_core::{IdSource, RandomIdSource, RequestId, RequestIdChain};
use tokio::task::futures::TaskLocalFuture;
use tracing::instrument::Instrumented;
use tracing::{warn, Instrument};

use crate::service::config::ChainConfig;

tokio::task_local! {
    static ACTIVE_CHAIN: RefCell<Option<RequestIdChain>>;
}

/// Errors from activating a chain.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("begin_request called outside of a request unit")]
    OutsideUnit,
}

/// Starts request scopes: generates the request's id, builds its chain, and
/// activates it in the current request unit.
///
/// Holds configuration only; the active chain itself lives in the unit.
#[derive(Clone)]
pub struct CorrelationScope {
    ids: Arc<dyn IdSource>,
    max_chain_len: Option<usize>,
}

impl CorrelationScope {
    /// Creates a scope generating random v4 ids with an unbounded chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: Arc::new(RandomIdSource),
            max_chain_len: None,
        }
    }

    /// Creates a scope from chain configuration.
    #[must_use]
    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            max_chain_len: config.max_chain_len,
            ..Self::new()
        }
    }

    /// Replaces the id source. Used by tests to pin generated ids.
    #[must_use]
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Caps the chain at the newest `max_len` ids.
    #[must_use]
    pub fn with_max_chain_len(mut self, max_len: Option<usize>) -> Self {
        self.max_chain_len = max_len;
        self
    }

    /// Begins handling one request.
    ///
    /// The active chain becomes the chain parsed from `inbound` (or an empty
    /// one if it is absent or malformed) with a freshly generated id appended.
    /// The chain is cleared again when the returned guard is dropped.
    ///
    /// A chain left active by an earlier, unterminated scope in the same unit
    /// is overwritten and reported with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::OutsideUnit`] if no request unit is established
    /// for the current task or thread.
    pub fn begin_request(&self, inbound: Option<&str>) -> Result<RequestGuard, ScopeError> {
        let request_id = self.ids.next_id();
        let mut chain = RequestIdChain::parse(inbound)
            .unwrap_or_default()
            .extended(request_id);
        if let Some(max_len) = self.max_chain_len {
            chain.retain_newest(max_len);
        }

        ACTIVE_CHAIN
            .try_with(|slot| {
                let stale = slot.borrow_mut().replace(chain.clone());
                if let Some(stale) = stale {
                    warn!(
                        stale_chain = %stale,
                        "request id chain was still active when a new request began; overwriting"
                    );
                }
            })
            .map_err(|_| ScopeError::OutsideUnit)?;

        Ok(RequestGuard { request_id, chain })
    }
}

impl Default for CorrelationScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CorrelationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationScope")
            .field("max_chain_len", &self.max_chain_len)
            .finish_non_exhaustive()
    }
}

/// RAII guard for an active request chain.
///
/// Clears the active chain of the current unit when dropped, including when
/// the request future is cancelled or a handler panics.
#[derive(Debug)]
#[must_use = "the chain is cleared as soon as the guard is dropped"]
pub struct RequestGuard {
    request_id: RequestId,
    chain: RequestIdChain,
}

impl RequestGuard {
    /// The id generated for this request. This is what the client receives
    /// in the response header.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The full chain: inbound ancestors followed by [`Self::request_id`].
    #[must_use]
    pub fn chain(&self) -> &RequestIdChain {
        &self.chain
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        end_request();
    }
}

/// Returns the serialized active chain of the current unit, if any.
#[must_use]
pub fn current_chain_string() -> Option<String> {
    ACTIVE_CHAIN
        .try_with(|slot| slot.borrow().as_ref().map(RequestIdChain::serialize))
        .ok()
        .flatten()
}

/// Returns a copy of the active chain of the current unit, if any.
#[must_use]
pub fn current_chain() -> Option<RequestIdChain> {
    ACTIVE_CHAIN
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Clears the active chain of the current unit.
///
/// A no-op outside any unit. If the unit itself is already being torn down
/// its storage goes with it, so nothing can leak either way.
pub fn end_request() {
    let _ = ACTIVE_CHAIN.try_with(|slot| slot.borrow_mut().take());
}

/// Runs `fut` in a fresh request unit with no active chain.
pub fn request_unit<F: Future>(fut: F) -> TaskLocalFuture<RefCell<Option<RequestIdChain>>, F> {
    ACTIVE_CHAIN.scope(RefCell::new(None), fut)
}

/// Runs `f` in a fresh request unit on the current thread.
///
/// For handlers that process a request synchronously on a dedicated thread.
pub fn sync_request_unit<R>(f: impl FnOnce() -> R) -> R {
    ACTIVE_CHAIN.sync_scope(RefCell::new(None), f)
}

/// Binds `fut` to the caller's correlation.
///
/// The returned future runs in its own unit holding a copy of the active
/// chain and is instrumented with the current span. Intended for work a
/// request hands to `tokio::spawn`, which does not inherit task-locals.
pub fn bind_current<F: Future>(
    fut: F,
) -> TaskLocalFuture<RefCell<Option<RequestIdChain>>, Instrumented<F>> {
    ACTIVE_CHAIN.scope(
        RefCell::new(current_chain()),
        fut.instrument(tracing::Span::current()),
    )
}
