use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::arbiter::{CompletionArbiter, SettlementSource};
use crate::contract::{CanonicalRequest, SettlementResult};
use crate::response::ResponseEmulator;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request-handling pipeline driven by the adapter, once per invocation.
///
/// The chain completes the invocation either by finishing `response` or by
/// calling `next`; it may do so from spawned work after `handle` returns.
pub trait MiddlewareChain: Send + Sync + 'static {
    fn handle(
        &self,
        request: Arc<CanonicalRequest>,
        response: ResponseEmulator,
        next: ErrorContinuation,
    ) -> impl Future<Output = ()> + Send;
}

/// Wraps an async closure as a [`MiddlewareChain`].
pub struct ChainFn<F> {
    f: F,
}

pub fn chain_fn<F, Fut>(f: F) -> ChainFn<F>
where
    F: Fn(Arc<CanonicalRequest>, ResponseEmulator, ErrorContinuation) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    ChainFn { f }
}

impl<F, Fut> MiddlewareChain for ChainFn<F>
where
    F: Fn(Arc<CanonicalRequest>, ResponseEmulator, ErrorContinuation) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(
        &self,
        request: Arc<CanonicalRequest>,
        response: ResponseEmulator,
        next: ErrorContinuation,
    ) -> impl Future<Output = ()> + Send {
        (self.f)(request, response, next)
    }
}

/// The chain's `next(error?)` continuation.
#[derive(Clone)]
pub struct ErrorContinuation {
    arbiter: CompletionArbiter,
}

impl ErrorContinuation {
    pub fn new(arbiter: CompletionArbiter) -> Self {
        Self { arbiter }
    }

    pub fn call(&self, error: Option<BoxError>) {
        match error {
            Some(error) => self.fail(error),
            None => self.pass(),
        }
    }

    /// Settles 500 with the error's message, or only records it when a
    /// result was already settled.
    pub fn fail(&self, error: impl Display) {
        let message = error.to_string();
        let source = SettlementSource::MiddlewareError;
        let result = SettlementResult::internal_error(&message);
        if self.arbiter.settle(source, result) {
            tracing::error!(
                component = "adapter",
                event = "middleware_error",
                error = %message,
            );
        } else {
            self.arbiter.record_late_error(message);
        }
    }

    /// The chain ran out of handlers without responding.
    pub fn pass(&self) {
        let source = SettlementSource::Fallthrough;
        if self.arbiter.settle(source, SettlementResult::not_found()) {
            tracing::info!(component = "adapter", event = "unhandled_request");
        }
    }
}
