use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::contract::SettlementResult;

/// Which completion path produced the settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementSource {
    Finish,
    Timeout,
    MiddlewareError,
    Fallthrough,
    AdapterFailure,
}

impl SettlementSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finish => "finish",
            Self::Timeout => "timeout",
            Self::MiddlewareError => "middleware_error",
            Self::Fallthrough => "fallthrough",
            Self::AdapterFailure => "adapter_failure",
        }
    }
}

struct ArbiterState {
    sender: Option<oneshot::Sender<SettlementResult>>,
    settled_by: Option<SettlementSource>,
    timer: Option<JoinHandle<()>>,
    late_errors: Vec<String>,
}

/// Single enforcement point for "exactly one result per invocation".
///
/// Clones share the same slot; every completion source (the response
/// emulator, the error continuation, the timeout timer and the adapter
/// boundary) settles through it and only the first caller wins.
#[derive(Clone)]
pub struct CompletionArbiter {
    inner: Arc<Mutex<ArbiterState>>,
}

/// Receiving half of the settlement slot, awaited by the adapter.
pub struct Settlement {
    receiver: oneshot::Receiver<SettlementResult>,
}

impl Settlement {
    /// Resolves with the settled result, or `None` if every arbiter handle
    /// was dropped without settling.
    pub async fn wait(self) -> Option<SettlementResult> {
        self.receiver.await.ok()
    }
}

impl CompletionArbiter {
    pub fn new() -> (Self, Settlement) {
        let (sender, receiver) = oneshot::channel();
        let arbiter = Self {
            inner: Arc::new(Mutex::new(ArbiterState {
                sender: Some(sender),
                settled_by: None,
                timer: None,
                late_errors: Vec::new(),
            })),
        };
        (arbiter, Settlement { receiver })
    }

    /// Starts the timeout fallback. Must be called from within a tokio
    /// runtime. The timer only holds a weak handle, so it never keeps an
    /// otherwise finished invocation alive.
    pub fn arm_timeout(&self, timeout: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                let arbiter = CompletionArbiter { inner };
                if arbiter.settle(SettlementSource::Timeout, SettlementResult::timeout()) {
                    tracing::warn!(
                        component = "adapter",
                        event = "invocation_timed_out",
                        timeout_ms,
                    );
                }
            }
        });

        let mut state = self.lock();
        if state.sender.is_none() {
            timer.abort();
            return;
        }
        if let Some(previous) = state.timer.replace(timer) {
            previous.abort();
        }
    }

    /// Hands `result` to the host if nothing settled yet. Returns `true` only
    /// for the winning caller; later calls are no-ops.
    pub fn settle(&self, source: SettlementSource, result: SettlementResult) -> bool {
        let (sender, timer) = {
            let mut state = self.lock();
            let Some(sender) = state.sender.take() else {
                tracing::debug!(
                    component = "adapter",
                    event = "settlement_ignored",
                    source = source.as_str(),
                    status_code = result.status_code,
                );
                return false;
            };
            state.settled_by = Some(source);
            (sender, state.timer.take())
        };

        if source != SettlementSource::Timeout {
            if let Some(timer) = timer {
                timer.abort();
            }
        }

        tracing::debug!(
            component = "adapter",
            event = "settled",
            source = source.as_str(),
            status_code = result.status_code,
        );
        // The receiver is gone only when the adapter stopped waiting; the
        // slot is still consumed so later sources stay no-ops.
        let _ = sender.send(result);
        true
    }

    pub fn is_settled(&self) -> bool {
        self.lock().sender.is_none()
    }

    pub fn settled_by(&self) -> Option<SettlementSource> {
        self.lock().settled_by
    }

    /// Keeps an error that arrived after settlement, for diagnostics only.
    pub fn record_late_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(
            component = "adapter",
            event = "late_middleware_error",
            error = %message,
        );
        self.lock().late_errors.push(message);
    }

    pub fn late_errors(&self) -> Vec<String> {
        self.lock().late_errors.clone()
    }

    #[cfg(test)]
    fn has_pending_timer(&self) -> bool {
        self.lock().timer.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, ArbiterState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ok_result(body: &str) -> SettlementResult {
        SettlementResult::json(200, &json!({ "body": body }))
    }

    #[tokio::test]
    async fn first_settlement_wins() {
        let (arbiter, settlement) = CompletionArbiter::new();

        let timer = arbiter.clone();
        let first = ok_result("first");
        let second = ok_result("second");
        let timed_out = SettlementResult::timeout();

        assert!(arbiter.settle(SettlementSource::Finish, first.clone()));
        assert!(!arbiter.settle(SettlementSource::MiddlewareError, second));
        assert!(!timer.settle(SettlementSource::Timeout, timed_out));

        let result = settlement.wait().await.expect("settlement should resolve");
        assert_eq!(result, first);
        assert_eq!(arbiter.settled_by(), Some(SettlementSource::Finish));
        assert!(arbiter.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_settles_when_nothing_else_does() {
        let (arbiter, settlement) = CompletionArbiter::new();
        arbiter.arm_timeout(Duration::from_millis(250));

        let result = settlement.wait().await.expect("settlement should resolve");
        assert_eq!(result, SettlementResult::timeout());
        assert_eq!(arbiter.settled_by(), Some(SettlementSource::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_settlement_cancels_timer() {
        let (arbiter, settlement) = CompletionArbiter::new();
        arbiter.arm_timeout(Duration::from_millis(250));
        assert!(arbiter.has_pending_timer());

        let done = ok_result("done");
        assert!(arbiter.settle(SettlementSource::Finish, done));
        assert!(!arbiter.has_pending_timer());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(arbiter.settled_by(), Some(SettlementSource::Finish));
        assert_eq!(
            settlement.wait().await.expect("settlement should resolve"),
            ok_result("done")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn error_and_fallthrough_settlements_cancel_timer() {
        let sources = [
            SettlementSource::MiddlewareError,
            SettlementSource::Fallthrough,
            SettlementSource::AdapterFailure,
        ];
        for source in sources {
            let (arbiter, settlement) = CompletionArbiter::new();
            arbiter.arm_timeout(Duration::from_millis(250));

            assert!(arbiter.settle(source, SettlementResult::not_found()));
            assert!(!arbiter.has_pending_timer(), "{source:?}");

            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(arbiter.settled_by(), Some(source));
            let result = settlement.wait().await.expect("settlement should resolve");
            assert_eq!(result, SettlementResult::not_found());
        }
    }

    #[tokio::test]
    async fn arming_after_settlement_is_a_no_op() {
        let (arbiter, _settlement) = CompletionArbiter::new();
        arbiter.settle(SettlementSource::Finish, ok_result("done"));
        arbiter.arm_timeout(Duration::from_millis(1));
        assert!(!arbiter.has_pending_timer());
    }

    #[tokio::test]
    async fn settlement_resolves_none_when_all_handles_drop() {
        let (arbiter, settlement) = CompletionArbiter::new();
        drop(arbiter);
        assert!(settlement.wait().await.is_none());
    }

    #[test]
    fn late_errors_are_recorded() {
        let (arbiter, _settlement) = CompletionArbiter::new();
        arbiter.record_late_error("socket closed");
        arbiter.record_late_error("write after end");
        assert_eq!(
            arbiter.late_errors(),
            vec!["socket closed", "write after end"]
        );
    }
}
