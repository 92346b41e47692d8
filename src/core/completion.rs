//! One-shot rendezvous between a dispatched request and its caller.
//!
//! The caller keeps the [`CompletionContext`] and hands the [`Completer`] to
//! the callback. The callback stores exactly one outcome and signals; the
//! caller blocks in [`CompletionContext::wait`] with a deadline and notices a
//! dead event loop within one poll interval. A completer that fires after its
//! waiter gave up writes into a slot nobody reads, which is harmless.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

use crate::ConnectionState;
use crate::Error;
use crate::GattError;
use crate::Link;
use crate::Result;
use crate::WaitPolicy;

struct Shared<T> {
    slot: Mutex<Option<Result<T>>>,
    signal: Condvar,
}

impl<T> Shared<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            signal: Condvar::new(),
        })
    }
}

/// Caller side of an outstanding request.
pub struct CompletionContext<T> {
    shared: Arc<Shared<T>>,
}

/// Callback side of an outstanding request, consumed by the single write.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CompletionContext<T> {
    pub fn pair() -> (Self, Completer<T>) {
        let shared = Shared::new();
        (
            Self {
                shared: shared.clone(),
            },
            Completer { shared },
        )
    }

    /// Re-initializes the context for a new request.
    ///
    /// The completer of the previous request is detached: if it still
    /// fires, its outcome is discarded.
    pub fn rearm(&mut self) -> Completer<T> {
        self.shared = Shared::new();
        Completer {
            shared: self.shared.clone(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.shared.slot.lock().is_some()
    }

    /// Blocks until the outcome is stored, the event loop dies, or
    /// `policy.timeout` elapses.
    ///
    /// Dispatcher death and timeout both move `link` to
    /// [`ConnectionState::Disconnected`]. An outcome stored while the loop
    /// was going down is reported as a disconnection too.
    pub fn wait(
        &mut self,
        link: &Link,
        policy: &WaitPolicy,
    ) -> Result<T> {
        // None: the timeout is past what an Instant can represent
        let deadline = Instant::now().checked_add(policy.timeout);
        let mut slot = self.shared.slot.lock();

        let outcome = loop {
            if let Some(outcome) = slot.take() {
                break outcome;
            }

            if !link.dispatcher().is_running() {
                drop(slot);
                warn!("[Callback] event loop is not running");
                link.set_state(ConnectionState::Disconnected);
                return Err(GattError::Disconnected("event loop is not running").into());
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => policy.timeout,
            };
            if remaining.is_zero() {
                drop(slot);
                warn!("[Callback] timeout, no callback received after {:?}", policy.timeout);
                link.set_state(ConnectionState::Disconnected);
                return Err(GattError::NoCallback(policy.timeout).into());
            }

            self.shared
                .signal
                .wait_for(&mut slot, policy.poll_interval.min(remaining));
        };
        drop(slot);

        if !link.dispatcher().is_running() {
            debug!("[Callback] completed while the event loop went down");
            link.set_state(ConnectionState::Disconnected);
            return Err(GattError::Disconnected("event loop is not running").into());
        }
        outcome
    }
}

impl<T> Completer<T> {
    pub fn complete(
        self,
        outcome: Result<T>,
    ) {
        *self.shared.slot.lock() = Some(outcome);
        self.shared.signal.notify_one();
    }

    pub fn succeed(
        self,
        value: T,
    ) {
        self.complete(Ok(value))
    }

    pub fn fail(
        self,
        error: impl Into<Error>,
    ) {
        self.complete(Err(error.into()))
    }
}

/// Free form of [`CompletionContext::wait`] with the default poll interval.
pub fn wait_for_completion<T>(
    ctx: &mut CompletionContext<T>,
    link: &Link,
    timeout: Duration,
) -> Result<T> {
    ctx.wait(link, &WaitPolicy::with_timeout(timeout))
}
