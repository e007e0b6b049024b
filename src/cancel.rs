//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a one-way flag shared between the CLI's
//! Ctrl-C handler and the long-running loops. Loops poll
//! [`is_cancelled`](CancellationToken::is_cancelled) after every item or
//! repository; timed waits race against
//! [`cancelled`](CancellationToken::cancelled) so an interrupt during a
//! rate-limit sleep is honored right away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiter. Later calls are no-ops.
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `false` if the sleep was cut short.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

/// Cancel `token` on Ctrl-C.
///
/// The first interrupt requests a graceful stop; the current unit of work
/// finishes and state is flushed. Further interrupts are only logged.
pub fn install_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("unable to listen for Ctrl-C, interrupts will not stop the run");
                return;
            }
            if token.cancel() {
                tracing::warn!("stop requested, finishing current item and saving state");
            } else {
                tracing::warn!("stop already requested, waiting for current item");
            }
        }
    });
}
