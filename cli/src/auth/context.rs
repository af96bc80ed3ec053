//! Cancellation and deadline scope for blocking login steps.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::auth::error::{CancelCause, LoginError};

/// A cancellable scope with a deadline.
///
/// Child scopes inherit cancellation from their parent and never outlive
/// the parent's deadline.
#[derive(Debug, Clone)]
pub struct LoginContext {
    cancel: CancellationToken,
    deadline: Instant,
}

impl LoginContext {
    /// Creates a root context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Instant::now() + timeout,
        }
    }

    /// Derives a child scope bounded by `timeout` and by this scope's deadline.
    #[must_use]
    pub fn child(&self, timeout: Duration) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline.min(Instant::now() + timeout),
        }
    }

    /// A handle that cancels this scope when triggered, e.g. from a signal handler.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The instant this scope expires.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether this scope was cancelled or its deadline has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Runs `fut` until it completes or the scope fires.
    ///
    /// Firing drops `fut` and yields [`LoginError::Canceled`].
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<LoginError>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                Err(LoginError::Canceled(CancelCause::Interrupted).into())
            }
            () = tokio::time::sleep_until(self.deadline) => {
                Err(LoginError::Canceled(CancelCause::DeadlineExceeded).into())
            }
            result = fut => result,
        }
    }

    /// Sleeps for `duration` unless the scope fires first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), LoginError> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completed_future_passes_through() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(10));
        let result: Result<u32, LoginError> = ctx.run(async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_pending_future() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(5));
        let started = Instant::now();

        let result: Result<(), LoginError> = ctx.run(std::future::pending()).await;

        assert_eq!(
            result,
            Err(LoginError::Canceled(CancelCause::DeadlineExceeded))
        );
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_future() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(60));
        let handle = ctx.cancellation();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });

        let result: Result<(), LoginError> = ctx.run(std::future::pending()).await;
        assert_eq!(result, Err(LoginError::Canceled(CancelCause::Interrupted)));
    }

    #[tokio::test(start_paused = true)]
    async fn child_never_outlives_parent() {
        let parent = LoginContext::with_timeout(Duration::from_secs(5));
        let child = parent.child(Duration::from_secs(30));
        assert_eq!(child.deadline(), parent.deadline());

        let short = parent.child(Duration::from_secs(1));
        assert!(short.deadline() < parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancel_reaches_child() {
        let parent = LoginContext::with_timeout(Duration::from_secs(60));
        let child = parent.child(Duration::from_secs(30));
        parent.cancellation().cancel();

        assert_eq!(
            child.sleep(Duration::from_secs(1)).await,
            Err(LoginError::Canceled(CancelCause::Interrupted))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn is_done_tracks_deadline_and_cancellation() {
        let parent = LoginContext::with_timeout(Duration::from_secs(60));
        let child = parent.child(Duration::from_secs(5));
        assert!(!child.is_done());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(child.is_done());
        assert!(!parent.is_done());

        parent.cancellation().cancel();
        assert!(parent.is_done());
    }
}
