//! Fixed-delay retry loop around whole login attempts.

use std::future::Future;
use std::time::Duration;

use crate::auth::context::LoginContext;
use crate::auth::error::{CancelCause, LoginError};
use crate::auth::tokens::AccessToken;

/// How often and how long to attempt a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(120),
        }
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retriable error, or
/// the policy is exhausted.
///
/// Each attempt gets its own child of `ctx` bounded by the attempt timeout.
/// The last error is returned unchanged.
pub async fn retry_login<F, Fut>(
    ctx: &LoginContext,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<AccessToken, LoginError>
where
    F: FnMut(LoginContext) -> Fut,
    Fut: Future<Output = Result<AccessToken, LoginError>>,
{
    let attempts = policy.attempts.max(1);
    let mut number = 1;

    loop {
        let err = match attempt(ctx.child(policy.attempt_timeout)).await {
            Ok(token) => return Ok(token),
            Err(e) => e,
        };

        // An attempt that only outran its own timeout is a plain failure.
        let attempt_timed_out =
            err == LoginError::Canceled(CancelCause::DeadlineExceeded) && !ctx.is_done();
        if !err.is_retriable() && !attempt_timed_out {
            return Err(err);
        }
        tracing::warn!("login attempt {number} of {attempts} failed: {err}");
        if number >= attempts {
            return Err(err);
        }

        tracing::warn!("Retrying login in {}...", humantime::format_duration(policy.delay));
        ctx.sleep(policy.delay).await?;
        number += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(600));
        let calls = AtomicU32::new(0);

        let result = retry_login(&ctx, &policy(5), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err(LoginError::Network("dns".to_string()))
                } else {
                    Ok(AccessToken::new("token"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap().secret(), "token");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_login_runs_exactly_n_attempts() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(600));
        let started_at = Mutex::new(Vec::new());
        let calls = AtomicU32::new(0);

        let result = retry_login(&ctx, &policy(3), |_| {
            started_at.lock().unwrap().push(Instant::now());
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(LoginError::Auth(format!("failure {n}"))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result, Err(LoginError::Auth("failure 3".to_string())));

        let started_at = started_at.lock().unwrap();
        for pair in started_at.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(600));
        let calls = AtomicU32::new(0);

        let result = retry_login(&ctx, &policy(0), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LoginError::Auth("nope".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_short_circuits() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(600));
        let calls = AtomicU32::new(0);

        let result = retry_login(&ctx, &policy(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LoginError::Canceled(CancelCause::Interrupted)) }
        })
        .await;

        assert_eq!(result, Err(LoginError::Canceled(CancelCause::Interrupted)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_attempts_are_retried() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(600));
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = retry_login(&ctx, &policy(3), |attempt_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { attempt_ctx.run(std::future::pending()).await }
        })
        .await;

        assert_eq!(
            result,
            Err(LoginError::Canceled(CancelCause::DeadlineExceeded))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(30 + 2 + 30 + 2 + 30));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_after_a_hung_one_can_succeed() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(600));
        let calls = AtomicU32::new(0);

        let result = retry_login(&ctx, &policy(3), |attempt_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    attempt_ctx.run(std::future::pending()).await
                } else {
                    Ok(AccessToken::new("second"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap().secret(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_during_attempt_is_final() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(10));
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = retry_login(&ctx, &policy(3), |attempt_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { attempt_ctx.run(std::future::pending()).await }
        })
        .await;

        assert_eq!(
            result,
            Err(LoginError::Canceled(CancelCause::DeadlineExceeded))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_cuts_the_delay_short() {
        let ctx = LoginContext::with_timeout(Duration::from_secs(1));

        let result = retry_login(&ctx, &policy(3), |_| async {
            Err(LoginError::Network("offline".to_string()))
        })
        .await;

        assert_eq!(
            result,
            Err(LoginError::Canceled(CancelCause::DeadlineExceeded))
        );
    }
}
