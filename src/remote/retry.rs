// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-backoff retry for identity service calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::RemoteAuthError;

/// Default number of attempts per identity service call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(300);

/// Retry policy for identity service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never zero.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts.
///
/// Both the attempt and the backoff race `cancel`; cancellation returns
/// [`RemoteAuthError::Cancelled`] immediately.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut f: F,
) -> Result<T, RemoteAuthError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteAuthError>>,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RemoteAuthError::Cancelled),
            outcome = f() => outcome,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => e,
        };

        if attempts >= policy.max_attempts {
            warn!(
                operation,
                attempts,
                error = %error,
                "Identity service retries exhausted"
            );
            return Err(RemoteAuthError::Exhausted {
                attempts,
                last: Box::new(error),
            });
        }

        debug!(
            operation,
            attempt = attempts,
            delay_ms = policy.backoff.as_millis() as u64,
            error = %error,
            "Retrying identity service call after backoff"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RemoteAuthError::Cancelled),
            _ = tokio::time::sleep(policy.backoff) => {},
        }
    }
}
