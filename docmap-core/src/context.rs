//! Deadline scopes for backend calls.

use std::{future::Future, time::Duration};
use tokio::time::{self, Instant};

use crate::error::{ModelError, ModelResult};

/// The deadline scope a model handle runs its backend calls under.
///
/// The default context has no deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// A context without a deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Runs `future` to completion or until the deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DeadlineExceeded`] if the deadline passes first;
    /// the future is dropped. An expired context never polls `future`.
    pub async fn run<F, T>(&self, future: F) -> ModelResult<T>
    where
        F: Future<Output = ModelResult<T>>,
    {
        if self.is_expired() {
            return Err(ModelError::DeadlineExceeded);
        }

        match self.deadline {
            Some(deadline) => time::timeout_at(deadline, future)
                .await
                .map_err(|_| ModelError::DeadlineExceeded)?,
            None => future.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_expires() {
        let context = Context::background();

        assert!(!context.is_expired());
        assert_eq!(context.run(async { Ok(7) }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let context = Context::with_timeout(Duration::from_millis(10));

        let result = context
            .run(async {
                time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(ModelError::DeadlineExceeded));
        assert!(context.is_expired());
    }

    #[tokio::test]
    async fn test_expired_context_skips_the_call() {
        let context = Context::with_deadline(Instant::now());

        let result = context.run(async { Ok(1) }).await;

        assert_eq!(result, Err(ModelError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let context = Context::with_timeout(Duration::from_secs(5));

        assert_eq!(context.run(async { Ok("done") }).await, Ok("done"));
    }
}
