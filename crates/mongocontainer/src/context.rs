//! Caller-supplied execution context
//!
//! Every store operation takes an [`OpContext`]. The context carries an
//! optional deadline and an optional cancellation token; nothing in this
//! crate creates an unbounded context on the caller's behalf.

use mongocontainer_common::{ContainerError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation scope for a single operation
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl OpContext {
    /// A context with no deadline and no cancellation
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Attach a cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Derive a context bounded by both this context and `timeout`.
    ///
    /// Cancelling the parent token cancels the child; cancelling the child
    /// leaves the parent untouched.
    pub fn child(&self, timeout: Duration) -> Self {
        let child_deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => parent.min(child_deadline),
            None => child_deadline,
        };
        Self {
            deadline: Some(deadline),
            cancel: Some(
                self.cancel
                    .as_ref()
                    .map(CancellationToken::child_token)
                    .unwrap_or_else(CancellationToken::new),
            ),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Check the context before starting work
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ContainerError::Cancelled(operation.to_string()));
        }
        if self.is_expired() {
            return Err(ContainerError::Timeout(format!(
                "{} exceeded its deadline",
                operation
            )));
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the deadline passes or the token fires first.
    ///
    /// An already expired or cancelled context fails without polling `fut`.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(operation)?;

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(ContainerError::Timeout(format!(
                        "{} exceeded its deadline",
                        operation
                    ))),
                },
                None => fut.await,
            }
        };

        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ContainerError::Cancelled(operation.to_string())),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }
}
