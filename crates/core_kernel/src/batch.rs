//! Bounded-concurrency batch execution
//!
//! Processor runs fan out one future per claim (or per queued email). Items
//! run at most `concurrency` at a time, results come back in input order, and
//! a panic inside one item is caught and reported for that item alone.
//! External calls made inside an item go through [`with_timeout`] so a stuck
//! provider cannot hold the batch open indefinitely.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tracing::error;

use crate::ports::PortError;

/// Default timeout applied to every external call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of items processed concurrently
pub const DEFAULT_CONCURRENCY: usize = 5;

/// An item whose future panicked instead of producing a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPanic {
    pub message: String,
}

/// Runs per-item work with a concurrency bound and a per-call timeout
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    concurrency: usize,
    call_timeout: Duration,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, DEFAULT_CALL_TIMEOUT)
    }
}

impl BatchRunner {
    /// Creates a runner; a concurrency of zero is treated as one
    pub fn new(concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Runs `f` over every item, returning outcomes in input order
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, mut f: F) -> Vec<Result<R, ItemPanic>>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        futures::stream::iter(items)
            .map(|item| AssertUnwindSafe(f(item)).catch_unwind())
            .buffered(self.concurrency)
            .map(|outcome| {
                outcome.map_err(|payload| {
                    let message = panic_message(payload);
                    error!(panic = %message, "batch item panicked");
                    ItemPanic { message }
                })
            })
            .collect()
            .await
    }

    /// Awaits an external call, failing with `PortError::Timeout` when it overruns
    pub async fn call<T, Fut>(&self, operation: &str, fut: Fut) -> Result<T, PortError>
    where
        Fut: Future<Output = Result<T, PortError>>,
    {
        with_timeout(operation, self.call_timeout, fut).await
    }
}

/// Awaits `fut` for at most `timeout`
pub async fn with_timeout<T, Fut>(operation: &str, timeout: Duration, fut: Fut) -> Result<T, PortError>
where
    Fut: Future<Output = Result<T, PortError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(PortError::timeout(operation, timeout)),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
