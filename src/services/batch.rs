//! Batch dispatcher
//!
//! Runs many independent operations concurrently under a fixed pool of
//! execution slots. Results always come back in input order regardless
//! of completion order.

use crate::utils::error::{AiError, AiResult};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Batch dispatch configuration
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Maximum operations in flight at once
    pub concurrency: usize,
    /// When true, a failing input's slot holds its error instead of
    /// aborting the whole batch; when false, the first failure cancels
    /// everything in flight and fails the batch.
    pub return_exceptions: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            return_exceptions: true,
        }
    }
}

/// Bounded-concurrency dispatcher for independent operations
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    config: BatchConfig,
}

impl BatchDispatcher {
    /// Create a dispatcher
    pub fn new(config: BatchConfig) -> Self {
        assert!(config.concurrency > 0, "concurrency must be positive");
        Self { config }
    }

    /// Run `op` over every input with at most `concurrency` operations in
    /// flight. Admission happens through a semaphore of execution slots:
    /// every task is spawned but suspends until it holds a slot.
    ///
    /// With `return_exceptions` the returned vector has one slot per
    /// input, in input order, each holding the operation's result. In
    /// fail-fast mode the first failure aborts all remaining work and
    /// becomes the batch error.
    pub async fn dispatch<T, R, F>(&self, inputs: Vec<T>, op: F) -> AiResult<Vec<AiResult<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> BoxFuture<'static, AiResult<R>>,
    {
        let total = inputs.len();
        let slots = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks: JoinSet<(usize, AiResult<R>)> = JoinSet::new();

        debug!(
            total,
            concurrency = self.config.concurrency,
            "Dispatching batch"
        );

        for (index, input) in inputs.into_iter().enumerate() {
            let slots = slots.clone();
            let future = op(input);
            tasks.spawn(async move {
                let _slot = slots
                    .acquire_owned()
                    .await
                    .expect("batch slot semaphore closed");
                (index, future.await)
            });
        }

        let mut results: Vec<Option<AiResult<R>>> = Vec::with_capacity(total);
        results.resize_with(total, || None);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(err) = &result {
                        if !self.config.return_exceptions {
                            error!(index, "Batch failed fast: {}", err);
                            tasks.abort_all();
                            return Err(err.clone());
                        }
                        error!(index, "Batch operation failed: {}", err);
                    }
                    results[index] = Some(result);
                }
                Err(join_error) => {
                    if join_error.is_cancelled() {
                        continue;
                    }
                    // A panicked operation poisons its slot; surface it as
                    // a typed error rather than unwinding the batch.
                    let err = AiError::Provider {
                        status: 0,
                        message: format!("batch operation panicked: {}", join_error),
                    };
                    if !self.config.return_exceptions {
                        tasks.abort_all();
                        return Err(err);
                    }
                    // Slot index is lost with the panic; leave it to the
                    // fill pass below.
                    error!("Batch operation panicked: {}", join_error);
                }
            }
        }

        let results = results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(AiError::Provider {
                        status: 0,
                        message: "batch operation panicked".to_string(),
                    })
                })
            })
            .collect();
        Ok(results)
    }
}
