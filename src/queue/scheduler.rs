//! Generation scheduler: drains a [`TaskQueue`] of generation jobs.
//!
//! The queue fixes the order in which dispatches are *started*; this module
//! decides how many run at once. Completion order is not guaranteed when more
//! than one is in flight.

use crate::dispatch::GenerationDispatcher;
use crate::error::ApiError;
use crate::provider::PromptMessage;
use crate::queue::{QueueOrder, Task, TaskQueue};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One requested generation, as submitted by callers or read from a batch file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub preset: String,
    #[serde(default)]
    pub priority: f64,
    pub messages: Vec<PromptMessage>,
}

/// A started dispatch whose result has not been awaited yet.
pub struct PendingGeneration {
    pub preset: String,
    pub priority: f64,
    pub future: BoxFuture<'static, Result<String, ApiError>>,
}

impl PendingGeneration {
    async fn resolve(self, index: usize) -> JobOutcome {
        JobOutcome {
            index,
            preset: self.preset,
            priority: self.priority,
            result: self.future.await,
        }
    }
}

/// Result of one job. `index` is its position in start order.
#[derive(Debug)]
pub struct JobOutcome {
    pub index: usize,
    pub preset: String,
    pub priority: f64,
    pub result: Result<String, ApiError>,
}

impl GenerationJob {
    /// Queue task whose params are the job's messages and whose action starts
    /// the dispatch.
    pub fn into_task(
        self,
        dispatcher: Arc<GenerationDispatcher>,
        cancel: CancellationToken,
    ) -> Task<PromptMessage, PendingGeneration> {
        let GenerationJob {
            preset,
            priority,
            messages,
        } = self;
        Task::new(
            move |messages: Vec<PromptMessage>| {
                let name = preset.clone();
                let future: BoxFuture<'static, Result<String, ApiError>> = Box::pin(async move {
                    dispatcher.dispatch(&messages, &name, Some(&cancel)).await
                });
                PendingGeneration {
                    preset,
                    priority,
                    future,
                }
            },
            messages,
            priority,
        )
    }
}

pub struct GenerationScheduler {
    queue: TaskQueue<PromptMessage, PendingGeneration>,
    dispatcher: Arc<GenerationDispatcher>,
    cancel: CancellationToken,
}

impl GenerationScheduler {
    pub fn new(order: QueueOrder, dispatcher: Arc<GenerationDispatcher>) -> Self {
        Self {
            queue: TaskQueue::with_order(order),
            dispatcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Token whose cancellation aborts every job submitted to this scheduler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn submit(&mut self, job: GenerationJob) -> Result<(), ApiError> {
        debug!(preset = %job.preset, priority = job.priority, "Submitting generation job");
        let task = job.into_task(Arc::clone(&self.dispatcher), self.cancel.child_token());
        self.queue.push(task)
    }

    /// Start and await one job at a time, in queue order.
    pub async fn run_sequential(&mut self) -> Result<Vec<JobOutcome>, ApiError> {
        info!(pending = self.queue.len(), "Draining generation queue sequentially");
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(pending) = self.queue.pop_exec()? {
            let index = outcomes.len();
            outcomes.push(pending.resolve(index).await);
        }
        Ok(outcomes)
    }

    /// Start jobs in queue order with at most `limit` in flight.
    ///
    /// Outcomes are returned in completion order.
    pub async fn run_concurrent(&mut self, limit: usize) -> Result<Vec<JobOutcome>, ApiError> {
        let limit = limit.max(1);
        info!(pending = self.queue.len(), limit, "Draining generation queue concurrently");
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes = Vec::with_capacity(self.queue.len());
        let mut started = 0usize;

        loop {
            while in_flight.len() < limit {
                let Some(pending) = self.queue.pop_exec()? else {
                    break;
                };
                in_flight.push(pending.resolve(started));
                started += 1;
            }
            match in_flight.next().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        Ok(outcomes)
    }
}
