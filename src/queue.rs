//! Priority Task Queue
//!
//! Sorted-insertion container of deferred work. Tasks carry an action, its
//! parameters and a numeric priority; the queue only decides the order in which
//! actions are *started*. It never suspends and performs no I/O.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

pub mod scheduler;

pub use scheduler::{GenerationJob, GenerationScheduler, JobOutcome};

/// Deferred unit of work, consumed when invoked.
pub type Action<P, R> = Box<dyn FnOnce(Vec<P>) -> R + Send>;

/// Ordering mode of a [`TaskQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    /// Stored smallest-first; pops from the tail.
    Ascending,
    /// Stored largest-first; pops from the head.
    #[default]
    Descending,
    /// Stored in push order; pops from the tail (LIFO).
    Unordered,
}

impl QueueOrder {
    /// Resolve the two independent ordering flags into a single mode.
    pub fn from_flags(ascending: bool, descending: bool) -> Result<Self, ApiError> {
        match (ascending, descending) {
            (true, true) => Err(ApiError::Configuration(
                "queue cannot be both ascending and descending".to_string(),
            )),
            (true, false) => Ok(QueueOrder::Ascending),
            (false, true) => Ok(QueueOrder::Descending),
            (false, false) => Ok(QueueOrder::Unordered),
        }
    }

    pub fn is_sorted(self) -> bool {
        !matches!(self, QueueOrder::Unordered)
    }
}

impl std::str::FromStr for QueueOrder {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" => Ok(QueueOrder::Ascending),
            "descending" => Ok(QueueOrder::Descending),
            "unordered" => Ok(QueueOrder::Unordered),
            other => Err(ApiError::Configuration(format!(
                "Unknown queue order '{}' (expected ascending, descending or unordered)",
                other
            ))),
        }
    }
}

/// A queued unit of work.
pub struct Task<P, R> {
    /// Invoked with `params` on execution. `None` marks a task that cannot run.
    pub action: Option<Action<P, R>>,
    pub params: Vec<P>,
    pub priority: f64,
}

impl<P, R> Task<P, R> {
    pub fn new<F>(action: F, params: Vec<P>, priority: f64) -> Self
    where
        F: FnOnce(Vec<P>) -> R + Send + 'static,
    {
        Self {
            action: Some(Box::new(action)),
            params,
            priority,
        }
    }

    /// Task without parameters.
    pub fn with_priority<F>(action: F, priority: f64) -> Self
    where
        F: FnOnce(Vec<P>) -> R + Send + 'static,
    {
        Self::new(action, Vec::new(), priority)
    }

    /// Invoke the action with the task's parameters.
    ///
    /// Whatever the action returns is handed back untouched; the only failure
    /// raised here is a task with no invocable action.
    pub fn run(self) -> Result<R, ApiError> {
        let action = self.action.ok_or_else(|| {
            ApiError::InvalidTask("task action is not invocable".to_string())
        })?;
        Ok(action(self.params))
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.priority.is_finite() {
            Ok(())
        } else {
            Err(ApiError::InvalidTask(format!(
                "task priority must be a finite number, got {}",
                self.priority
            )))
        }
    }
}

impl<P, R> fmt::Debug for Task<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("params", &self.params.len())
            .field("invocable", &self.action.is_some())
            .finish()
    }
}

/// Priority-ordered task container.
///
/// Ascending queues pop from the tail and descending queues pop from the head,
/// so both release the largest remaining priority first. Equal priorities keep
/// their push order in storage.
pub struct TaskQueue<P, R> {
    tasks: VecDeque<Task<P, R>>,
    order: QueueOrder,
}

impl<P, R> TaskQueue<P, R> {
    /// Build a queue from initial tasks and the two ordering flags.
    ///
    /// Fails with [`ApiError::Configuration`] when both flags are set and with
    /// [`ApiError::InvalidTask`] when an initial task has a non-finite priority.
    pub fn new(tasks: Vec<Task<P, R>>, ascending: bool, descending: bool) -> Result<Self, ApiError> {
        let order = QueueOrder::from_flags(ascending, descending)?;
        Self::with_tasks(tasks, order)
    }

    pub fn with_order(order: QueueOrder) -> Self {
        Self {
            tasks: VecDeque::new(),
            order,
        }
    }

    pub fn with_tasks(mut tasks: Vec<Task<P, R>>, order: QueueOrder) -> Result<Self, ApiError> {
        for task in &tasks {
            task.validate()?;
        }
        match order {
            QueueOrder::Ascending => tasks.sort_by(|a, b| a.priority.total_cmp(&b.priority)),
            QueueOrder::Descending => tasks.sort_by(|a, b| b.priority.total_cmp(&a.priority)),
            QueueOrder::Unordered => {}
        }
        Ok(Self {
            tasks: tasks.into(),
            order,
        })
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Priorities in storage order.
    pub fn priorities(&self) -> impl Iterator<Item = f64> + '_ {
        self.tasks.iter().map(|task| task.priority)
    }

    /// Insert a task, keeping sort order in ordered modes.
    ///
    /// The insertion index is found by binary search and lands after any run
    /// of equal priorities.
    pub fn push(&mut self, task: Task<P, R>) -> Result<(), ApiError> {
        task.validate()?;
        let priority = task.priority;
        let index = match self.order {
            QueueOrder::Unordered => self.tasks.len(),
            QueueOrder::Ascending => self.tasks.partition_point(|t| t.priority <= priority),
            QueueOrder::Descending => self.tasks.partition_point(|t| t.priority >= priority),
        };
        self.tasks.insert(index, task);
        debug!(priority, index, pending = self.tasks.len(), "Task queued");
        Ok(())
    }

    /// Remove the next task, or `None` when the queue is empty.
    pub fn pop(&mut self) -> Option<Task<P, R>> {
        let task = match self.order {
            QueueOrder::Descending => self.tasks.pop_front(),
            QueueOrder::Ascending | QueueOrder::Unordered => self.tasks.pop_back(),
        };
        if let Some(ref task) = task {
            debug!(priority = task.priority, pending = self.tasks.len(), "Task dequeued");
        }
        task
    }

    /// Invoke a task's action. Fails with [`ApiError::InvalidTask`] if the task
    /// is absent or has no action; the action's own result is returned as is.
    pub fn exec(task: Option<Task<P, R>>) -> Result<R, ApiError> {
        task.ok_or_else(|| ApiError::InvalidTask("no task to execute".to_string()))?
            .run()
    }

    /// One scheduler tick: pop the next task and run it.
    pub fn pop_exec(&mut self) -> Result<Option<R>, ApiError> {
        match self.pop() {
            Some(task) => Self::exec(Some(task)).map(Some),
            None => Ok(None),
        }
    }
}

impl<P, R> Default for TaskQueue<P, R> {
    fn default() -> Self {
        Self::with_order(QueueOrder::default())
    }
}

impl<P, R> fmt::Debug for TaskQueue<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("order", &self.order)
            .field("len", &self.tasks.len())
            .finish()
    }
}
