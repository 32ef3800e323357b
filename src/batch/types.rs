use serde::Serialize;
use std::time::Duration;

use crate::config::BatchConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Pause between consecutive tasks. Never applied after the last one.
    pub delay: Option<Duration>,
}

impl BatchOptions {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            delay: config.inter_task_delay(),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }
}

/// Number of settled tasks out of the batch size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn is_complete(&self) -> bool {
        self.current == self.total
    }
}

/// Snapshot published on the executor's watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchState {
    pub progress: BatchProgress,
    pub is_pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure<E> {
    pub index: usize,
    pub error: E,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSuccess<T> {
    pub index: usize,
    pub value: T,
}

/// Outcome of one batch. Failures never abort the batch; they are listed here.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T, E> {
    pub total: usize,
    pub successes: usize,
    pub failures: Vec<BatchFailure<E>>,
    pub values: Vec<BatchSuccess<T>>,
}

impl<T, E> BatchReport<T, E> {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            successes: 0,
            failures: Vec::new(),
            values: Vec::with_capacity(total),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} succeeded, {} failed",
            self.successes,
            self.total,
            self.failures.len()
        )
    }
}

/// Per-task callbacks, invoked in task order as each task settles.
pub trait BatchObserver<T, E>: Send + Sync {
    fn on_success(&self, _index: usize, _value: &T) {}

    fn on_failure(&self, _index: usize, _error: &E) {}

    fn on_progress(&self, _progress: BatchProgress) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<T, E> BatchObserver<T, E> for NoopObserver {}
