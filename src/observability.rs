use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Workflow and batch execution counters
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub transitions: AtomicU64,
    pub rejected_transitions: AtomicU64,
    pub batch_tasks_succeeded: AtomicU64,
    pub batch_tasks_failed: AtomicU64,
    pub api_errors: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_transition(&self) {
        self.rejected_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_task(&self, succeeded: bool) {
        if succeeded {
            self.batch_tasks_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.batch_tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_api_error(&self) {
        self.api_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            transitions: self.transitions.load(Ordering::Relaxed),
            rejected_transitions: self.rejected_transitions.load(Ordering::Relaxed),
            batch_tasks_succeeded: self.batch_tasks_succeeded.load(Ordering::Relaxed),
            batch_tasks_failed: self.batch_tasks_failed.load(Ordering::Relaxed),
            api_errors: self.api_errors.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            transitions = stats.transitions,
            rejected_transitions = stats.rejected_transitions,
            batch_tasks_succeeded = stats.batch_tasks_succeeded,
            batch_tasks_failed = stats.batch_tasks_failed,
            api_errors = stats.api_errors,
            "Workflow metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowStats {
    pub transitions: u64,
    pub rejected_transitions: u64,
    pub batch_tasks_succeeded: u64,
    pub batch_tasks_failed: u64,
    pub api_errors: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = WorkflowMetrics::new();
        metrics.record_transition();
        metrics.record_rejected_transition();
        metrics.record_batch_task(true);
        metrics.record_batch_task(true);
        metrics.record_batch_task(false);

        let stats = metrics.get_stats();
        assert_eq!(stats.transitions, 1);
        assert_eq!(stats.rejected_transitions, 1);
        assert_eq!(stats.batch_tasks_succeeded, 2);
        assert_eq!(stats.batch_tasks_failed, 1);
        assert_eq!(stats.api_errors, 0);
    }
}
