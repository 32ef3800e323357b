// Procurement Lifecycle Library - requisition-to-quality workflow core
// This exposes the projector, batch executor and workflow controller.

pub mod batch;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod telemetry;
pub mod transport;
pub mod workflow;

// Re-export key types for easy access
pub use batch::{BatchExecutor, BatchOptions, BatchProgress, BatchReport, BatchState};
pub use config::{config, init_config, ProcurementConfig};
pub use error::{ProcurementError, Result};
pub use lifecycle::{
    project, ActionGates, InvariantViolation, LifecycleBundle, RequisitionEvent,
    RequisitionLifecycle, StageId, StageStatus, StageView,
};
pub use observability::{workflow_metrics, OperationTimer, WorkflowMetrics};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use transport::{
    InMemoryProcurementApi, ProcurementApi, RestProcurementApi, SessionStore, StaticSession,
    TransportError,
};
pub use workflow::{DocumentRef, LifecycleSnapshot, RfqBatchOutcome, RfqTemplate, WorkflowController};
