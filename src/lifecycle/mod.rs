// Procurement lifecycle: requisition status machine, sub-entity records and
// the six-stage projection derived from them.

pub mod projector;
pub mod state_machine;
pub mod types;

pub use projector::{project, ActionGates, InvariantViolation, StageId, StageStatus, StageView};
pub use state_machine::{RequisitionEvent, RequisitionLifecycle, TransitionError};
pub use types::*;
