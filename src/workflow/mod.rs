// Workflow Module - requisition transitions, document creation and RFQ batches
//
// The controller never trusts the caller's view of the lifecycle: each
// operation checks the local gates first, calls the backend, then refetches.

pub mod controller;
pub mod document;
pub mod rfq;
pub mod validation;


pub use controller::{LifecycleSnapshot, RfqBatchOutcome, WorkflowController};
pub use document::DocumentRef;
pub use rfq::{PriceCatalog, RfqTemplate};
pub use validation::{validate_draft, validate_for_submission};
