// Collaborator contracts consumed by the workflow controller.
//
// The backend owns persistence, numbering and approval routing. This crate
// only reads lifecycle bundles and asks for transitions through these traits.

pub mod memory;
pub mod rest;
pub mod types;

use async_trait::async_trait;

use crate::lifecycle::types::{
    ApprovalState, GoodsReceiptNote, LifecycleBundle, PurchaseOrder, Requisition, RequisitionDraft,
};

pub use memory::{ApiCall, InMemoryProcurementApi};
pub use rest::RestProcurementApi;
pub use types::*;

/// Remote procurement operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProcurementApi: Send + Sync {
    async fn fetch_requisition(&self, requisition_id: u64) -> TransportResult<Requisition>;

    /// The complete, internally consistent bundle for one requisition.
    async fn fetch_lifecycle(&self, requisition_id: u64) -> TransportResult<LifecycleBundle>;

    async fn create_requisition(
        &self,
        draft: &RequisitionDraft,
        requested_by: u64,
    ) -> TransportResult<Requisition>;

    async fn update_requisition(
        &self,
        requisition_id: u64,
        draft: &RequisitionDraft,
    ) -> TransportResult<Requisition>;

    async fn submit_requisition(&self, requisition_id: u64) -> TransportResult<Requisition>;

    async fn fetch_approval(&self, approval_id: u64) -> TransportResult<ApprovalState>;

    async fn decide_approval(
        &self,
        approval_id: u64,
        request: &DecisionRequest,
    ) -> TransportResult<ApprovalState>;

    async fn create_purchase_order(
        &self,
        request: &PurchaseOrderRequest,
    ) -> TransportResult<PurchaseOrder>;

    async fn create_grn(&self, request: &GrnRequest) -> TransportResult<GoodsReceiptNote>;

    async fn create_rfq(&self, request: &RfqRequest) -> TransportResult<RfqRecord>;

    /// Read-only master data lookup.
    async fn supplier_price_list(&self, supplier_id: u64) -> TransportResult<Vec<CatalogPrice>>;
}

/// Identity of the signed-in user
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionStore: Send + Sync {
    fn current_user_id(&self) -> Option<u64>;
}

/// Session with a fixed user, for services acting on behalf of one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticSession {
    pub user_id: Option<u64>,
}

impl StaticSession {
    pub fn signed_in(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl SessionStore for StaticSession {
    fn current_user_id(&self) -> Option<u64> {
        self.user_id
    }
}
