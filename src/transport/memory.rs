// In-memory procurement backend. Behaves like the real service closely enough
// to drive the controller offline and in tests, and records every call.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::lifecycle::types::*;
use crate::transport::types::*;
use crate::transport::ProcurementApi;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    FetchRequisition(u64),
    FetchLifecycle(u64),
    CreateRequisition { requested_by: u64 },
    UpdateRequisition(u64),
    SubmitRequisition(u64),
    FetchApproval(u64),
    DecideApproval { approval_id: u64, decision: ApprovalDecision },
    CreatePurchaseOrder(PurchaseOrderRequest),
    CreateGrn(GrnRequest),
    CreateRfq(RfqRequest),
    SupplierPriceList(u64),
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    requisitions: HashMap<u64, Requisition>,
    approvals: HashMap<u64, ApprovalState>,
    sourcing: HashMap<u64, SourcingState>,
    ordering: HashMap<u64, OrderingState>,
    receiving: HashMap<u64, ReceivingState>,
    quality: HashMap<u64, QualityState>,
    price_lists: HashMap<u64, Vec<CatalogPrice>>,
    failing_suppliers: HashSet<u64>,
    failing_price_lists: HashSet<u64>,
    calls: Vec<ApiCall>,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn requisition(&self, id: u64) -> TransportResult<&Requisition> {
        self.requisitions
            .get(&id)
            .ok_or_else(|| TransportError::http(404, Some(format!("requisition {id} not found"))))
    }

    fn approval_for(&self, requisition_id: u64) -> Option<&ApprovalState> {
        self.approvals
            .values()
            .find(|a| a.requisition_id == Some(requisition_id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProcurementApi {
    store: Arc<Mutex<Store>>,
}

impl InMemoryProcurementApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A poisoned store only means a test panicked mid-call; the data is still usable.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_requisition(&self, requisition: Requisition) {
        let mut store = self.lock();
        store.next_id = store.next_id.max(requisition.id);
        store.requisitions.insert(requisition.id, requisition);
    }

    /// Store a whole bundle, replacing whatever was known for its requisition.
    pub fn insert_bundle(&self, bundle: LifecycleBundle) {
        let id = bundle.requisition.id;
        self.insert_requisition(bundle.requisition);
        let mut store = self.lock();
        if let Some(approval_id) = bundle.approval.id {
            let mut approval = bundle.approval;
            approval.requisition_id = Some(id);
            store.next_id = store.next_id.max(approval_id);
            store.approvals.insert(approval_id, approval);
        }
        store.sourcing.insert(id, bundle.sourcing);
        store.ordering.insert(id, bundle.ordering);
        store.receiving.insert(id, bundle.receiving);
        store.quality.insert(id, bundle.quality);
    }

    pub fn set_price_list(&self, supplier_id: u64, prices: Vec<CatalogPrice>) {
        self.lock().price_lists.insert(supplier_id, prices);
    }

    /// Make every RFQ addressed to this supplier fail with HTTP 422.
    pub fn fail_rfqs_for_supplier(&self, supplier_id: u64) {
        self.lock().failing_suppliers.insert(supplier_id);
    }

    /// Make the supplier's price list lookup fail with HTTP 503.
    pub fn fail_price_list_for_supplier(&self, supplier_id: u64) {
        self.lock().failing_price_lists.insert(supplier_id);
    }

    /// Record a quotation received against a requisition.
    pub fn add_quotation(&self, requisition_id: u64, quotation: Quotation) {
        self.lock()
            .sourcing
            .entry(requisition_id)
            .or_default()
            .quotations
            .push(quotation);
    }

    /// Approve a purchase order, as the backend's PO approval flow would.
    pub fn approve_purchase_order(&self, requisition_id: u64, purchase_order_id: u64) {
        let mut store = self.lock();
        if let Some(po) = store
            .ordering
            .entry(requisition_id)
            .or_default()
            .purchase_orders
            .iter_mut()
            .find(|po| po.id == purchase_order_id)
        {
            po.status = PurchaseOrderStatus::Approved;
        }
    }

    pub fn approval_id_for(&self, requisition_id: u64) -> Option<u64> {
        self.lock().approval_for(requisition_id).and_then(|a| a.id)
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn rfq_requests(&self) -> Vec<RfqRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ApiCall::CreateRfq(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) -> MutexGuard<'_, Store> {
        let mut store = self.lock();
        store.calls.push(call);
        store
    }
}

#[async_trait]
impl ProcurementApi for InMemoryProcurementApi {
    async fn fetch_requisition(&self, requisition_id: u64) -> TransportResult<Requisition> {
        let store = self.record(ApiCall::FetchRequisition(requisition_id));
        store.requisition(requisition_id).cloned()
    }

    async fn fetch_lifecycle(&self, requisition_id: u64) -> TransportResult<LifecycleBundle> {
        let store = self.record(ApiCall::FetchLifecycle(requisition_id));
        let requisition = store.requisition(requisition_id)?.clone();
        Ok(LifecycleBundle {
            requisition,
            approval: store.approval_for(requisition_id).cloned().unwrap_or_default(),
            sourcing: store.sourcing.get(&requisition_id).cloned().unwrap_or_default(),
            ordering: store.ordering.get(&requisition_id).cloned().unwrap_or_default(),
            receiving: store.receiving.get(&requisition_id).cloned().unwrap_or_default(),
            quality: store.quality.get(&requisition_id).cloned().unwrap_or_default(),
        })
    }

    async fn create_requisition(
        &self,
        draft: &RequisitionDraft,
        requested_by: u64,
    ) -> TransportResult<Requisition> {
        let mut store = self.record(ApiCall::CreateRequisition { requested_by });
        let id = store.next_id();
        let requisition = Requisition {
            id,
            pr_number: Some(format!("PR-{id:05}")),
            status: RequisitionStatus::Draft,
            priority: draft.priority,
            department_id: draft.department_id,
            requested_by: Some(requested_by),
            required_by: draft.required_by,
            purpose: draft.purpose.clone(),
            items: draft.items.clone(),
        };
        store.requisitions.insert(id, requisition.clone());
        Ok(requisition)
    }

    async fn update_requisition(
        &self,
        requisition_id: u64,
        draft: &RequisitionDraft,
    ) -> TransportResult<Requisition> {
        let mut store = self.record(ApiCall::UpdateRequisition(requisition_id));
        store.requisition(requisition_id)?;
        let requisition = store
            .requisitions
            .get_mut(&requisition_id)
            .ok_or_else(|| TransportError::http(404, None))?;
        if !requisition.status.is_draft() {
            return Err(TransportError::http(409, Some(format!("requisition is {}", requisition.status))));
        }
        requisition.priority = draft.priority;
        requisition.department_id = draft.department_id;
        requisition.required_by = draft.required_by;
        requisition.purpose = draft.purpose.clone();
        requisition.items = draft.items.clone();
        Ok(requisition.clone())
    }

    async fn submit_requisition(&self, requisition_id: u64) -> TransportResult<Requisition> {
        let mut store = self.record(ApiCall::SubmitRequisition(requisition_id));
        let status = store.requisition(requisition_id)?.status;
        if !status.is_draft() {
            return Err(TransportError::http(409, Some(format!("requisition is {status}"))));
        }

        let approval_id = store.next_id();
        store.approvals.insert(
            approval_id,
            ApprovalState {
                id: Some(approval_id),
                requisition_id: Some(requisition_id),
                status: Some(ApprovalStatus::Pending),
                current_step: Some("Department head".to_string()),
            },
        );
        let requisition = store
            .requisitions
            .get_mut(&requisition_id)
            .ok_or_else(|| TransportError::http(404, None))?;
        requisition.status = RequisitionStatus::Pending;
        Ok(requisition.clone())
    }

    async fn fetch_approval(&self, approval_id: u64) -> TransportResult<ApprovalState> {
        let store = self.record(ApiCall::FetchApproval(approval_id));
        store
            .approvals
            .get(&approval_id)
            .cloned()
            .ok_or_else(|| TransportError::http(404, Some(format!("approval {approval_id} not found"))))
    }

    async fn decide_approval(
        &self,
        approval_id: u64,
        request: &DecisionRequest,
    ) -> TransportResult<ApprovalState> {
        let mut store = self.record(ApiCall::DecideApproval {
            approval_id,
            decision: request.decision,
        });
        let approval = store
            .approvals
            .get_mut(&approval_id)
            .ok_or_else(|| TransportError::http(404, None))?;
        if !approval.is_pending() {
            return Err(TransportError::http(409, Some("approval already decided".to_string())));
        }
        let (approval_status, requisition_status) = match request.decision {
            ApprovalDecision::Approved => (ApprovalStatus::Approved, RequisitionStatus::Approved),
            ApprovalDecision::Rejected => (ApprovalStatus::Rejected, RequisitionStatus::Rejected),
        };
        approval.status = Some(approval_status);
        approval.current_step = None;
        let approval = approval.clone();

        if let Some(requisition) = approval
            .requisition_id
            .and_then(|id| store.requisitions.get_mut(&id))
        {
            requisition.status = requisition_status;
        }
        Ok(approval)
    }

    async fn create_purchase_order(
        &self,
        request: &PurchaseOrderRequest,
    ) -> TransportResult<PurchaseOrder> {
        let mut store = self.record(ApiCall::CreatePurchaseOrder(request.clone()));
        store.requisition(request.requisition_id)?;
        let id = store.next_id();
        let po = PurchaseOrder {
            id,
            po_number: format!("PO-{id:05}"),
            status: PurchaseOrderStatus::Pending,
            quotation_id: Some(request.quotation_id),
            supplier_id: Some(request.supplier_id),
        };
        store
            .ordering
            .entry(request.requisition_id)
            .or_default()
            .purchase_orders
            .push(po.clone());
        Ok(po)
    }

    async fn create_grn(&self, request: &GrnRequest) -> TransportResult<GoodsReceiptNote> {
        let mut store = self.record(ApiCall::CreateGrn(request.clone()));
        let item_ids: Vec<u64> = store
            .requisition(request.requisition_id)?
            .items
            .iter()
            .map(|i| i.item_id)
            .collect();
        let id = store.next_id();
        let grn = GoodsReceiptNote {
            id,
            grn_number: format!("GRN-{id:05}"),
            purchase_order_id: Some(request.purchase_order_id),
            status: GrnStatus::PendingInspection,
        };
        store
            .receiving
            .entry(request.requisition_id)
            .or_default()
            .grns
            .push(grn.clone());
        let inspections = &mut store.quality.entry(request.requisition_id).or_default().inspections;
        inspections.extend(item_ids.into_iter().map(|item_id| InspectionRecord {
            grn_id: id,
            item_id,
            outcome: None,
        }));
        Ok(grn)
    }

    async fn create_rfq(&self, request: &RfqRequest) -> TransportResult<RfqRecord> {
        let mut store = self.record(ApiCall::CreateRfq(request.clone()));
        store.requisition(request.requisition_id)?;
        if store.failing_suppliers.contains(&request.supplier_id) {
            return Err(TransportError::http(
                422,
                Some(format!("supplier {} cannot receive RFQs", request.supplier_id)),
            ));
        }
        let id = store.next_id();
        store.sourcing.entry(request.requisition_id).or_default().rfq_count += 1;
        Ok(RfqRecord {
            id,
            rfq_number: format!("RFQ-{id:05}"),
            supplier_id: request.supplier_id,
        })
    }

    async fn supplier_price_list(&self, supplier_id: u64) -> TransportResult<Vec<CatalogPrice>> {
        let store = self.record(ApiCall::SupplierPriceList(supplier_id));
        if store.failing_price_lists.contains(&supplier_id) {
            return Err(TransportError::http(503, Some("catalog service unavailable".to_string())));
        }
        Ok(store.price_lists.get(&supplier_id).cloned().unwrap_or_default())
    }
}
