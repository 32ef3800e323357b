// Status and record types for a requisition and its dependent entities.
//
// Aggregate statuses (sourcing, ordering, receiving, quality) are always
// computed from the underlying records, never stored alongside them.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treat an explicit `null` the same as a missing field.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Requisition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequisitionStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl RequisitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequisitionStatus::Draft => "Draft",
            RequisitionStatus::Pending => "Pending",
            RequisitionStatus::Approved => "Approved",
            RequisitionStatus::Rejected => "Rejected",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, RequisitionStatus::Draft)
    }
}

impl fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_id: u64,
    pub quantity: f64,
    pub unit_id: Option<u64>,
    pub specification: Option<String>,
}

impl LineItem {
    pub fn new(item_id: u64, quantity: f64) -> Self {
        Self {
            item_id,
            quantity,
            unit_id: None,
            specification: None,
        }
    }

    pub fn with_unit(mut self, unit_id: u64) -> Self {
        self.unit_id = Some(unit_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: u64,
    pub pr_number: Option<String>,
    #[serde(default)]
    pub status: RequisitionStatus,
    #[serde(default)]
    pub priority: Priority,
    pub department_id: Option<u64>,
    pub requested_by: Option<u64>,
    pub required_by: Option<NaiveDate>,
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub items: Vec<LineItem>,
}

impl Requisition {
    /// An empty draft, the shape a freshly created requisition has.
    pub fn draft(id: u64) -> Self {
        Self {
            id,
            pr_number: None,
            status: RequisitionStatus::Draft,
            priority: Priority::default(),
            department_id: None,
            requested_by: None,
            required_by: None,
            purpose: None,
            items: Vec::new(),
        }
    }
}

/// Requester-editable fields of a requisition, used for create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionDraft {
    pub department_id: Option<u64>,
    pub required_by: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    pub purpose: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
            ApprovalStatus::Unknown => "Unknown",
        }
    }
}

/// The action an approver takes on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Read-only view of the approval routing for one requisition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalState {
    pub id: Option<u64>,
    pub requisition_id: Option<u64>,
    pub status: Option<ApprovalStatus>,
    pub current_step: Option<String>,
}

impl ApprovalState {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, Some(ApprovalStatus::Pending))
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            Some(ApprovalStatus::Approved) | Some(ApprovalStatus::Rejected)
        )
    }
}

// ---------------------------------------------------------------------------
// Sourcing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotationStatus {
    Received,
    Selected,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: u64,
    pub supplier_id: u64,
    pub status: QuotationStatus,
    pub rfq_id: Option<u64>,
    pub total_amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourcingStatus {
    #[default]
    None,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcingState {
    #[serde(default)]
    pub rfq_count: u32,
    #[serde(default, deserialize_with = "null_to_default")]
    pub quotations: Vec<Quotation>,
}

impl SourcingState {
    pub fn status(&self) -> SourcingStatus {
        if self.selected_quotation().is_some() {
            SourcingStatus::Completed
        } else if !self.quotations.is_empty() {
            SourcingStatus::InProgress
        } else {
            SourcingStatus::None
        }
    }

    pub fn selected_quotation(&self) -> Option<&Quotation> {
        self.quotations
            .iter()
            .find(|q| q.status == QuotationStatus::Selected)
    }

    pub fn selected_quotation_id(&self) -> Option<u64> {
        self.selected_quotation().map(|q| q.id)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Closed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: u64,
    pub po_number: String,
    pub status: PurchaseOrderStatus,
    pub quotation_id: Option<u64>,
    pub supplier_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderingStatus {
    #[default]
    None,
    Pending,
    Approved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingState {
    #[serde(default, deserialize_with = "null_to_default")]
    pub purchase_orders: Vec<PurchaseOrder>,
}

impl OrderingState {
    pub fn status(&self) -> OrderingStatus {
        if self.approved_orders().next().is_some() {
            OrderingStatus::Approved
        } else if !self.purchase_orders.is_empty() {
            OrderingStatus::Pending
        } else {
            OrderingStatus::None
        }
    }

    pub fn approved_orders(&self) -> impl Iterator<Item = &PurchaseOrder> {
        self.purchase_orders
            .iter()
            .filter(|po| po.status == PurchaseOrderStatus::Approved)
    }
}

// ---------------------------------------------------------------------------
// Receiving
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrnStatus {
    #[serde(rename = "Pending Inspection")]
    PendingInspection,
    Inspected,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsReceiptNote {
    pub id: u64,
    pub grn_number: String,
    pub purchase_order_id: Option<u64>,
    pub status: GrnStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceivingStatus {
    #[default]
    None,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivingState {
    #[serde(default, deserialize_with = "null_to_default")]
    pub grns: Vec<GoodsReceiptNote>,
}

impl ReceivingState {
    pub fn status(&self) -> ReceivingStatus {
        if self.grns.is_empty() {
            ReceivingStatus::None
        } else if self.grns.iter().all(|g| g.status == GrnStatus::Completed) {
            ReceivingStatus::Completed
        } else {
            ReceivingStatus::InProgress
        }
    }
}

// ---------------------------------------------------------------------------
// Quality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InspectionOutcome {
    Passed,
    Failed,
    /// An outcome this crate does not know, e.g. a conditional release.
    #[serde(other)]
    Unknown,
}

impl InspectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionOutcome::Passed => "Passed",
            InspectionOutcome::Failed => "Failed",
            InspectionOutcome::Unknown => "Unknown",
        }
    }
}

/// Inspection of a single GRN line item. `outcome` stays empty until inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub grn_id: u64,
    pub item_id: u64,
    pub outcome: Option<InspectionOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityStatus {
    #[default]
    None,
    Partial,
    Completed,
}

pub type QualityResult = InspectionOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityState {
    #[serde(default, deserialize_with = "null_to_default")]
    pub inspections: Vec<InspectionRecord>,
}

impl QualityState {
    pub fn status(&self) -> QualityStatus {
        let inspected = self
            .inspections
            .iter()
            .filter(|r| r.outcome.is_some())
            .count();
        if inspected == 0 {
            QualityStatus::None
        } else if inspected == self.inspections.len() {
            QualityStatus::Completed
        } else {
            QualityStatus::Partial
        }
    }

    /// Failed as soon as any line failed; Passed only once every line passed.
    /// A completed inspection with an unrecognised outcome and no failure is
    /// `Unknown`.
    pub fn result(&self) -> Option<QualityResult> {
        let has = |outcome: InspectionOutcome| self.inspections.iter().any(|r| r.outcome == Some(outcome));
        if has(InspectionOutcome::Failed) {
            Some(InspectionOutcome::Failed)
        } else if self.status() != QualityStatus::Completed {
            None
        } else if has(InspectionOutcome::Unknown) {
            Some(InspectionOutcome::Unknown)
        } else {
            Some(InspectionOutcome::Passed)
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Everything the projector needs for one requisition. Assembled by the
/// backend and replaced wholesale after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleBundle {
    pub requisition: Requisition,
    #[serde(default, deserialize_with = "null_to_default")]
    pub approval: ApprovalState,
    #[serde(default, deserialize_with = "null_to_default")]
    pub sourcing: SourcingState,
    #[serde(default, deserialize_with = "null_to_default")]
    pub ordering: OrderingState,
    #[serde(default, deserialize_with = "null_to_default")]
    pub receiving: ReceivingState,
    #[serde(default, deserialize_with = "null_to_default")]
    pub quality: QualityState,
}

impl LifecycleBundle {
    /// A bundle with only the requisition populated.
    pub fn for_requisition(requisition: Requisition) -> Self {
        Self {
            requisition,
            approval: ApprovalState::default(),
            sourcing: SourcingState::default(),
            ordering: OrderingState::default(),
            receiving: ReceivingState::default(),
            quality: QualityState::default(),
        }
    }
}
