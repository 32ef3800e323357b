// Lifecycle projection: six-stage composite view and action gates.
//
// Everything here is a pure function of a `LifecycleBundle`. Nothing is cached
// between calls, so a replaced bundle can never leave a stale stage behind.

use serde::{Deserialize, Serialize};

use crate::lifecycle::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageId {
    Requisition,
    Approval,
    Sourcing,
    Ordering,
    Receiving,
    Quality,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Requisition,
        StageId::Approval,
        StageId::Sourcing,
        StageId::Ordering,
        StageId::Receiving,
        StageId::Quality,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StageId::Requisition => "Requisition",
            StageId::Approval => "Approval",
            StageId::Sourcing => "Sourcing",
            StageId::Ordering => "Ordering",
            StageId::Receiving => "Receiving",
            StageId::Quality => "Quality",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StageId::Requisition => "Purchase requisition raised",
            StageId::Approval => "Requisition routed for approval",
            StageId::Sourcing => "Quotations requested from suppliers",
            StageId::Ordering => "Purchase order issued",
            StageId::Receiving => "Goods received against the order",
            StageId::Quality => "Received goods inspected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageStatus {
    None,
    Pending,
    Current,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub id: StageId,
    pub label: &'static str,
    pub description: &'static str,
    pub status: StageStatus,
    pub detail: Option<String>,
}

impl StageView {
    fn new(id: StageId, status: StageStatus, detail: Option<String>) -> Self {
        Self {
            id,
            label: id.label(),
            description: id.description(),
            status,
            detail,
        }
    }
}

/// Actions the caller may offer for the current bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGates {
    pub can_create_purchase_order: bool,
    pub can_create_grn: bool,
}

impl ActionGates {
    pub fn from_bundle(bundle: &LifecycleBundle) -> Self {
        Self {
            can_create_purchase_order: can_create_purchase_order(bundle),
            can_create_grn: can_create_grn(bundle),
        }
    }
}

pub fn can_create_purchase_order(bundle: &LifecycleBundle) -> bool {
    bundle.sourcing.status() == SourcingStatus::Completed
        && bundle.ordering.status() != OrderingStatus::Approved
}

pub fn can_create_grn(bundle: &LifecycleBundle) -> bool {
    bundle.ordering.status() == OrderingStatus::Approved
}

/// Project a bundle onto the six lifecycle stages, always in stage order.
pub fn project(bundle: &LifecycleBundle) -> [StageView; 6] {
    [
        requisition_stage(&bundle.requisition),
        approval_stage(&bundle.requisition, &bundle.approval),
        sourcing_stage(&bundle.sourcing),
        ordering_stage(&bundle.ordering),
        receiving_stage(&bundle.receiving),
        quality_stage(&bundle.quality),
    ]
}

fn requisition_stage(requisition: &Requisition) -> StageView {
    // Submission, not approval, completes this stage.
    let status = if requisition.status.is_draft() {
        StageStatus::Current
    } else {
        StageStatus::Completed
    };
    StageView::new(StageId::Requisition, status, requisition.pr_number.clone())
}

fn approval_stage(requisition: &Requisition, approval: &ApprovalState) -> StageView {
    let status = match approval.status {
        Some(ApprovalStatus::Approved) => StageStatus::Completed,
        Some(ApprovalStatus::Rejected) => StageStatus::Rejected,
        _ if !requisition.status.is_draft() => StageStatus::Current,
        _ => StageStatus::None,
    };
    StageView::new(StageId::Approval, status, approval.current_step.clone())
}

fn sourcing_stage(sourcing: &SourcingState) -> StageView {
    let status = match sourcing.status() {
        SourcingStatus::Completed => StageStatus::Completed,
        SourcingStatus::InProgress => StageStatus::Current,
        SourcingStatus::None => StageStatus::None,
    };
    let detail = if sourcing.rfq_count == 0 && sourcing.quotations.is_empty() {
        None
    } else {
        Some(format!(
            "{} RFQs, {} quotations",
            sourcing.rfq_count,
            sourcing.quotations.len()
        ))
    };
    StageView::new(StageId::Sourcing, status, detail)
}

fn ordering_stage(ordering: &OrderingState) -> StageView {
    let status = match ordering.status() {
        OrderingStatus::Approved => StageStatus::Completed,
        OrderingStatus::Pending => StageStatus::Current,
        OrderingStatus::None => StageStatus::None,
    };
    let numbers = join_numbers(ordering.purchase_orders.iter().map(|po| po.po_number.as_str()));
    StageView::new(StageId::Ordering, status, numbers)
}

fn receiving_stage(receiving: &ReceivingState) -> StageView {
    let status = match receiving.status() {
        ReceivingStatus::Completed => StageStatus::Completed,
        ReceivingStatus::InProgress => StageStatus::Current,
        ReceivingStatus::None => StageStatus::None,
    };
    let numbers = join_numbers(receiving.grns.iter().map(|g| g.grn_number.as_str()));
    StageView::new(StageId::Receiving, status, numbers)
}

fn quality_stage(quality: &QualityState) -> StageView {
    let status = match quality.status() {
        QualityStatus::Completed => StageStatus::Completed,
        QualityStatus::Partial => StageStatus::Current,
        QualityStatus::None => StageStatus::None,
    };
    let detail = quality.result().map(|r| r.as_str().to_string());
    StageView::new(StageId::Quality, status, detail)
}

fn join_numbers<'a>(numbers: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = numbers
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Cross-entity inconsistencies in a bundle. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    SubmittedWithoutItems { requisition_id: u64 },
    OrderApprovedWithoutSelectedQuotation { purchase_order_id: u64 },
    GrnWithoutApprovedOrder { grn_id: u64 },
}

impl LifecycleBundle {
    pub fn invariant_violations(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        if !self.requisition.status.is_draft() && self.requisition.items.is_empty() {
            violations.push(InvariantViolation::SubmittedWithoutItems {
                requisition_id: self.requisition.id,
            });
        }

        if self.sourcing.status() != SourcingStatus::Completed {
            for po in self.ordering.approved_orders() {
                violations.push(InvariantViolation::OrderApprovedWithoutSelectedQuotation {
                    purchase_order_id: po.id,
                });
            }
        }

        if self.ordering.status() != OrderingStatus::Approved {
            for grn in &self.receiving.grns {
                violations.push(InvariantViolation::GrnWithoutApprovedOrder { grn_id: grn.id });
            }
        }

        violations
    }

    pub fn stages(&self) -> [StageView; 6] {
        project(self)
    }

    pub fn gates(&self) -> ActionGates {
        ActionGates::from_bundle(self)
    }
}
