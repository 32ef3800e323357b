// Workflow controller: validates every requested transition locally, then asks
// the backend to perform it and hands back a freshly fetched snapshot.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::batch::{BatchExecutor, BatchOptions, BatchReport, BatchState};
use crate::config::ProcurementConfig;
use crate::error::{ProcurementError, Result};
use crate::lifecycle::types::*;
use crate::lifecycle::{ActionGates, RequisitionEvent, RequisitionLifecycle, StageView};
use crate::observability::{workflow_metrics, OperationTimer};
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::transport::{
    DecisionRequest, GrnRequest, ProcurementApi, PurchaseOrderRequest, RfqRecord, RfqRequest,
    SessionStore,
};
use crate::workflow::document::{DocumentRef, RfqDocuments};
use crate::workflow::rfq::{PriceCatalog, RfqTemplate};
use crate::workflow::validation::{validate_draft, validate_for_submission};

/// A bundle together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleSnapshot {
    pub bundle: LifecycleBundle,
    pub stages: [StageView; 6],
    pub gates: ActionGates,
}

impl LifecycleSnapshot {
    pub fn from_bundle(bundle: LifecycleBundle) -> Self {
        Self {
            stages: bundle.stages(),
            gates: bundle.gates(),
            bundle,
        }
    }

    pub fn requisition_id(&self) -> u64 {
        self.bundle.requisition.id
    }
}

#[derive(Debug)]
pub struct RfqBatchOutcome {
    pub report: BatchReport<RfqRecord, ProcurementError>,
    /// One entry per supplier, in request order, at the same index as the
    /// supplier's task in `report`. An entry still `Pending` after the batch
    /// means that supplier's RFQ failed; its error is in `report.failures`.
    pub documents: Vec<(u64, DocumentRef)>,
    /// `None` when the refetch after the batch failed.
    pub snapshot: Option<LifecycleSnapshot>,
}

impl RfqBatchOutcome {
    /// Suppliers whose RFQ was not created, with the error that stopped it.
    pub fn failed_suppliers(&self) -> Vec<(u64, &ProcurementError)> {
        self.report
            .failures
            .iter()
            .filter_map(|f| self.documents.get(f.index).map(|(id, _)| (*id, &f.error)))
            .collect()
    }
}

pub struct WorkflowController<A, S> {
    api: Arc<A>,
    session: S,
    executor: BatchExecutor,
    batch_options: BatchOptions,
    prices: PriceCatalog<A>,
}

fn conflict(entity: &'static str, id: u64, actual: impl ToString, expected: &str) -> ProcurementError {
    ProcurementError::Conflict {
        entity,
        id,
        actual: actual.to_string(),
        expected: expected.to_string(),
    }
}

impl<A, S> WorkflowController<A, S>
where
    A: ProcurementApi,
    S: SessionStore,
{
    pub fn new(api: Arc<A>, session: S) -> Self {
        Self::with_config(api, session, &ProcurementConfig::default())
    }

    pub fn with_config(api: Arc<A>, session: S, config: &ProcurementConfig) -> Self {
        Self {
            prices: PriceCatalog::new(Arc::clone(&api), &config.pricing),
            api,
            session,
            executor: BatchExecutor::new(),
            batch_options: BatchOptions::from_config(&config.batch),
        }
    }

    pub fn with_batch_options(mut self, options: BatchOptions) -> Self {
        self.batch_options = options;
        self
    }

    /// Live progress of the RFQ batch currently running, if any.
    pub fn batch_progress(&self) -> tokio::sync::watch::Receiver<BatchState> {
        self.executor.subscribe()
    }

    pub fn price_catalog(&self) -> &PriceCatalog<A> {
        &self.prices
    }

    pub async fn load(&self, requisition_id: u64) -> Result<LifecycleSnapshot> {
        let bundle = self
            .api
            .fetch_lifecycle(requisition_id)
            .await
            .map_err(|e| ProcurementError::from_transport(e, "requisition", requisition_id))?;

        for violation in bundle.invariant_violations() {
            warn!(requisition_id, violation = ?violation, "Inconsistent lifecycle bundle");
        }
        Ok(LifecycleSnapshot::from_bundle(bundle))
    }

    async fn fetch_requisition(&self, requisition_id: u64) -> Result<Requisition> {
        self.api
            .fetch_requisition(requisition_id)
            .await
            .map_err(|e| ProcurementError::from_transport(e, "requisition", requisition_id))
    }

    fn current_user(&self) -> Result<u64> {
        self.session
            .current_user_id()
            .ok_or_else(|| ProcurementError::precondition("no signed-in user"))
    }

    fn check_transition(requisition: &Requisition, event: RequisitionEvent) -> Result<()> {
        let expected = match event {
            RequisitionEvent::Edit | RequisitionEvent::Submit { .. } => RequisitionStatus::Draft,
            RequisitionEvent::Approve | RequisitionEvent::Reject => RequisitionStatus::Pending,
        };
        RequisitionLifecycle::check(requisition.id, requisition.status, event).map_err(|_| {
            workflow_metrics().record_rejected_transition();
            conflict("requisition", requisition.id, requisition.status, expected.as_str())
        })?;
        Ok(())
    }

    pub async fn create_requisition(&self, draft: &RequisitionDraft) -> Result<LifecycleSnapshot> {
        let requested_by = self.current_user()?;
        validate_draft(&draft.items)?;

        let span = create_workflow_span("create_requisition", None, &generate_correlation_id());
        async {
            let created = self
                .api
                .create_requisition(draft, requested_by)
                .await?;
            info!(
                requisition_id = created.id,
                pr_number = ?created.pr_number,
                "Requisition created"
            );
            self.load(created.id).await
        }
        .instrument(span)
        .await
    }

    pub async fn update_requisition(
        &self,
        requisition_id: u64,
        draft: &RequisitionDraft,
    ) -> Result<LifecycleSnapshot> {
        let requisition = self.fetch_requisition(requisition_id).await?;
        Self::check_transition(&requisition, RequisitionEvent::Edit)?;
        validate_draft(&draft.items)?;

        self.api
            .update_requisition(requisition_id, draft)
            .await
            .map_err(|e| ProcurementError::from_transport(e, "requisition", requisition_id))?;
        info!(requisition_id, "Requisition updated");
        self.load(requisition_id).await
    }

    /// Draft to Pending. Checks run in order: existence, status, content.
    pub async fn submit(&self, requisition_id: u64) -> Result<LifecycleSnapshot> {
        let timer = OperationTimer::new("submit_requisition");
        let span =
            create_workflow_span("submit", Some(requisition_id), &generate_correlation_id());

        let result = async {
            let requisition = self.fetch_requisition(requisition_id).await?;
            if !requisition.status.is_draft() {
                workflow_metrics().record_rejected_transition();
                return Err(conflict(
                    "requisition",
                    requisition_id,
                    requisition.status,
                    RequisitionStatus::Draft.as_str(),
                ));
            }
            validate_for_submission(&requisition)?;
            Self::check_transition(
                &requisition,
                RequisitionEvent::Submit {
                    line_items: requisition.items.len(),
                },
            )?;

            self.api
                .submit_requisition(requisition_id)
                .await
                .map_err(|e| ProcurementError::from_transport(e, "requisition", requisition_id))?;
            workflow_metrics().record_transition();
            info!(requisition_id, "Requisition submitted for approval");

            self.load(requisition_id).await
        }
        .instrument(span)
        .await;

        timer.finish();
        result
    }

    /// Record the signed-in user's decision on a pending approval.
    pub async fn decide(
        &self,
        approval_id: u64,
        decision: ApprovalDecision,
        comment: Option<String>,
    ) -> Result<LifecycleSnapshot> {
        let actor_id = self.current_user()?;
        let approval = self
            .api
            .fetch_approval(approval_id)
            .await
            .map_err(|e| ProcurementError::from_transport(e, "approval", approval_id))?;

        if !approval.is_pending() {
            workflow_metrics().record_rejected_transition();
            let actual = approval.status.map(|s| s.as_str()).unwrap_or("not started");
            return Err(conflict("approval", approval_id, actual, "Pending"));
        }
        let requisition_id = approval.requisition_id.ok_or_else(|| {
            ProcurementError::precondition(format!(
                "approval {approval_id} is not linked to a requisition"
            ))
        })?;

        let requisition = self.fetch_requisition(requisition_id).await?;
        let event = match decision {
            ApprovalDecision::Approved => RequisitionEvent::Approve,
            ApprovalDecision::Rejected => RequisitionEvent::Reject,
        };
        Self::check_transition(&requisition, event)?;

        let span = create_workflow_span("decide", Some(requisition_id), &generate_correlation_id());
        async {
            let request = DecisionRequest {
                decision,
                actor_id,
                comment,
            };
            self.api
                .decide_approval(approval_id, &request)
                .await
                .map_err(|e| ProcurementError::from_transport(e, "approval", approval_id))?;
            workflow_metrics().record_transition();
            info!(approval_id, actor_id, decision = ?decision, "Approval decided");

            self.load(requisition_id).await
        }
        .instrument(span)
        .await
    }

    /// Issue a purchase order against the selected quotation. Nothing is sent
    /// unless the bundle allows it.
    pub async fn create_purchase_order(
        &self,
        bundle: &LifecycleBundle,
    ) -> Result<LifecycleSnapshot> {
        let requisition_id = bundle.requisition.id;
        let quotation = match bundle.sourcing.selected_quotation() {
            Some(q) if bundle.gates().can_create_purchase_order => q,
            _ => {
                return Err(ProcurementError::precondition(
                    "a purchase order needs a selected quotation and no approved order",
                ))
            }
        };

        let request = PurchaseOrderRequest {
            requisition_id,
            quotation_id: quotation.id,
            supplier_id: quotation.supplier_id,
        };
        let po = self
            .api
            .create_purchase_order(&request)
            .await
            .map_err(|e| ProcurementError::from_transport(e, "requisition", requisition_id))?;
        info!(requisition_id, po_number = %po.po_number, "Purchase order created");

        self.load(requisition_id).await
    }

    /// Record goods received against an approved purchase order. Without
    /// `purchase_order_id` the first approved order is used.
    pub async fn create_grn(
        &self,
        bundle: &LifecycleBundle,
        purchase_order_id: Option<u64>,
    ) -> Result<LifecycleSnapshot> {
        let requisition_id = bundle.requisition.id;
        if !bundle.gates().can_create_grn {
            return Err(ProcurementError::precondition(
                "goods can only be received against an approved purchase order",
            ));
        }

        let mut approved = bundle.ordering.approved_orders();
        let po = match purchase_order_id {
            Some(id) => approved.find(|po| po.id == id).ok_or_else(|| {
                ProcurementError::precondition(format!(
                    "purchase order {id} is not an approved order of this requisition"
                ))
            })?,
            None => approved.next().ok_or_else(|| {
                ProcurementError::precondition("no approved purchase order")
            })?,
        };

        let request = GrnRequest {
            requisition_id,
            purchase_order_id: po.id,
            received_by: self.session.current_user_id(),
        };
        let grn = self
            .api
            .create_grn(&request)
            .await
            .map_err(|e| ProcurementError::from_transport(e, "purchase order", po.id))?;
        info!(requisition_id, grn_number = %grn.grn_number, "Goods receipt note created");

        self.load(requisition_id).await
    }

    /// Send one RFQ per supplier through the batch executor. Task `i` is
    /// `supplier_ids[i]`. A failed supplier never stops the others.
    pub async fn create_rfq_batch(
        &self,
        requisition_id: u64,
        supplier_ids: &[u64],
        template: &RfqTemplate,
    ) -> Result<RfqBatchOutcome> {
        let requisition = self.fetch_requisition(requisition_id).await?;
        if requisition.status != RequisitionStatus::Approved {
            return Err(ProcurementError::precondition(format!(
                "RFQs need an approved requisition, requisition {requisition_id} is {}",
                requisition.status
            )));
        }

        if supplier_ids.is_empty() {
            return Err(ProcurementError::validation("at least one supplier is required"));
        }
        // Task indices must name the caller's supplier, so repeats are refused
        // rather than collapsed.
        let mut seen = HashSet::with_capacity(supplier_ids.len());
        let repeated: Vec<String> = supplier_ids
            .iter()
            .filter(|&&id| !seen.insert(id))
            .map(|id| format!("supplier {id} is listed more than once"))
            .collect();
        if !repeated.is_empty() {
            return Err(ProcurementError::Validation(repeated));
        }
        let lines = template.lines(&requisition.items);
        if lines.is_empty() {
            return Err(ProcurementError::validation("an RFQ needs at least one line"));
        }
        validate_draft(lines)?;

        let span = create_workflow_span(
            "create_rfq_batch",
            Some(requisition_id),
            &generate_correlation_id(),
        );
        async {
            let tasks: Vec<_> = supplier_ids
                .iter()
                .map(|&supplier_id| {
                    move || async move {
                        let request = RfqRequest {
                            requisition_id,
                            supplier_id,
                            response_deadline: template.response_deadline,
                            notes: template.notes.clone(),
                            items: self.prices.prefill(supplier_id, lines).await,
                        };
                        self.api
                            .create_rfq(&request)
                            .await
                            .map_err(|e| ProcurementError::from_transport(e, "supplier", supplier_id))
                    }
                })
                .collect();

            let documents = RfqDocuments::new(supplier_ids);
            let report = self
                .executor
                .execute_with(tasks, &self.batch_options, &documents)
                .await;
            info!(requisition_id, summary = %report.summary(), "RFQ batch finished");

            let snapshot = match self.load(requisition_id).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(requisition_id, error = %e, "Could not refresh lifecycle after RFQ batch");
                    None
                }
            };

            Ok(RfqBatchOutcome {
                report,
                documents: documents.into_documents(),
                snapshot,
            })
        }
        .instrument(span)
        .await
    }
}
