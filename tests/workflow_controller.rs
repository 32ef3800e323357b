// End-to-end controller runs against the in-memory backend

use std::sync::Arc;

use chrono::NaiveDate;
use procurement_lifecycle::batch::{BatchOptions, BatchProgress};
use procurement_lifecycle::lifecycle::*;
use procurement_lifecycle::transport::{
    ApiCall, CatalogPrice, InMemoryProcurementApi, StaticSession,
};
use procurement_lifecycle::workflow::{DocumentRef, RfqTemplate, WorkflowController};
use procurement_lifecycle::ProcurementError;

type Controller = WorkflowController<InMemoryProcurementApi, StaticSession>;

fn setup() -> (InMemoryProcurementApi, Controller) {
    let api = InMemoryProcurementApi::new();
    let controller = WorkflowController::new(Arc::new(api.clone()), StaticSession::signed_in(42))
        .with_batch_options(BatchOptions::default());
    (api, controller)
}

fn complete_draft() -> RequisitionDraft {
    RequisitionDraft {
        department_id: Some(3),
        required_by: NaiveDate::from_ymd_opt(2026, 12, 1),
        priority: Priority::High,
        purpose: Some("Replacement pumps".to_string()),
        items: vec![LineItem::new(100, 4.0).with_unit(1), LineItem::new(101, 2.0)],
    }
}

/// Create, submit and approve a requisition, returning its id.
async fn approved_requisition(api: &InMemoryProcurementApi, controller: &Controller) -> u64 {
    let created = controller.create_requisition(&complete_draft()).await.unwrap();
    let id = created.requisition_id();
    controller.submit(id).await.unwrap();
    let approval_id = api.approval_id_for(id).unwrap();
    controller
        .decide(approval_id, ApprovalDecision::Approved, Some("ok".to_string()))
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn requisition_moves_from_draft_to_approved() {
    let (api, controller) = setup();

    let created = controller.create_requisition(&complete_draft()).await.unwrap();
    let id = created.requisition_id();
    assert_eq!(created.bundle.requisition.requested_by, Some(42));
    assert_eq!(created.stages[0].status, StageStatus::Current);

    let submitted = controller.submit(id).await.unwrap();
    assert_eq!(submitted.bundle.requisition.status, RequisitionStatus::Pending);
    assert_eq!(submitted.stages[0].status, StageStatus::Completed);
    assert_eq!(submitted.stages[1].status, StageStatus::Current);
    assert_eq!(submitted.stages[1].detail.as_deref(), Some("Department head"));

    let approval_id = api.approval_id_for(id).unwrap();
    let approved = controller
        .decide(approval_id, ApprovalDecision::Approved, None)
        .await
        .unwrap();
    assert_eq!(approved.bundle.requisition.status, RequisitionStatus::Approved);
    assert_eq!(approved.stages[1].status, StageStatus::Completed);

    // A second decision on the same approval is a conflict
    let err = controller
        .decide(approval_id, ApprovalDecision::Rejected, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcurementError::Conflict { .. }));
}

#[tokio::test]
async fn incomplete_requisition_is_never_submitted() {
    let (api, controller) = setup();
    let created = controller
        .create_requisition(&RequisitionDraft::default())
        .await
        .unwrap();

    let err = controller.submit(created.requisition_id()).await.unwrap_err();
    assert!(matches!(err, ProcurementError::Validation(_)));
    assert!(!api
        .calls()
        .iter()
        .any(|c| matches!(c, ApiCall::SubmitRequisition(_))));
}

#[tokio::test]
async fn drafts_can_be_edited_until_submitted() {
    let (_api, controller) = setup();
    let created = controller
        .create_requisition(&RequisitionDraft::default())
        .await
        .unwrap();
    let id = created.requisition_id();

    let updated = controller
        .update_requisition(id, &complete_draft())
        .await
        .unwrap();
    assert_eq!(updated.bundle.requisition.items.len(), 2);

    controller.submit(id).await.unwrap();
    let err = controller
        .update_requisition(id, &RequisitionDraft::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProcurementError::Conflict { .. }));
}

#[tokio::test]
async fn unknown_requisition_is_not_found() {
    let (_api, controller) = setup();
    let err = controller.load(999).await.unwrap_err();
    assert!(matches!(err, ProcurementError::NotFound { id: 999, .. }));
}

#[tokio::test]
async fn rfq_batch_survives_a_failing_supplier() {
    let (api, controller) = setup();
    let id = approved_requisition(&api, &controller).await;
    api.fail_rfqs_for_supplier(12);
    let progress = controller.batch_progress();

    let supplier_ids = [11, 12, 13];
    let outcome = controller
        .create_rfq_batch(id, &supplier_ids, &RfqTemplate::default())
        .await
        .unwrap();

    assert_eq!(outcome.report.total, 3);
    assert_eq!(outcome.report.successes, 2);
    assert_eq!(outcome.report.failed_indices(), vec![1]);
    assert_eq!(supplier_ids[outcome.report.failures[0].index], 12);
    let succeeded: Vec<u64> = outcome
        .report
        .values
        .iter()
        .map(|v| supplier_ids[v.index])
        .collect();
    assert_eq!(succeeded, vec![11, 13]);
    assert!(outcome
        .report
        .values
        .iter()
        .all(|v| v.value.supplier_id == supplier_ids[v.index]));
    assert!(matches!(
        outcome.report.failures[0].error,
        ProcurementError::Transport(_)
    ));

    let state = *progress.borrow();
    assert_eq!(state.progress, BatchProgress { current: 3, total: 3 });
    assert!(!state.is_pending);

    let suppliers: Vec<u64> = outcome.documents.iter().map(|(s, _)| *s).collect();
    assert_eq!(suppliers, vec![11, 12, 13]);
    assert!(outcome.documents[0].1.is_confirmed());
    // The failed supplier's placeholder is never confirmed
    assert!(matches!(outcome.documents[1].1, DocumentRef::Pending { .. }));
    let failed = outcome.failed_suppliers();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, 12);
    assert!(matches!(failed[0].1, ProcurementError::Transport(_)));
    assert!(outcome.documents[2]
        .1
        .number()
        .is_some_and(|n| n.starts_with("RFQ-")));

    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.bundle.sourcing.rfq_count, 2);
    assert_eq!(snapshot.stages[2].detail.as_deref(), Some("2 RFQs, 0 quotations"));
}

#[tokio::test]
async fn repeated_supplier_is_refused_before_any_rfq() {
    let (api, controller) = setup();
    let id = approved_requisition(&api, &controller).await;
    api.fail_rfqs_for_supplier(12);

    let err = controller
        .create_rfq_batch(id, &[11, 11, 12], &RfqTemplate::default())
        .await
        .unwrap_err();
    match err {
        ProcurementError::Validation(problems) => {
            assert_eq!(problems, vec!["supplier 11 is listed more than once"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(api.rfq_requests().is_empty());
    assert_eq!(*controller.batch_progress().borrow(), Default::default());
}

#[tokio::test]
async fn rfq_lines_carry_known_prices_only() {
    let (api, controller) = setup();
    let id = approved_requisition(&api, &controller).await;
    api.set_price_list(
        11,
        vec![CatalogPrice {
            item_id: 100,
            unit_price: 9.5,
            currency: Some("EUR".to_string()),
        }],
    );
    api.fail_price_list_for_supplier(13);

    let template = RfqTemplate {
        notes: Some("Quote incl. delivery".to_string()),
        ..RfqTemplate::with_deadline(NaiveDate::from_ymd_opt(2026, 11, 20).unwrap())
    };
    let outcome = controller
        .create_rfq_batch(id, &[11, 13], &template)
        .await
        .unwrap();
    assert!(outcome.report.all_succeeded());

    let requests = api.rfq_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].items[0].unit_price, Some(9.5));
    assert_eq!(requests[0].items[1].unit_price, None);
    assert!(requests[1].items.iter().all(|l| l.unit_price.is_none()));
    assert_eq!(requests[1].notes.as_deref(), Some("Quote incl. delivery"));
    assert_eq!(requests[1].response_deadline, NaiveDate::from_ymd_opt(2026, 11, 20));
}

#[tokio::test]
async fn ordering_and_receiving_follow_the_gates() {
    let (api, controller) = setup();
    let id = approved_requisition(&api, &controller).await;
    controller
        .create_rfq_batch(id, &[11], &RfqTemplate::default())
        .await
        .unwrap();
    api.add_quotation(
        id,
        Quotation {
            id: 900,
            supplier_id: 11,
            status: QuotationStatus::Selected,
            rfq_id: None,
            total_amount: Some(480.0),
        },
    );

    let sourced = controller.load(id).await.unwrap();
    assert!(sourced.gates.can_create_purchase_order);
    assert!(!sourced.gates.can_create_grn);

    let ordered = controller.create_purchase_order(&sourced.bundle).await.unwrap();
    assert_eq!(ordered.bundle.ordering.status(), OrderingStatus::Pending);
    assert!(!ordered.gates.can_create_grn);

    let calls_before = api.calls().len();
    let err = controller.create_grn(&ordered.bundle, None).await.unwrap_err();
    assert!(matches!(err, ProcurementError::Precondition(_)));
    assert_eq!(api.calls().len(), calls_before);

    let po_id = ordered.bundle.ordering.purchase_orders[0].id;
    api.approve_purchase_order(id, po_id);
    let approved = controller.load(id).await.unwrap();
    assert!(approved.gates.can_create_grn);
    assert!(!approved.gates.can_create_purchase_order);

    let received = controller.create_grn(&approved.bundle, Some(po_id)).await.unwrap();
    assert_eq!(received.stages[4].status, StageStatus::Current);
    assert_eq!(received.stages[5].status, StageStatus::None);
    assert_eq!(received.bundle.quality.inspections.len(), 2);
    assert!(received.bundle.invariant_violations().is_empty());
}
