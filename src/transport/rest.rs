use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::lifecycle::types::{
    ApprovalState, GoodsReceiptNote, LifecycleBundle, PurchaseOrder, Requisition, RequisitionDraft,
};
use crate::observability::workflow_metrics;
use crate::transport::types::*;
use crate::transport::ProcurementApi;

/// `ProcurementApi` over the backend's JSON REST endpoints.
#[derive(Debug, Clone)]
pub struct RestProcurementApi {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewRequisition<'a> {
    #[serde(flatten)]
    draft: &'a RequisitionDraft,
    requested_by: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl RestProcurementApi {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Replace the token used for the `Authorization` header.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.inspect_err(|e| {
            workflow_metrics().record_api_error();
            warn!(error = %e, "Procurement API request failed");
        })?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            workflow_metrics().record_api_error();
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .or_else(|| status.canonical_reason().map(str::to_string));
            warn!(status = status.as_u16(), message = ?message, "Procurement API returned an error status");
            return Err(TransportError::http(status.as_u16(), message));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body).map_err(|e| {
            TransportError::http(status.as_u16(), Some(format!("invalid response body: {e}")))
        })?;
        envelope.into_result(status.as_u16())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> TransportResult<T> {
        debug!(path, "GET");
        self.send(self.client.get(self.url(path))).await
    }

    async fn post<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> TransportResult<T> {
        debug!(path, "POST");
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn put<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> TransportResult<T> {
        debug!(path, "PUT");
        self.send(self.client.put(self.url(path)).json(body)).await
    }
}

#[async_trait]
impl ProcurementApi for RestProcurementApi {
    async fn fetch_requisition(&self, requisition_id: u64) -> TransportResult<Requisition> {
        self.get(&format!("/purchase-requisitions/{requisition_id}")).await
    }

    async fn fetch_lifecycle(&self, requisition_id: u64) -> TransportResult<LifecycleBundle> {
        self.get(&format!("/purchase-requisitions/{requisition_id}/lifecycle"))
            .await
    }

    async fn create_requisition(
        &self,
        draft: &RequisitionDraft,
        requested_by: u64,
    ) -> TransportResult<Requisition> {
        let body = NewRequisition {
            draft,
            requested_by,
        };
        self.post("/purchase-requisitions", &body).await
    }

    async fn update_requisition(
        &self,
        requisition_id: u64,
        draft: &RequisitionDraft,
    ) -> TransportResult<Requisition> {
        self.put(&format!("/purchase-requisitions/{requisition_id}"), draft)
            .await
    }

    async fn submit_requisition(&self, requisition_id: u64) -> TransportResult<Requisition> {
        self.post(
            &format!("/purchase-requisitions/{requisition_id}/submit"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn fetch_approval(&self, approval_id: u64) -> TransportResult<ApprovalState> {
        self.get(&format!("/approvals/{approval_id}")).await
    }

    async fn decide_approval(
        &self,
        approval_id: u64,
        request: &DecisionRequest,
    ) -> TransportResult<ApprovalState> {
        self.post(&format!("/approvals/{approval_id}/decision"), request)
            .await
    }

    async fn create_purchase_order(
        &self,
        request: &PurchaseOrderRequest,
    ) -> TransportResult<PurchaseOrder> {
        self.post("/purchase-orders", request).await
    }

    async fn create_grn(&self, request: &GrnRequest) -> TransportResult<GoodsReceiptNote> {
        self.post("/goods-receipt-notes", request).await
    }

    async fn create_rfq(&self, request: &RfqRequest) -> TransportResult<RfqRecord> {
        self.post("/rfqs", request).await
    }

    async fn supplier_price_list(&self, supplier_id: u64) -> TransportResult<Vec<CatalogPrice>> {
        self.get(&format!("/suppliers/{supplier_id}/price-list")).await
    }
}
