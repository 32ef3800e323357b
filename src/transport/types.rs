// Wire types exchanged with the procurement backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::types::{ApprovalDecision, LineItem};

/// Every backend response is wrapped in this envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Unwrap the payload, turning `success: false` or a missing payload into
    /// a transport error tagged with the HTTP status the envelope arrived with.
    pub fn into_result(self, status: u16) -> Result<T, TransportError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(TransportError {
                status: Some(status),
                message: Some("response envelope carried no data".to_string()),
            }),
            (false, _) => Err(TransportError {
                status: Some(status),
                message: self.message,
            }),
        }
    }
}

/// Network, authentication or server failure reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport error{}: {}",
    .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default(),
    .message.as_deref().unwrap_or("no message"))]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: Option<String>,
}

impl TransportError {
    pub fn http(status: u16, message: Option<String>) -> Self {
        Self {
            status: Some(status),
            message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: Some(message.into()),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: Some(err.to_string()),
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub decision: ApprovalDecision,
    pub actor_id: u64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderRequest {
    pub requisition_id: u64,
    pub quotation_id: u64,
    pub supplier_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrnRequest {
    pub requisition_id: u64,
    pub purchase_order_id: u64,
    pub received_by: Option<u64>,
}

/// One RFQ line. `unit_price` is the advisory catalog price, if one is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfqLine {
    pub item_id: u64,
    pub quantity: f64,
    pub unit_id: Option<u64>,
    pub specification: Option<String>,
    pub unit_price: Option<f64>,
}

impl From<&LineItem> for RfqLine {
    fn from(item: &LineItem) -> Self {
        Self {
            item_id: item.item_id,
            quantity: item.quantity,
            unit_id: item.unit_id,
            specification: item.specification.clone(),
            unit_price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfqRequest {
    pub requisition_id: u64,
    pub supplier_id: u64,
    pub response_deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<RfqLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfqRecord {
    pub id: u64,
    pub rfq_number: String,
    pub supplier_id: u64,
}

/// Last known price of an item in a supplier's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPrice {
    pub item_id: u64,
    pub unit_price: f64,
    pub currency: Option<String>,
}
