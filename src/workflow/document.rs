use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::batch::BatchObserver;
use crate::error::ProcurementError;
use crate::transport::RfqRecord;

/// A document the user asked for, before or after the server has numbered it.
///
/// Placeholders are replaced wholesale on confirmation, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DocumentRef {
    #[serde(rename_all = "camelCase")]
    Pending { temp_id: Uuid },
    Confirmed { id: u64, number: String },
}

impl DocumentRef {
    pub fn pending() -> Self {
        DocumentRef::Pending {
            temp_id: Uuid::new_v4(),
        }
    }

    pub fn confirmed(id: u64, number: impl Into<String>) -> Self {
        DocumentRef::Confirmed {
            id,
            number: number.into(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, DocumentRef::Confirmed { .. })
    }

    /// Server-assigned number, once known.
    pub fn number(&self) -> Option<&str> {
        match self {
            DocumentRef::Confirmed { number, .. } => Some(number),
            DocumentRef::Pending { .. } => None,
        }
    }
}

/// Tracks one RFQ placeholder per supplier while a batch runs. Slot `i`
/// belongs to task `i`. A slot whose task failed stays `Pending`; once the
/// batch has returned, `BatchReport::failures` holds the error at that index.
#[derive(Debug)]
pub(crate) struct RfqDocuments {
    supplier_ids: Vec<u64>,
    slots: Mutex<BTreeMap<usize, DocumentRef>>,
}

impl RfqDocuments {
    pub(crate) fn new(supplier_ids: &[u64]) -> Self {
        let slots = (0..supplier_ids.len())
            .map(|index| (index, DocumentRef::pending()))
            .collect();
        Self {
            supplier_ids: supplier_ids.to_vec(),
            slots: Mutex::new(slots),
        }
    }

    pub(crate) fn into_documents(self) -> Vec<(u64, DocumentRef)> {
        let slots = self.slots.into_inner().unwrap_or_else(|e| e.into_inner());
        self.supplier_ids.into_iter().zip(slots.into_values()).collect()
    }
}

impl BatchObserver<RfqRecord, ProcurementError> for RfqDocuments {
    fn on_success(&self, index: usize, record: &RfqRecord) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(index, DocumentRef::confirmed(record.id, &record.rfq_number));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_as_tagged_union() {
        let confirmed = serde_json::to_value(DocumentRef::confirmed(4, "RFQ-00004")).unwrap();
        assert_eq!(
            confirmed,
            serde_json::json!({"kind": "confirmed", "id": 4, "number": "RFQ-00004"})
        );

        let pending = serde_json::to_value(DocumentRef::pending()).unwrap();
        assert_eq!(pending["kind"], "pending");
        assert!(pending["tempId"].is_string());
    }

    #[test]
    fn test_failed_slots_stay_pending() {
        let documents = RfqDocuments::new(&[11, 12]);
        documents.on_success(
            1,
            &RfqRecord {
                id: 9,
                rfq_number: "RFQ-00009".to_string(),
                supplier_id: 12,
            },
        );

        let documents = documents.into_documents();
        assert_eq!(documents[0].0, 11);
        assert!(!documents[0].1.is_confirmed());
        assert_eq!(documents[1], (12, DocumentRef::confirmed(9, "RFQ-00009")));
    }
}
