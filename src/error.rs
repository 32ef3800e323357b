// Error taxonomy for procurement workflow operations

use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, ProcurementError>;

#[derive(Debug, Error)]
pub enum ProcurementError {
    /// Client-detectable problem with the input. Never sent to the network.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A lifecycle gate is not satisfied for the requested action.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The entity moved to a status that forbids the requested transition.
    #[error("Conflict: {entity} {id} is {actual}, expected {expected}")]
    Conflict {
        entity: &'static str,
        id: u64,
        actual: String,
        expected: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProcurementError {
    pub fn validation(reason: impl Into<String>) -> Self {
        ProcurementError::Validation(vec![reason.into()])
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        ProcurementError::Precondition(reason.into())
    }

    /// Translate a transport failure for a specific entity. HTTP 404 becomes
    /// `NotFound` and HTTP 409 becomes `Conflict`; everything else stays a
    /// transport error.
    pub fn from_transport(err: TransportError, entity: &'static str, id: u64) -> Self {
        match err.status {
            Some(404) => ProcurementError::NotFound { entity, id },
            Some(409) => ProcurementError::Conflict {
                entity,
                id,
                actual: err
                    .message
                    .clone()
                    .unwrap_or_else(|| "changed on the server".to_string()),
                expected: "unchanged".to_string(),
            },
            _ => ProcurementError::Transport(err),
        }
    }

    /// Whether callers resolve this locally by not offering the action.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ProcurementError::Validation(_) | ProcurementError::Precondition(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_status_mapping() {
        let not_found = ProcurementError::from_transport(TransportError::http(404, None), "Requisition", 7);
        assert!(matches!(
            not_found,
            ProcurementError::NotFound { entity: "Requisition", id: 7 }
        ));

        let conflict = ProcurementError::from_transport(
            TransportError::http(409, Some("already submitted".to_string())),
            "Requisition",
            7,
        );
        match conflict {
            ProcurementError::Conflict { actual, .. } => assert_eq!(actual, "already submitted"),
            other => panic!("expected conflict, got {other:?}"),
        }

        let server = ProcurementError::from_transport(TransportError::http(500, None), "Requisition", 7);
        assert!(matches!(server, ProcurementError::Transport(_)));
        assert!(!server.is_local());
    }

    #[test]
    fn test_validation_message_lists_every_reason() {
        let err = ProcurementError::Validation(vec![
            "at least one line item is required".to_string(),
            "department is required".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: at least one line item is required; department is required"
        );
        assert!(err.is_local());
    }
}
