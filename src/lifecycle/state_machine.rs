use serde::{Deserialize, Serialize};
use statig::prelude::*;
use std::fmt;
use thiserror::Error;

use crate::lifecycle::types::RequisitionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionEvent {
    Edit,
    Submit { line_items: usize },
    Approve,
    Reject,
}

impl RequisitionEvent {
    /// The status this event leads to when the transition is legal.
    pub fn target(&self) -> RequisitionStatus {
        match self {
            RequisitionEvent::Edit => RequisitionStatus::Draft,
            RequisitionEvent::Submit { .. } => RequisitionStatus::Pending,
            RequisitionEvent::Approve => RequisitionStatus::Approved,
            RequisitionEvent::Reject => RequisitionStatus::Rejected,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition with event {event:?} from {from}")]
    InvalidTransition {
        event: RequisitionEvent,
        from: RequisitionStatus,
    },
}

#[derive(Debug, Default)]
pub struct RequisitionMachine {
    pub requisition_id: u64,
}

#[state_machine(initial = "State::draft()")]
impl RequisitionMachine {
    #[state]
    fn draft(&mut self, event: &RequisitionEvent) -> Outcome<State> {
        match event {
            RequisitionEvent::Submit { line_items } if *line_items > 0 => {
                tracing::info!(
                    requisition_id = self.requisition_id,
                    line_items = *line_items,
                    "Requisition submitted"
                );
                Transition(State::pending())
            }
            RequisitionEvent::Submit { .. } => {
                tracing::warn!(
                    requisition_id = self.requisition_id,
                    "Requisition without line items cannot leave draft"
                );
                Handled
            }
            _ => Handled,
        }
    }

    #[state]
    fn pending(&mut self, event: &RequisitionEvent) -> Outcome<State> {
        match event {
            RequisitionEvent::Approve => {
                tracing::info!(requisition_id = self.requisition_id, "Requisition approved");
                Transition(State::approved())
            }
            RequisitionEvent::Reject => {
                tracing::info!(requisition_id = self.requisition_id, "Requisition rejected");
                Transition(State::rejected())
            }
            _ => Handled,
        }
    }

    #[state]
    fn approved(&mut self, event: &RequisitionEvent) -> Outcome<State> {
        tracing::debug!(
            requisition_id = self.requisition_id,
            event = ?event,
            "Approved requisition is immutable"
        );
        Handled
    }

    #[state]
    fn rejected(&mut self, event: &RequisitionEvent) -> Outcome<State> {
        tracing::debug!(
            requisition_id = self.requisition_id,
            event = ?event,
            "Rejected requisition accepts no further events"
        );
        Handled
    }
}

/// Requisition status transitions, checked locally before any remote call.
pub struct RequisitionLifecycle {
    requisition_id: u64,
    machine: StateMachine<RequisitionMachine>,
}

impl RequisitionLifecycle {
    pub fn new(requisition_id: u64) -> Self {
        Self {
            requisition_id,
            machine: RequisitionMachine { requisition_id }.state_machine(),
        }
    }

    /// Rebuild the machine for a requisition already in `status` by replaying
    /// the only path that reaches it.
    pub fn resume(requisition_id: u64, status: RequisitionStatus) -> Self {
        let mut lifecycle = Self::new(requisition_id);
        let path: &[RequisitionEvent] = match status {
            RequisitionStatus::Draft => &[],
            RequisitionStatus::Pending => &[RequisitionEvent::Submit { line_items: 1 }],
            RequisitionStatus::Approved => &[
                RequisitionEvent::Submit { line_items: 1 },
                RequisitionEvent::Approve,
            ],
            RequisitionStatus::Rejected => &[
                RequisitionEvent::Submit { line_items: 1 },
                RequisitionEvent::Reject,
            ],
        };
        for event in path {
            lifecycle.machine.handle(event);
        }
        lifecycle
    }

    pub fn status(&self) -> RequisitionStatus {
        match self.machine.state() {
            State::Draft { .. } => RequisitionStatus::Draft,
            State::Pending { .. } => RequisitionStatus::Pending,
            State::Approved { .. } => RequisitionStatus::Approved,
            State::Rejected { .. } => RequisitionStatus::Rejected,
        }
    }

    /// Apply an event, failing unless it moves the requisition to the event's
    /// target status. Editing is the only event that keeps the status.
    pub fn apply(&mut self, event: RequisitionEvent) -> Result<RequisitionStatus, TransitionError> {
        let from = self.status();
        self.machine.handle(&event);
        let to = self.status();

        let moved = from != to || event == RequisitionEvent::Edit;
        if to != event.target() || !moved {
            tracing::warn!(
                requisition_id = self.requisition_id,
                from = %from,
                event = ?event,
                "Rejected requisition transition"
            );
            return Err(TransitionError::InvalidTransition { event, from });
        }
        Ok(to)
    }

    /// Check an event against a status without keeping the machine around.
    pub fn check(
        requisition_id: u64,
        status: RequisitionStatus,
        event: RequisitionEvent,
    ) -> Result<RequisitionStatus, TransitionError> {
        Self::resume(requisition_id, status).apply(event)
    }
}

impl fmt::Debug for RequisitionLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequisitionLifecycle")
            .field("requisition_id", &self.requisition_id)
            .field("status", &self.status())
            .finish()
    }
}
