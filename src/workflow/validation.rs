// Client-side checks run before anything is sent to the backend

use crate::error::ProcurementError;
use crate::lifecycle::types::{LineItem, Requisition};

fn quantity_problems(items: &[LineItem]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| !(item.quantity.is_finite() && item.quantity > 0.0))
        .map(|(line, item)| {
            format!(
                "line {} (item {}) must have a positive quantity",
                line + 1,
                item.item_id
            )
        })
        .collect()
}

/// Everything that keeps a requisition from leaving Draft. All problems are
/// reported together.
pub fn validate_for_submission(requisition: &Requisition) -> Result<(), ProcurementError> {
    let mut problems = Vec::new();

    if requisition.items.is_empty() {
        problems.push("at least one line item is required".to_string());
    }
    if requisition.required_by.is_none() {
        problems.push("required-by date is missing".to_string());
    }
    if requisition.department_id.is_none() {
        problems.push("department is missing".to_string());
    }
    problems.extend(quantity_problems(&requisition.items));

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ProcurementError::Validation(problems))
    }
}

/// Drafts may be incomplete, but the lines they do carry must make sense.
pub fn validate_draft(items: &[LineItem]) -> Result<(), ProcurementError> {
    let problems = quantity_problems(items);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ProcurementError::Validation(problems))
    }
}
