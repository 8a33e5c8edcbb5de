use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Missing required input: {}", missing.join(", "))]
    IncompleteInput { missing: Vec<&'static str> },

    #[error("Required field is empty: {0}")]
    MissingField(&'static str),

    #[error("Invalid order amount: {0}")]
    InvalidAmount(f64),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order is already {0} and can no longer change")]
    Closed(OrderStatus),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

impl OrderError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::IncompleteInput { .. } => "incomplete_input",
            OrderError::MissingField(_) => "missing_field",
            OrderError::InvalidAmount(_) => "invalid_amount",
            OrderError::NotFound(_) => "not_found",
            OrderError::Closed(_) => "closed",
            OrderError::NotInitialized => "not_initialized",
        }
    }
}
