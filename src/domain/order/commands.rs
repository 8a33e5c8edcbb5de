use chrono::{DateTime, Utc};

use super::value_objects::{OrderStatus, PickupDetails};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    /// Move the order to `target`, which must be the next stage or CANCELLED.
    Transition {
        target: OrderStatus,
        input: TransitionInput,
        requested_at: DateTime<Utc>,
    },
}

impl OrderCommand {
    pub fn transition(target: OrderStatus, input: TransitionInput, requested_at: DateTime<Utc>) -> Self {
        OrderCommand::Transition {
            target,
            input,
            requested_at,
        }
    }
}

/// Caller-supplied data consumed by specific transitions.
#[derive(Debug, Clone, Default)]
pub struct TransitionInput {
    /// Required when entering PICKED_UP.
    pub pickup: Option<PickupDetails>,
    /// Recorded when entering PARTNER_ASSIGNED, if present.
    pub partner_id: Option<String>,
    pub cancel_reason: Option<String>,
}

impl TransitionInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn pickup(details: PickupDetails) -> Self {
        Self {
            pickup: Some(details),
            ..Self::default()
        }
    }

    pub fn assign(partner_id: impl Into<String>) -> Self {
        Self {
            partner_id: Some(partner_id.into()),
            ..Self::default()
        }
    }

    pub fn cancel(reason: Option<String>) -> Self {
        Self {
            cancel_reason: reason,
            ..Self::default()
        }
    }
}
