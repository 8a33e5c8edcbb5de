use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::Aggregate;
use super::commands::{OrderCommand, TransitionInput};
use super::errors::OrderError;
use super::events::*;
use super::value_objects::{OrderStatus, PaymentStatus, ServiceType};

// ============================================================================
// Order Aggregate - Lifecycle State Machine
// ============================================================================
//
// Rules:
// - status only moves one step forward along OrderStatus::SEQUENCE, or jumps
//   to CANCELLED from any non-terminal stage
// - each actual-* timestamp is written by exactly one transition
// - transitions never mutate the receiver; they return a new record
//
// ============================================================================

/// One laundry order as held by the store.
///
/// Serialized with camelCase keys and explicit `null`s so a snapshot keeps
/// every field, including the unset optional ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub order_number: String,

    // Parties
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub partner_id: Option<String>,

    // Commercial
    pub service_type: ServiceType,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,

    // Lifecycle
    pub status: OrderStatus,
    pub cloth_count: Option<u32>,
    pub blanket_count: Option<u32>,
    pub pickup_time: String,
    pub actual_pickup_time: Option<DateTime<Utc>>,
    pub ready_at_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub delivery_time: String,
    pub created_at: DateTime<Utc>,

    pub notes: Option<String>,
}

/// Status immediately after `current` in the forward sequence.
///
/// `None` for terminal statuses. This is the only authority consulted before
/// an order is allowed to advance.
pub fn next_status(current: OrderStatus) -> Option<OrderStatus> {
    if current.is_terminal() {
        return None;
    }
    let idx = current.stage_index()?;
    OrderStatus::SEQUENCE.get(idx + 1).copied()
}

/// Validate and apply a single transition, returning the updated record.
pub fn apply_transition(
    order: &Order,
    target: OrderStatus,
    input: TransitionInput,
    requested_at: DateTime<Utc>,
) -> Result<Order, OrderError> {
    let command = OrderCommand::transition(target, input, requested_at);
    let (updated, _events) = order.execute(&command)?;
    Ok(updated)
}

impl Order {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_assigned_to(&self, partner_id: &str) -> bool {
        self.partner_id.as_deref() == Some(partner_id)
    }

    pub fn next_status(&self) -> Option<OrderStatus> {
        next_status(self.status)
    }

    /// True when the timestamp for every stage this order has passed is set,
    /// and no timestamp exists for a stage it has not reached.
    pub fn timestamps_consistent(&self) -> bool {
        // A cancelled order may have stopped at any stage
        let Some(current) = self.status.stage_index() else {
            return true;
        };
        let reached = |stage: OrderStatus| stage.stage_index().is_some_and(|required| current >= required);

        reached(OrderStatus::PickedUp) == self.actual_pickup_time.is_some()
            && reached(OrderStatus::Ready) == self.ready_at_time.is_some()
            && reached(OrderStatus::Delivered) == self.actual_delivery_time.is_some()
    }

    fn validate_target(&self, target: OrderStatus) -> Result<(), OrderError> {
        let allowed = match target {
            OrderStatus::Cancelled => !self.status.is_terminal(),
            _ => next_status(self.status) == Some(target),
        };

        if allowed {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            })
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Created(e) => Ok(Self {
                id: e.order_id,
                order_number: e.order_number.clone(),
                customer_id: e.customer_id.clone(),
                customer_name: e.customer_name.clone(),
                customer_phone: e.customer_phone.clone(),
                address: e.address.clone(),
                partner_id: e.partner_id.clone(),
                service_type: e.service_type,
                total_amount: e.total_amount,
                payment_status: e.payment_status,
                status: e.status,
                cloth_count: None,
                blanket_count: None,
                pickup_time: e.pickup_time.clone(),
                actual_pickup_time: None,
                ready_at_time: None,
                actual_delivery_time: None,
                delivery_time: e.delivery_time.clone(),
                created_at: e.created_at,
                notes: e.notes.clone(),
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Created(_) => {
                // First event already applied
            }
            OrderEvent::PartnerAssigned(e) => {
                if let Some(partner_id) = &e.partner_id {
                    self.partner_id = Some(partner_id.clone());
                }
            }
            OrderEvent::PickedUp(e) => {
                self.cloth_count = Some(e.cloth_count);
                self.blanket_count = Some(e.blanket_count);
                self.actual_pickup_time = Some(e.actual_pickup_time);
            }
            OrderEvent::ProcessingStarted | OrderEvent::OutForDelivery | OrderEvent::Cancelled(_) => {}
            OrderEvent::Ready(e) => {
                self.ready_at_time = Some(e.ready_at);
            }
            OrderEvent::Delivered(e) => {
                self.actual_delivery_time = Some(e.delivered_at);
                self.payment_status = e.payment_status;
            }
        }

        self.status = event.resulting_status();
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::Transition {
                target,
                input,
                requested_at,
            } => {
                self.validate_target(*target)?;

                let event = match target {
                    OrderStatus::Created => return Err(OrderError::InvalidTransition {
                        from: self.status,
                        to: *target,
                    }),
                    OrderStatus::PartnerAssigned => OrderEvent::PartnerAssigned(PartnerAssigned {
                        partner_id: input.partner_id.clone(),
                    }),
                    OrderStatus::PickedUp => {
                        let pickup = input.pickup.clone().unwrap_or_default().validate()?;
                        OrderEvent::PickedUp(OrderPickedUp {
                            cloth_count: pickup.cloth_count,
                            blanket_count: pickup.blanket_count,
                            actual_pickup_time: pickup.actual_pickup_time,
                        })
                    }
                    OrderStatus::InProcessing => OrderEvent::ProcessingStarted,
                    OrderStatus::Ready => OrderEvent::Ready(OrderReady {
                        ready_at: *requested_at,
                    }),
                    OrderStatus::OutForDelivery => OrderEvent::OutForDelivery,
                    OrderStatus::Delivered => OrderEvent::Delivered(OrderDelivered {
                        delivered_at: *requested_at,
                        payment_status: self.payment_status.settled_on_delivery(),
                    }),
                    OrderStatus::Cancelled => OrderEvent::Cancelled(OrderCancelled {
                        reason: input.cancel_reason.clone(),
                    }),
                };

                Ok(vec![event])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
