use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::DomainEvent;
use super::value_objects::{OrderStatus, PaymentStatus, ServiceType};

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Created(OrderCreated),
    PartnerAssigned(PartnerAssigned),
    PickedUp(OrderPickedUp),
    ProcessingStarted,
    Ready(OrderReady),
    OutForDelivery,
    Delivered(OrderDelivered),
    Cancelled(OrderCancelled),
}

impl OrderEvent {
    /// Status the order holds once this event is applied.
    pub fn resulting_status(&self) -> OrderStatus {
        match self {
            OrderEvent::Created(e) => e.status,
            OrderEvent::PartnerAssigned(_) => OrderStatus::PartnerAssigned,
            OrderEvent::PickedUp(_) => OrderStatus::PickedUp,
            OrderEvent::ProcessingStarted => OrderStatus::InProcessing,
            OrderEvent::Ready(_) => OrderStatus::Ready,
            OrderEvent::OutForDelivery => OrderStatus::OutForDelivery,
            OrderEvent::Delivered(_) => OrderStatus::Delivered,
            OrderEvent::Cancelled(_) => OrderStatus::Cancelled,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::PartnerAssigned(_) => "OrderPartnerAssigned",
            OrderEvent::PickedUp(_) => "OrderPickedUp",
            OrderEvent::ProcessingStarted => "OrderProcessingStarted",
            OrderEvent::Ready(_) => "OrderReady",
            OrderEvent::OutForDelivery => "OrderOutForDelivery",
            OrderEvent::Delivered(_) => "OrderDelivered",
            OrderEvent::Cancelled(_) => "OrderCancelled",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Created - Initial event in order lifecycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub service_type: ServiceType,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub partner_id: Option<String>,
    /// CREATED, or PARTNER_ASSIGNED when booked with a partner.
    pub status: OrderStatus,
    pub pickup_time: String,
    pub delivery_time: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PartnerAssigned {
    /// `None` keeps whatever partner the order already carries.
    pub partner_id: Option<String>,
}

/// Order Picked Up - items counted and collected by the agent
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderPickedUp {
    pub cloth_count: u32,
    pub blanket_count: u32,
    pub actual_pickup_time: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderReady {
    pub ready_at: DateTime<Utc>,
}

/// Order Delivered - Order handed over to the customer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderDelivered {
    pub delivered_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
}

/// Order Cancelled - Order lifecycle ended
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCancelled {
    pub reason: Option<String>,
}
