use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle stage of an order.
///
/// The first seven variants form the forward sequence, in declaration order.
/// `Cancelled` sits outside the sequence and is reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    PartnerAssigned,
    PickedUp,
    InProcessing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The forward sequence every order walks through.
    pub const SEQUENCE: [OrderStatus; 7] = [
        OrderStatus::Created,
        OrderStatus::PartnerAssigned,
        OrderStatus::PickedUp,
        OrderStatus::InProcessing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    /// Every status, including `Cancelled`.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Created,
        OrderStatus::PartnerAssigned,
        OrderStatus::PickedUp,
        OrderStatus::InProcessing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position in the forward sequence; `None` for `Cancelled`.
    pub fn stage_index(self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|s| *s == self)
    }

    /// Human-facing label used in notifications and list screens.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Created => "Order Created",
            OrderStatus::PartnerAssigned => "Partner Assigned",
            OrderStatus::PickedUp => "Picked Up",
            OrderStatus::InProcessing => "Processing",
            OrderStatus::Ready => "Ready",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Wire name, as persisted (`PICKED_UP`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::PartnerAssigned => "PARTNER_ASSIGNED",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::InProcessing => "IN_PROCESSING",
            OrderStatus::Ready => "READY",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "Wash & Fold")]
    WashFold,
    #[serde(rename = "Wash & Iron")]
    WashIron,
    #[serde(rename = "Dry Clean")]
    DryClean,
    #[serde(rename = "Shoe Wash")]
    ShoeWash,
    #[serde(rename = "Blanket Cleaning")]
    BlanketCleaning,
    #[serde(rename = "Express Service")]
    Express,
    #[serde(rename = "Quick Service")]
    QuickService,
    #[serde(rename = "Steam Iron")]
    SteamIron,
}

impl ServiceType {
    pub const ALL: [ServiceType; 8] = [
        ServiceType::WashFold,
        ServiceType::WashIron,
        ServiceType::QuickService,
        ServiceType::SteamIron,
        ServiceType::DryClean,
        ServiceType::ShoeWash,
        ServiceType::BlanketCleaning,
        ServiceType::Express,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ServiceType::WashFold => "Wash & Fold",
            ServiceType::WashIron => "Wash & Iron",
            ServiceType::DryClean => "Dry Clean",
            ServiceType::ShoeWash => "Shoe Wash",
            ServiceType::BlanketCleaning => "Blanket Cleaning",
            ServiceType::Express => "Express Service",
            ServiceType::QuickService => "Quick Service",
            ServiceType::SteamIron => "Steam Iron",
        }
    }

    /// Catalogue price charged when a booking does not quote its own amount.
    pub fn base_price(self) -> f64 {
        match self {
            ServiceType::WashFold => 49.0,
            ServiceType::WashIron => 69.0,
            ServiceType::QuickService => 89.0,
            ServiceType::SteamIron => 29.0,
            ServiceType::DryClean => 149.0,
            ServiceType::ShoeWash => 199.0,
            ServiceType::BlanketCleaning => 299.0,
            ServiceType::Express => 99.0,
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.display_name() == name)
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    /// Cash on delivery
    Cod,
}

impl PaymentStatus {
    /// Payment state after the order is handed over.
    pub fn settled_on_delivery(self) -> PaymentStatus {
        match self {
            PaymentStatus::Completed | PaymentStatus::Cod => self,
            PaymentStatus::Pending | PaymentStatus::Failed => PaymentStatus::Completed,
        }
    }
}

/// Operational details captured by the agent at pickup.
///
/// Every field is optional because this doubles as the agent's in-progress
/// form; [`PickupDetails::validate`] is the gate before PICKED_UP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickupDetails {
    pub cloth_count: Option<u32>,
    pub blanket_count: Option<u32>,
    pub actual_pickup_time: Option<DateTime<Utc>>,
}

/// Pickup details that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmedPickup {
    pub cloth_count: u32,
    pub blanket_count: u32,
    pub actual_pickup_time: DateTime<Utc>,
}

impl PickupDetails {
    pub fn new(cloth_count: u32, blanket_count: u32, actual_pickup_time: DateTime<Utc>) -> Self {
        Self {
            cloth_count: Some(cloth_count),
            blanket_count: Some(blanket_count),
            actual_pickup_time: Some(actual_pickup_time),
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cloth_count.is_none() {
            missing.push("clothCount");
        }
        if self.blanket_count.is_none() {
            missing.push("blanketCount");
        }
        if self.actual_pickup_time.is_none() {
            missing.push("actualPickupTime");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn validate(&self) -> Result<ConfirmedPickup, OrderError> {
        match (self.cloth_count, self.blanket_count, self.actual_pickup_time) {
            (Some(cloth_count), Some(blanket_count), Some(actual_pickup_time)) => Ok(ConfirmedPickup {
                cloth_count,
                blanket_count,
                actual_pickup_time,
            }),
            _ => Err(OrderError::IncompleteInput {
                missing: self.missing_fields(),
            }),
        }
    }
}

/// Fields a requester supplies when booking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub service_type: Option<ServiceType>,
    /// Falls back to the service's catalogue price when absent.
    pub total_amount: Option<f64>,
    pub payment_status: Option<PaymentStatus>,
    pub partner_id: Option<String>,
    pub pickup_time: String,
    pub delivery_time: String,
    pub notes: Option<String>,
}

// ============================================================================
// Unit Tests
// ============================================================================
