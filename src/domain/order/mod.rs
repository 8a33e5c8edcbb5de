// ============================================================================
// Order Domain
// ============================================================================
//
// Everything that knows what an order is:
// - Value objects (OrderStatus, ServiceType, PaymentStatus, PickupDetails)
// - Events and commands driving the lifecycle
// - Errors (OrderError)
// - Aggregate (Order + the lifecycle state machine)
// - Tracking code generator
// - Command Handler (the write path into the store)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod tracking;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use tracking::{GeneratedCode, TrackingConfig, TrackingIdGenerator};
pub use command_handler::*;
