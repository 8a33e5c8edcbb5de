// ============================================================================
// laundro_sync - laundry order lifecycle and multi-role synchronization
// ============================================================================
//
// Layers, leaves first:
// - events        - generic Aggregate / EventEnvelope building blocks
// - domain        - Order aggregate, lifecycle rules, tracking codes, handler
// - store         - the shared order collection and its snapshot mirror
// - notifications - snapshot diff and auto-expiring alerts
// - gesture       - two-phase commit control for agents
// - views         - operator / requester / fulfillment agent screens
// - actors        - timers (settle delay, acknowledgment, expiry)
// - metrics, config
//
// ============================================================================

pub mod actors;
pub mod config;
pub mod domain;
pub mod events;
pub mod gesture;
pub mod metrics;
pub mod notifications;
pub mod store;
pub mod views;

pub use config::{AppConfig, ConfigError};
pub use domain::order::{Order, OrderCommandHandler, OrderError, OrderStatus};
pub use domain::{Principal, Role};
pub use store::OrderStore;
