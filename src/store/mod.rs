// ============================================================================
// Store - authoritative order collection and its persistence port
// ============================================================================

pub mod order_store;
pub mod persistence;

pub use order_store::{OrderStore, Snapshot, StoreChange, StoreSubscriber, SubscriptionId};
pub use persistence::{restore_or_seed, seed_orders, JsonFileRepository, SnapshotMirror, SnapshotRepository};
