// ============================================================================
// Change Detection / Notification Engine
// ============================================================================

pub mod diff;
pub mod notifier;

pub use diff::{diff_snapshots, SnapshotChange};
pub use notifier::{Notification, NotificationCenter, NotificationConfig, NotificationKind};
