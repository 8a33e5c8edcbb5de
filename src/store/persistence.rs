use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use super::order_store::{Snapshot, StoreChange, StoreSubscriber};
use crate::domain::order::{Order, OrderStatus, PaymentStatus, ServiceType};
use crate::events::EventEnvelope;

// ============================================================================
// Snapshot Persistence - mirror of the order collection
// ============================================================================
//
// Responsibilities:
// 1. Load / save the whole collection as an ordered JSON array
// 2. Mirror every store broadcast to disk (SnapshotMirror)
// 3. Restore the store at start-up, or fall back to demo data
//
// Every Order field is written, optional ones as explicit nulls, so a
// load(save(x)) round trip is lossless.
//
// ============================================================================

/// Storage port for the full order collection.
pub trait SnapshotRepository: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Order>>>;

    fn save(&self, orders: &[Order]) -> Result<()>;
}

pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotRepository for JsonFileRepository {
    fn load(&self) -> Result<Option<Vec<Order>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        let orders: Vec<Order> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;

        Ok(Some(orders))
    }

    fn save(&self, orders: &[Order]) -> Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
                parent
            }
            None => Path::new("."),
        };

        let json = serde_json::to_string_pretty(orders)?;

        // Uniquely named temp file in the same directory, then an atomic rename
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .with_context(|| format!("writing {}", tmp.path().display()))?;
        tmp.as_file().sync_all().context("syncing snapshot")?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        Ok(())
    }
}

/// Store subscriber that saves the collection after every change.
///
/// A write made by an earlier subscriber reaches the mirror before the change
/// that triggered it; the mirror keeps the highest revision it has saved and
/// skips anything older, so the file always ends on the latest snapshot.
pub struct SnapshotMirror<R: SnapshotRepository> {
    repository: R,
    last_saved: AtomicI64,
}

impl<R: SnapshotRepository> SnapshotMirror<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            last_saved: AtomicI64::new(0),
        }
    }
}

impl<R: SnapshotRepository> StoreSubscriber for SnapshotMirror<R> {
    fn on_store_change(&self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot) {
        let revision = change.sequence_number;
        if self.last_saved.fetch_max(revision, Ordering::SeqCst) >= revision {
            tracing::trace!(revision, "Skipping superseded snapshot");
            return;
        }

        match self.repository.save(snapshot) {
            Ok(()) => tracing::trace!(revision = change.sequence_number, "Snapshot mirrored"),
            Err(e) => tracing::error!(
                error = %e,
                revision = change.sequence_number,
                "❌ Failed to mirror order snapshot"
            ),
        }
    }
}

/// Load the saved collection, or fall back to [`seed_orders`] when there is
/// none or it cannot be read.
pub fn restore_or_seed<R: SnapshotRepository>(repository: &R) -> Vec<Order> {
    match repository.load() {
        Ok(Some(orders)) => {
            tracing::info!(orders = orders.len(), "📂 Restored orders from snapshot");
            orders
        }
        Ok(None) => {
            tracing::info!("No snapshot found, seeding demo orders");
            seed_orders()
        }
        Err(e) => {
            tracing::warn!(error = %e, "⚠️  Snapshot unreadable, seeding demo orders");
            seed_orders()
        }
    }
}

/// Demo collection used when no snapshot exists, most recent first.
pub fn seed_orders() -> Vec<Order> {
    let at = |d, h, m| Utc.with_ymd_and_hms(2023, 10, d, h, m, 0).single();

    vec![
        Order {
            id: Uuid::from_u128(0x0000_0002),
            order_number: "#1002".to_string(),
            customer_id: "c1".to_string(),
            customer_name: "Rahul Sharma".to_string(),
            customer_phone: "+91 9123456781".to_string(),
            address: "Flat 402, Sunshine Apts, Mumbai".to_string(),
            partner_id: Some("p2".to_string()),
            service_type: ServiceType::DryClean,
            total_amount: 745.0,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::PickedUp,
            cloth_count: Some(5),
            blanket_count: Some(0),
            pickup_time: "2023-10-26 02:00 PM".to_string(),
            actual_pickup_time: at(26, 14, 10),
            ready_at_time: None,
            actual_delivery_time: None,
            delivery_time: "2023-10-29 11:00 AM".to_string(),
            created_at: at(26, 12, 15).unwrap_or_default(),
            notes: None,
        },
        Order {
            id: Uuid::from_u128(0x0000_0001),
            order_number: "#1001".to_string(),
            customer_id: "c1".to_string(),
            customer_name: "Rahul Sharma".to_string(),
            customer_phone: "+91 9123456780".to_string(),
            address: "Flat 402, Sunshine Apts, Mumbai".to_string(),
            partner_id: Some("p1".to_string()),
            service_type: ServiceType::WashFold,
            total_amount: 588.0,
            payment_status: PaymentStatus::Completed,
            status: OrderStatus::Delivered,
            cloth_count: Some(12),
            blanket_count: Some(0),
            pickup_time: "2023-10-25 10:00 AM".to_string(),
            actual_pickup_time: at(25, 10, 15),
            ready_at_time: at(26, 14, 30),
            actual_delivery_time: at(27, 18, 0),
            delivery_time: "2023-10-27 06:00 PM".to_string(),
            created_at: at(25, 8, 30).unwrap_or_default(),
            notes: None,
        },
    ]
}
