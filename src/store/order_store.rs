use chrono::Utc;
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};
use crate::domain::Principal;
use crate::events::{DomainEvent, EventEnvelope};
use crate::metrics::Metrics;

// ============================================================================
// Order Store - the single authoritative order collection
// ============================================================================
//
// Responsibilities:
// 1. Hold every order, most recent first
// 2. insert / replace-by-id (last write wins, no field merging)
// 3. Broadcast each change synchronously to every subscriber, tagged with
//    a monotonically increasing revision
// 4. update: read-check-write of one order with no writer in between
//
// Writers are serialized by a reentrant gate. A subscriber that writes from
// inside its callback has its nested broadcast fanned out in full before the
// outer loop resumes, so subscribers later in the list receive revision N+1
// before N. Stateful subscribers keep the highest revision applied and drop
// older envelopes.
//
// ============================================================================

/// Immutable view of the whole collection at one revision.
pub type Snapshot = Arc<Vec<Order>>;

/// What a broadcast reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreChange {
    Inserted {
        order_number: String,
        status: OrderStatus,
    },
    Replaced {
        order_number: String,
        previous_status: OrderStatus,
        status: OrderStatus,
    },
}

impl DomainEvent for StoreChange {
    fn event_type(&self) -> &'static str {
        match self {
            StoreChange::Inserted { .. } => "OrderInserted",
            StoreChange::Replaced { .. } => "OrderReplaced",
        }
    }
}

/// Receives every store broadcast.
///
/// Called synchronously on the writer's thread.
pub trait StoreSubscriber: Send + Sync {
    /// Called once with the current collection when the subscription starts.
    fn on_subscribe(&self, _snapshot: &Snapshot) {}

    fn on_store_change(&self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct OrderStore {
    orders: RwLock<Snapshot>,
    write_gate: ReentrantMutex<()>,
    revision: AtomicI64,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn StoreSubscriber>)>>,
    next_subscription: AtomicU64,
    metrics: Option<Arc<Metrics>>,
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore {
    pub fn new() -> Self {
        Self::with_orders(Vec::new())
    }

    /// Start from an existing collection, e.g. one restored from a snapshot.
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: RwLock::new(Arc::new(orders)),
            write_gate: ReentrantMutex::new(()),
            revision: AtomicI64::new(0),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics.store_orders.set(self.orders.read().len() as i64);
        self.metrics = Some(metrics);
        self
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        self.orders.read().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.read().iter().find(|o| o.id == id).cloned()
    }

    pub fn find_by_order_number(&self, order_number: &str) -> Option<Order> {
        self.orders
            .read()
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned()
    }

    pub fn contains_order_number(&self, order_number: &str) -> bool {
        self.orders.read().iter().any(|o| o.order_number == order_number)
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    /// Number of broadcasts issued so far.
    pub fn revision(&self) -> i64 {
        self.revision.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Add a new order at the front of the collection.
    ///
    /// Tracking code uniqueness is the generator's job; a duplicate is logged
    /// but still stored.
    pub fn insert(&self, order: Order, origin: Option<&Principal>) {
        let _gate = self.write_gate.lock();

        let snapshot = {
            let mut guard = self.orders.write();
            if guard.iter().any(|o| o.id == order.id || o.order_number == order.order_number) {
                tracing::warn!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    "Inserting order whose id or tracking code is already stored"
                );
            }
            Arc::make_mut(&mut *guard).insert(0, order.clone());
            guard.clone()
        };

        if let Some(metrics) = &self.metrics {
            metrics.store_orders.set(snapshot.len() as i64);
        }

        let change = StoreChange::Inserted {
            order_number: order.order_number.clone(),
            status: order.status,
        };
        self.broadcast(order.id, change, origin, snapshot);
    }

    /// Replace the order with the same `id` wholesale.
    ///
    /// Returns `false`, without broadcasting, when no such order exists.
    pub fn replace(&self, order: Order, origin: Option<&Principal>) -> bool {
        let _gate = self.write_gate.lock();

        let replaced = {
            let mut guard = self.orders.write();
            match guard.iter().position(|o| o.id == order.id) {
                Some(idx) => {
                    let orders = Arc::make_mut(&mut *guard);
                    let previous = std::mem::replace(&mut orders[idx], order.clone());
                    Some((previous.status, guard.clone()))
                }
                None => None,
            }
        };

        let Some((previous_status, snapshot)) = replaced else {
            tracing::warn!(
                order_id = %order.id,
                order_number = %order.order_number,
                origin = ?origin,
                "Replace ignored: no order with this id"
            );
            if let Some(metrics) = &self.metrics {
                metrics.store_replace_unknown.inc();
            }
            return false;
        };

        let change = StoreChange::Replaced {
            order_number: order.order_number.clone(),
            previous_status,
            status: order.status,
        };
        self.broadcast(order.id, change, origin, snapshot);
        true
    }

    /// Read, change and write back one order while holding the write gate.
    ///
    /// `None` when no order has this id. An `Err` from `f` leaves the store
    /// untouched; otherwise yields `(previous, updated)`. `f` must not write
    /// to the store itself.
    pub fn update<F, E>(&self, id: Uuid, origin: Option<&Principal>, f: F) -> Option<Result<(Order, Order), E>>
    where
        F: FnOnce(&Order) -> Result<Order, E>,
    {
        let _gate = self.write_gate.lock();

        let current = self.get(id)?;
        let updated = match f(&current) {
            Ok(updated) => updated,
            Err(e) => return Some(Err(e)),
        };
        self.replace(updated.clone(), origin);

        Some(Ok((current, updated)))
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    pub fn subscribe(&self, subscriber: Arc<dyn StoreSubscriber>) -> SubscriptionId {
        let _gate = self.write_gate.lock();

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        subscriber.on_subscribe(&self.snapshot());
        self.subscribers.write().push((id, subscriber));

        tracing::debug!(subscription = id.0, "Store subscriber attached");
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    fn broadcast(&self, order_id: Uuid, change: StoreChange, origin: Option<&Principal>, snapshot: Snapshot) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::new(order_id, revision, change, Utc::now()).with_origin(origin.cloned());

        tracing::debug!(
            order_id = %order_id,
            revision = revision,
            event_type = %envelope.event_type,
            origin = ?origin,
            "Broadcasting store change"
        );

        let subscribers: Vec<Arc<dyn StoreSubscriber>> =
            self.subscribers.read().iter().map(|(_, s)| s.clone()).collect();

        for subscriber in subscribers {
            subscriber.on_store_change(&envelope, &snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::sample_order;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seeded: Mutex<Option<usize>>,
        changes: Mutex<Vec<(i64, StoreChange, usize)>>,
    }

    impl StoreSubscriber for Recorder {
        fn on_subscribe(&self, snapshot: &Snapshot) {
            *self.seeded.lock() = Some(snapshot.len());
        }

        fn on_store_change(&self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot) {
            self.changes
                .lock()
                .push((change.sequence_number, change.event_data.clone(), snapshot.len()));
        }
    }

    fn order(code: &str, status: OrderStatus) -> Order {
        let mut order = sample_order(status);
        order.id = Uuid::new_v4();
        order.order_number = code.to_string();
        order
    }

    #[test]
    fn test_insert_prepends() {
        let store = OrderStore::new();
        store.insert(order("LP-AAAAAA", OrderStatus::Created), None);
        store.insert(order("LP-BBBBBB", OrderStatus::Created), None);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].order_number, "LP-BBBBBB");
        assert!(store.contains_order_number("LP-AAAAAA"));
        assert!(store.find_by_order_number("LP-AAAAAA").is_some());
    }

    #[test]
    fn test_replace_overwrites_whole_record() {
        let store = OrderStore::new();
        let original = order("LP-AAAAAA", OrderStatus::PartnerAssigned);
        store.insert(original.clone(), None);

        let mut updated = original.clone();
        updated.status = OrderStatus::Cancelled;
        updated.notes = Some("left at door".to_string());

        assert!(store.replace(updated.clone(), None));
        assert_eq!(store.get(original.id), Some(updated));
    }

    #[test]
    fn test_last_write_wins() {
        let store = OrderStore::new();
        let original = order("LP-AAAAAA", OrderStatus::PartnerAssigned);
        store.insert(original.clone(), None);

        let mut from_agent = original.clone();
        from_agent.cloth_count = Some(9);
        let mut from_operator = original.clone();
        from_operator.status = OrderStatus::Cancelled;

        store.replace(from_agent, None);
        store.replace(from_operator.clone(), None);

        let stored = store.get(original.id).unwrap();
        assert_eq!(stored, from_operator);
        assert_eq!(stored.cloth_count, None);
    }

    #[test]
    fn test_replace_unknown_id_is_silent_noop() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let store = OrderStore::new().with_metrics(metrics.clone());
        let recorder = Arc::new(Recorder::default());
        store.insert(order("LP-AAAAAA", OrderStatus::Created), None);
        store.subscribe(recorder.clone());

        let stray = order("LP-ZZZZZZ", OrderStatus::Ready);
        assert!(!store.replace(stray, None));

        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), 1);
        assert!(recorder.changes.lock().is_empty());
        assert_eq!(metrics.store_replace_unknown.get(), 1);
        assert_eq!(metrics.store_orders.get(), 1);
    }

    #[test]
    fn test_subscribers_see_every_write_in_order() {
        let store = OrderStore::new();
        store.insert(order("LP-SEED00", OrderStatus::Created), None);

        let recorder = Arc::new(Recorder::default());
        store.subscribe(recorder.clone());
        assert_eq!(*recorder.seeded.lock(), Some(1));

        let a = order("LP-AAAAAA", OrderStatus::Created);
        store.insert(a.clone(), None);
        let mut a2 = a.clone();
        a2.status = OrderStatus::PartnerAssigned;
        store.replace(a2, None);

        let changes = recorder.changes.lock();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].0, 2);
        assert_eq!(changes[1].0, 3);
        assert!(matches!(changes[0].1, StoreChange::Inserted { .. }));
        assert_eq!(
            changes[1].1,
            StoreChange::Replaced {
                order_number: "LP-AAAAAA".to_string(),
                previous_status: OrderStatus::Created,
                status: OrderStatus::PartnerAssigned,
            }
        );
        assert_eq!(changes[1].2, 2);
    }

    #[test]
    fn test_broadcast_carries_origin() {
        struct OriginCheck(Mutex<Option<Principal>>);
        impl StoreSubscriber for OriginCheck {
            fn on_store_change(&self, change: &EventEnvelope<StoreChange>, _snapshot: &Snapshot) {
                *self.0.lock() = change.origin.clone();
            }
        }

        let store = OrderStore::new();
        let check = Arc::new(OriginCheck(Mutex::new(None)));
        store.subscribe(check.clone());

        let agent = Principal::agent("p1");
        store.insert(order("LP-AAAAAA", OrderStatus::Created), Some(&agent));

        assert_eq!(check.0.lock().clone(), Some(agent));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let store = OrderStore::new();
        let recorder = Arc::new(Recorder::default());
        let id = store.subscribe(recorder.clone());

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.insert(order("LP-AAAAAA", OrderStatus::Created), None);

        assert!(recorder.changes.lock().is_empty());
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let store = OrderStore::new();
        store.insert(order("LP-AAAAAA", OrderStatus::Created), None);
        let before = store.snapshot();

        store.insert(order("LP-BBBBBB", OrderStatus::Created), None);

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_nested_write_from_subscriber_does_not_deadlock() {
        struct AutoAssign {
            store: Mutex<Option<Arc<OrderStore>>>,
        }
        impl StoreSubscriber for AutoAssign {
            fn on_store_change(&self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot) {
                let StoreChange::Inserted { status: OrderStatus::Created, .. } = change.event_data else {
                    return;
                };
                let Some(store) = self.store.lock().clone() else { return };
                if let Some(o) = snapshot.iter().find(|o| o.id == change.aggregate_id) {
                    let mut assigned = o.clone();
                    assigned.status = OrderStatus::PartnerAssigned;
                    store.replace(assigned, None);
                }
            }
        }

        let store = Arc::new(OrderStore::new());
        let auto = Arc::new(AutoAssign {
            store: Mutex::new(Some(store.clone())),
        });
        store.subscribe(auto.clone());

        let o = order("LP-AAAAAA", OrderStatus::Created);
        store.insert(o.clone(), None);

        assert_eq!(store.get(o.id).unwrap().status, OrderStatus::PartnerAssigned);
        assert_eq!(store.revision(), 2);
        // Break the Arc cycle
        auto.store.lock().take();
    }

    #[test]
    fn test_nested_write_reaches_later_subscribers_first() {
        struct Renamer {
            store: Mutex<Option<Arc<OrderStore>>>,
        }
        impl StoreSubscriber for Renamer {
            fn on_store_change(&self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot) {
                if change.sequence_number != 1 {
                    return;
                }
                let Some(store) = self.store.lock().clone() else { return };
                let mut renamed = snapshot[0].clone();
                renamed.notes = Some("nested write".to_string());
                store.replace(renamed, None);
            }
        }

        let store = Arc::new(OrderStore::new());
        let renamer = Arc::new(Renamer {
            store: Mutex::new(Some(store.clone())),
        });
        let recorder = Arc::new(Recorder::default());
        store.subscribe(renamer.clone());
        store.subscribe(recorder.clone());

        store.insert(order("LP-AAAAAA", OrderStatus::Created), None);

        let seen: Vec<i64> = recorder.changes.lock().iter().map(|(rev, _, _)| *rev).collect();
        assert_eq!(seen, vec![2, 1]);
        renamer.store.lock().take();
    }

    #[test]
    fn test_update_applies_under_gate() {
        let store = OrderStore::new();
        let o = order("LP-AAAAAA", OrderStatus::PartnerAssigned);
        store.insert(o.clone(), None);

        let (previous, updated) = store
            .update(o.id, None, |current| {
                let mut next = current.clone();
                next.status = OrderStatus::PickedUp;
                Ok::<_, ()>(next)
            })
            .unwrap()
            .unwrap();
        assert_eq!(previous.status, OrderStatus::PartnerAssigned);
        assert_eq!(updated.status, OrderStatus::PickedUp);
        assert_eq!(store.revision(), 2);

        let rejected = store.update(o.id, None, |_| Err::<Order, _>("no"));
        assert_eq!(rejected, Some(Err("no")));
        assert_eq!(store.revision(), 2);

        assert!(store.update(Uuid::new_v4(), None, |c| Ok::<_, ()>(c.clone())).is_none());
    }

    #[test]
    fn test_update_is_not_interleaved_by_other_threads() {
        let store = Arc::new(OrderStore::new());
        let o = order("LP-AAAAAA", OrderStatus::PartnerAssigned);
        store.insert(o.clone(), None);
        let recorder = Arc::new(Recorder::default());
        store.subscribe(recorder.clone());

        let mut cancelled = o.clone();
        cancelled.status = OrderStatus::Cancelled;

        let mut writer = None;
        let result = store.update(o.id, None, |current| {
            // Another thread tries to write while this update is mid-flight
            let other = store.clone();
            let cancelled = cancelled.clone();
            writer = Some(std::thread::spawn(move || other.replace(cancelled, None)));
            std::thread::sleep(std::time::Duration::from_millis(50));

            let mut next = current.clone();
            next.status = OrderStatus::PickedUp;
            Ok::<_, ()>(next)
        });
        assert!(matches!(result, Some(Ok(_))));
        assert!(writer.unwrap().join().unwrap());

        // The other writer waited for the gate, so it landed second
        assert_eq!(store.get(o.id).unwrap().status, OrderStatus::Cancelled);
        let statuses: Vec<OrderStatus> = recorder
            .changes
            .lock()
            .iter()
            .map(|(_, change, _)| match change {
                StoreChange::Replaced { status, .. } | StoreChange::Inserted { status, .. } => *status,
            })
            .collect();
        assert_eq!(statuses, vec![OrderStatus::PickedUp, OrderStatus::Cancelled]);
    }
}
