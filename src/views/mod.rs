use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{Order, OrderCommandHandler};
use crate::domain::Principal;
use crate::events::EventEnvelope;
use crate::metrics::Metrics;
use crate::notifications::{Notification, NotificationCenter, NotificationConfig, NotificationKind};
use crate::store::{OrderStore, Snapshot, StoreChange, StoreSubscriber, SubscriptionId};

pub mod operator;
pub mod partner;
pub mod requester;

pub use operator::{DashboardStats, OperatorView, PartnerSummary};
pub use partner::{AgentScreen, FulfillmentView};
pub use requester::{RequesterProfile, RequesterView};

// ============================================================================
// Role Views - headless screens for each actor
// ============================================================================
//
// A view is plain state behind a mutex, subscribed to the store. Every
// broadcast runs the snapshot diff against what the view last saw and turns
// externally caused changes into notifications. Changes the view's own
// principal made refresh state silently.
//
// Writes go through a `Session`, which never holds the view lock while
// calling into the store: the store delivers the resulting broadcast to the
// same view synchronously.
//
// ============================================================================

/// One actor's screen state.
pub trait RoleView: Send {
    fn principal(&self) -> &Principal;

    /// Take `snapshot` as the baseline without raising anything.
    fn seed(&mut self, snapshot: &Snapshot);

    /// React to one store broadcast.
    fn observe(&mut self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot);

    fn notifications(&self) -> &NotificationCenter;

    fn notifications_mut(&mut self) -> &mut NotificationCenter;
}

impl<V: RoleView> StoreSubscriber for Mutex<V> {
    fn on_subscribe(&self, snapshot: &Snapshot) {
        self.lock().seed(snapshot);
    }

    fn on_store_change(&self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot) {
        self.lock().observe(change, snapshot);
    }
}

/// State every role view carries.
#[derive(Debug)]
pub struct ViewState {
    pub principal: Principal,
    pub last_seen: Snapshot,
    /// Store revision `last_seen` belongs to.
    pub revision: i64,
    pub notifications: NotificationCenter,
    metrics: Option<Arc<Metrics>>,
}

impl ViewState {
    pub fn new(principal: Principal, config: &NotificationConfig) -> Self {
        Self {
            principal,
            last_seen: Arc::new(Vec::new()),
            revision: 0,
            notifications: NotificationCenter::new(config),
            metrics: None,
        }
    }

    pub fn set_metrics(&mut self, metrics: Arc<Metrics>) {
        self.metrics = Some(metrics);
    }

    pub fn seed(&mut self, snapshot: &Snapshot) {
        self.last_seen = snapshot.clone();
    }

    /// `false` for a broadcast older than the one already applied. Nested
    /// writes can deliver a later revision before an earlier one finishes
    /// fanning out.
    pub fn accept(&mut self, change: &EventEnvelope<StoreChange>) -> bool {
        if change.sequence_number <= self.revision {
            tracing::trace!(
                view = %self.principal,
                revision = change.sequence_number,
                seen = self.revision,
                "Skipping stale broadcast"
            );
            return false;
        }
        self.revision = change.sequence_number;
        true
    }

    pub fn find(&self, order_id: Uuid) -> Option<&Order> {
        self.last_seen.iter().find(|o| o.id == order_id)
    }

    pub fn raise(
        &mut self,
        kind: NotificationKind,
        order_id: Uuid,
        order_number: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        if let Some(metrics) = &self.metrics {
            metrics.record_notification(self.principal.role.as_str(), kind.as_str());
        }
        self.notifications.push(kind, order_id, order_number, message, now);
    }
}

/// A view attached to the store plus the handler its actions write through.
pub struct Session<V: RoleView + 'static> {
    view: Arc<Mutex<V>>,
    handler: OrderCommandHandler,
    subscription: SubscriptionId,
}

impl<V: RoleView + 'static> Session<V> {
    pub fn attach(handler: OrderCommandHandler, view: V) -> Self {
        let view = Arc::new(Mutex::new(view));
        let subscription = handler.store().subscribe(view.clone());

        tracing::info!(view = %view.lock().principal(), "👀 View attached");

        Self {
            view,
            handler,
            subscription,
        }
    }

    pub fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock()
    }

    pub fn shared_view(&self) -> Arc<Mutex<V>> {
        self.view.clone()
    }

    pub fn handler(&self) -> &OrderCommandHandler {
        &self.handler
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        self.handler.store()
    }

    pub fn principal(&self) -> Principal {
        self.view.lock().principal().clone()
    }

    pub fn notifications(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.view.lock().notifications().active(now).into_iter().cloned().collect()
    }

    /// Drop expired notifications; returns how many went.
    pub fn expire_notifications(&self, now: DateTime<Utc>) -> usize {
        self.view.lock().notifications_mut().expire(now)
    }

    pub fn detach(self) {
        self.handler.store().unsubscribe(self.subscription);
    }
}

pub type OperatorSession = Session<OperatorView>;
pub type RequesterSession = Session<RequesterView>;
pub type FulfillmentSession = Session<FulfillmentView>;
