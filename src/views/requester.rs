use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{RoleView, Session, ViewState};
use crate::domain::order::{Order, OrderDraft, OrderError, PaymentStatus, ServiceType};
use crate::domain::Principal;
use crate::events::EventEnvelope;
use crate::metrics::Metrics;
use crate::notifications::{diff_snapshots, NotificationCenter, NotificationConfig, NotificationKind, SnapshotChange};
use crate::store::{Snapshot, StoreChange};

/// Contact details the requester books with.
#[derive(Debug, Clone, PartialEq)]
pub struct RequesterProfile {
    pub customer_id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// Customer-facing view: the requester's own orders and their progress.
pub struct RequesterView {
    state: ViewState,
    profile: RequesterProfile,
    /// Partner new bookings are handed to, if any.
    default_partner: Option<String>,
    tracking: Option<Order>,
}

impl RequesterView {
    pub fn new(profile: RequesterProfile, default_partner: Option<String>, notifications: &NotificationConfig) -> Self {
        Self {
            state: ViewState::new(Principal::requester(profile.customer_id.clone()), notifications),
            profile,
            default_partner,
            tracking: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.state.set_metrics(metrics);
        self
    }

    pub fn profile(&self) -> &RequesterProfile {
        &self.profile
    }

    pub fn tracking(&self) -> Option<&Order> {
        self.tracking.as_ref()
    }

    pub fn active_orders(&self) -> Vec<Order> {
        self.own().filter(|o| o.is_active()).cloned().collect()
    }

    pub fn past_orders(&self) -> Vec<Order> {
        self.own().filter(|o| !o.is_active()).cloned().collect()
    }

    fn own(&self) -> impl Iterator<Item = &Order> {
        self.state.last_seen.iter().filter(|o| o.customer_id == self.profile.customer_id)
    }

    /// Open one of the requester's orders for tracking.
    pub fn track(&mut self, order_id: Uuid) -> Result<&Order, OrderError> {
        let order = self
            .own()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or(OrderError::NotFound(order_id))?;
        Ok(self.tracking.insert(order))
    }

    pub fn stop_tracking(&mut self) {
        self.tracking = None;
    }

    /// A booking draft for `service` filled from the profile.
    pub fn draft(&self, service: ServiceType, pickup_time: &str, delivery_time: &str, notes: Option<String>) -> OrderDraft {
        OrderDraft {
            customer_id: self.profile.customer_id.clone(),
            customer_name: self.profile.name.clone(),
            customer_phone: self.profile.phone.clone(),
            address: self.profile.address.clone(),
            service_type: Some(service),
            total_amount: None,
            payment_status: Some(PaymentStatus::Pending),
            partner_id: self.default_partner.clone(),
            pickup_time: pickup_time.to_string(),
            delivery_time: delivery_time.to_string(),
            notes,
        }
    }

    fn handle(&mut self, change: SnapshotChange, now: DateTime<Utc>) {
        let tracking_id = self.tracking.as_ref().map(|o| o.id);

        match change {
            SnapshotChange::NewlyVisible(order) => self.state.raise(
                NotificationKind::Appeared,
                order.id,
                &order.order_number,
                format!("📦 Order {} was booked for you", order.order_number),
                now,
            ),
            SnapshotChange::StatusChanged { order, .. } => {
                self.state.raise(
                    NotificationKind::StatusChanged,
                    order.id,
                    &order.order_number,
                    format!("Order {} is now {}", order.order_number, order.status.label()),
                    now,
                );
                if tracking_id == Some(order.id) {
                    self.tracking = Some(order);
                }
            }
            SnapshotChange::NoLongerVisible { id, order_number, .. } => {
                self.state.raise(
                    NotificationKind::Disappeared,
                    id,
                    &order_number,
                    format!("Order {order_number} is no longer on your account"),
                    now,
                );
                if tracking_id == Some(id) {
                    self.tracking = None;
                }
            }
        }
    }
}

impl RoleView for RequesterView {
    fn principal(&self) -> &Principal {
        &self.state.principal
    }

    fn seed(&mut self, snapshot: &Snapshot) {
        self.state.seed(snapshot);
    }

    fn observe(&mut self, change: &EventEnvelope<StoreChange>, snapshot: &Snapshot) {
        if !self.state.accept(change) {
            return;
        }

        let customer_id = self.profile.customer_id.clone();
        let changes = diff_snapshots(
            &self.state.last_seen,
            snapshot,
            |o| o.customer_id == customer_id,
            self.tracking.as_ref(),
        );
        self.state.last_seen = snapshot.clone();

        if !change.originated_by(&self.state.principal) {
            for c in changes {
                self.handle(c, change.timestamp);
            }
        }

        if let Some(id) = self.tracking.as_ref().map(|o| o.id) {
            self.tracking = self.state.find(id).cloned();
        }
    }

    fn notifications(&self) -> &NotificationCenter {
        &self.state.notifications
    }

    fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.state.notifications
    }
}

impl Session<RequesterView> {
    pub fn book(
        &self,
        service: ServiceType,
        pickup_time: &str,
        delivery_time: &str,
        notes: Option<String>,
    ) -> Result<Order, OrderError> {
        let draft = self.view().draft(service, pickup_time, delivery_time, notes);
        let origin = self.principal();
        self.handler().create_order(draft, Some(&origin))
    }

    /// Cancel one of the requester's own orders.
    pub fn cancel(&self, order_id: Uuid, reason: Option<String>) -> Result<Order, OrderError> {
        let owned = self.view().own().any(|o| o.id == order_id);
        if !owned {
            return Err(OrderError::NotFound(order_id));
        }
        let origin = self.principal();
        self.handler().cancel(order_id, reason, Some(&origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderCommandHandler, OrderStatus, TrackingIdGenerator};
    use crate::store::OrderStore;

    fn profile() -> RequesterProfile {
        RequesterProfile {
            customer_id: "c1".to_string(),
            name: "Rahul Sharma".to_string(),
            phone: "+91 9123456780".to_string(),
            address: "Flat 402, Sunshine Apts".to_string(),
        }
    }

    fn session(default_partner: Option<&str>) -> Session<RequesterView> {
        let handler = OrderCommandHandler::new(Arc::new(OrderStore::new()), TrackingIdGenerator::default());
        let view = RequesterView::new(profile(), default_partner.map(str::to_string), &NotificationConfig::default());
        Session::attach(handler, view)
    }

    #[test]
    fn test_booking_uses_profile_and_default_partner() {
        let session = session(Some("p1"));

        let order = session
            .book(ServiceType::WashFold, "Tomorrow, 10:00 AM", "2 Days later, 06:00 PM", None)
            .unwrap();

        assert_eq!(order.customer_name, "Rahul Sharma");
        assert_eq!(order.total_amount, 49.0);
        assert_eq!(order.status, OrderStatus::PartnerAssigned);
        assert_eq!(order.partner_id.as_deref(), Some("p1"));

        let view = session.view();
        assert_eq!(view.active_orders(), vec![order]);
        // Own booking raises nothing
        assert!(view.notifications().is_empty());
    }

    #[test]
    fn test_booking_without_partner_starts_created() {
        let session = session(None);
        let order = session.book(ServiceType::DryClean, "Today", "Friday", None).unwrap();
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total_amount, 149.0);
    }

    #[test]
    fn test_external_status_change_is_announced() {
        let session = session(Some("p1"));
        let order = session.book(ServiceType::WashIron, "Today", "Friday", None).unwrap();
        session.view().track(order.id).unwrap();

        session
            .handler()
            .override_status(order.id, OrderStatus::InProcessing, Some(&Principal::operator("admin")))
            .unwrap();

        let view = session.view();
        let active = view.notifications().active(Utc::now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, format!("Order {} is now Processing", order.order_number));
        assert_eq!(view.tracking().map(|o| o.status), Some(OrderStatus::InProcessing));
    }

    #[test]
    fn test_cancel_moves_order_to_past() {
        let session = session(Some("p1"));
        let order = session.book(ServiceType::ShoeWash, "Today", "Friday", None).unwrap();

        let cancelled = session.cancel(order.id, Some("Travelling".to_string())).unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        let view = session.view();
        assert!(view.active_orders().is_empty());
        assert_eq!(view.past_orders().len(), 1);
    }

    #[test]
    fn test_cannot_cancel_someone_elses_order() {
        let session = session(Some("p1"));
        let mut draft = session.view().draft(ServiceType::WashFold, "Today", "Friday", None);
        draft.customer_id = "c2".to_string();
        let other = session.handler().create_order(draft, None).unwrap();

        assert_eq!(session.cancel(other.id, None), Err(OrderError::NotFound(other.id)));
        assert_eq!(session.store().get(other.id).unwrap().status, OrderStatus::PartnerAssigned);
    }

    #[test]
    fn test_stop_tracking_then_detach() {
        let session = session(Some("p1"));
        let order = session.book(ServiceType::SteamIron, "Today", "Friday", None).unwrap();
        session.view().track(order.id).unwrap();
        session.view().stop_tracking();
        assert!(session.view().tracking().is_none());

        let store = session.store().clone();
        let view = session.shared_view();
        session.detach();

        // No longer subscribed: later writes leave the view untouched
        store.replace(
            Order {
                notes: Some("Leave at door".to_string()),
                ..order.clone()
            },
            Some(&Principal::operator("admin")),
        );
        let view = view.lock();
        assert!(view.notifications().is_empty());
        assert_eq!(view.active_orders()[0].notes, None);
    }
}
