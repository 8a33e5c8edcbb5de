use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::{RoleView, Session, ViewState};
use crate::domain::order::{Order, OrderError, OrderStatus, PickupDetails, TransitionInput};
use crate::domain::Principal;
use crate::events::EventEnvelope;
use crate::gesture::{CommitGestureController, CommitRequest, GestureConfig, GestureOutcome, GesturePhase};
use crate::metrics::Metrics;
use crate::notifications::{diff_snapshots, NotificationCenter, NotificationConfig, NotificationKind, SnapshotChange};
use crate::store::{Snapshot, StoreChange};

// ============================================================================
// Fulfillment Agent View
// ============================================================================
//
// Screens: List -> Detail -> (Completed) -> List
//
// Sees only orders assigned to its partner id. While an order is open:
// - another actor changing its status replaces the local copy and alerts
//   (cancellation gets its own warning)
// - losing the assignment drops focus and returns to the list
// - the commit gesture is bound to the order's next status and stays
//   disabled until that transition's input is complete
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentScreen {
    List,
    Detail,
    /// Delivery acknowledgment, shown until the completion delay elapses.
    Completed,
}

pub struct FulfillmentView {
    state: ViewState,
    partner_id: String,
    screen: AgentScreen,
    focus: Option<Order>,
    pickup_form: PickupDetails,
    /// Pickup form as it stood when the gesture armed; edits after that wait
    /// for the next gesture.
    armed_pickup: Option<PickupDetails>,
    gesture: CommitGestureController,
}

impl FulfillmentView {
    pub fn new(partner_id: impl Into<String>, notifications: &NotificationConfig, gesture: GestureConfig) -> Self {
        let partner_id = partner_id.into();
        Self {
            state: ViewState::new(Principal::agent(partner_id.clone()), notifications),
            partner_id,
            screen: AgentScreen::List,
            focus: None,
            pickup_form: PickupDetails::default(),
            armed_pickup: None,
            gesture: CommitGestureController::new(gesture),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.state.set_metrics(metrics);
        self
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    pub fn screen(&self) -> AgentScreen {
        self.screen
    }

    pub fn focus(&self) -> Option<&Order> {
        self.focus.as_ref()
    }

    pub fn pickup_form(&self) -> &PickupDetails {
        &self.pickup_form
    }

    pub fn gesture(&self) -> &CommitGestureController {
        &self.gesture
    }

    /// Non-terminal orders assigned to this agent.
    pub fn active_tasks(&self) -> Vec<Order> {
        self.assigned().filter(|o| o.is_active()).cloned().collect()
    }

    /// Delivered or cancelled orders assigned to this agent.
    pub fn past_tasks(&self) -> Vec<Order> {
        self.assigned().filter(|o| !o.is_active()).cloned().collect()
    }

    fn assigned(&self) -> impl Iterator<Item = &Order> {
        self.state.last_seen.iter().filter(|o| o.is_assigned_to(&self.partner_id))
    }

    /// Open an assigned order. A PARTNER_ASSIGNED order gets a fresh pickup
    /// form with the time preset to `now`.
    pub fn select(&mut self, order_id: Uuid, now: DateTime<Utc>) -> Result<(), OrderError> {
        let order = self
            .assigned()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or(OrderError::NotFound(order_id))?;

        self.pickup_form = PickupDetails {
            actual_pickup_time: (order.status == OrderStatus::PartnerAssigned).then_some(now),
            ..PickupDetails::default()
        };
        self.focus = Some(order);
        self.screen = AgentScreen::Detail;
        self.rebind_gesture();
        Ok(())
    }

    pub fn update_pickup_form(&mut self, form: PickupDetails) {
        self.pickup_form = form;
        self.refresh_gesture_gate();
    }

    pub fn drag(&mut self, offset: f64) -> GesturePhase {
        self.gesture.drag(offset)
    }

    pub fn release(&mut self, now: Instant) -> GestureOutcome {
        let outcome = self.gesture.release(now);
        if matches!(outcome, GestureOutcome::Armed { .. }) {
            self.armed_pickup = Some(self.pickup_form.clone());
        }
        outcome
    }

    /// The transition to apply if the armed gesture is due at `now`.
    pub fn take_due_commit(&mut self, now: Instant) -> Option<(CommitRequest, TransitionInput)> {
        let request = self.gesture.poll(now)?;
        let armed_pickup = self.armed_pickup.take();
        let input = match request.target {
            OrderStatus::PickedUp => {
                TransitionInput::pickup(armed_pickup.unwrap_or_else(|| self.pickup_form.clone()))
            }
            OrderStatus::PartnerAssigned => TransitionInput::assign(self.partner_id.clone()),
            _ => TransitionInput::none(),
        };
        Some((request, input))
    }

    /// Record the result of a commit issued from [`Self::take_due_commit`].
    pub fn finish_commit(&mut self, result: Result<Order, OrderError>, now: DateTime<Utc>) -> AgentScreen {
        match result {
            Ok(order) => {
                let delivered = order.status == OrderStatus::Delivered;
                if delivered {
                    self.state.raise(
                        NotificationKind::Completed,
                        order.id,
                        &order.order_number,
                        format!("✅ Order {} delivered", order.order_number),
                        now,
                    );
                    self.screen = AgentScreen::Completed;
                }
                self.focus = Some(order);
                self.pickup_form = PickupDetails::default();
                self.rebind_gesture();
            }
            Err(e) => {
                let (id, number) = self
                    .focus
                    .as_ref()
                    .map(|o| (o.id, o.order_number.clone()))
                    .unwrap_or_default();
                self.state
                    .raise(NotificationKind::CommitRejected, id, &number, format!("❌ {e}"), now);
                self.armed_pickup = None;
                self.gesture.reset();
            }
        }
        self.screen
    }

    /// Leave the delivery acknowledgment for the list.
    pub fn acknowledge_completion(&mut self) {
        if self.screen == AgentScreen::Completed {
            self.back_to_list();
        }
    }

    pub fn back_to_list(&mut self) {
        self.screen = AgentScreen::List;
        self.focus = None;
        self.pickup_form = PickupDetails::default();
        self.armed_pickup = None;
        self.gesture.unbind();
    }

    fn rebind_gesture(&mut self) {
        self.armed_pickup = None;
        match self.focus.as_ref().and_then(|o| o.next_status().map(|next| (o.id, next))) {
            Some((id, next)) => self.gesture.bind(id, next),
            None => self.gesture.unbind(),
        }
        self.refresh_gesture_gate();
    }

    fn refresh_gesture_gate(&mut self) {
        let enabled = match self.gesture.binding() {
            Some(CommitRequest {
                target: OrderStatus::PickedUp,
                ..
            }) => self.pickup_form.is_complete(),
            Some(_) => true,
            None => false,
        };
        self.gesture.set_enabled(enabled);
    }

    fn handle(&mut self, change: SnapshotChange, external: bool, now: DateTime<Utc>) {
        let focus_id = self.focus.as_ref().map(|o| o.id);
        let is_focus = Some(change.order_id()) == focus_id;

        match change {
            SnapshotChange::NewlyVisible(order) => {
                if external {
                    self.state.raise(
                        NotificationKind::Appeared,
                        order.id,
                        &order.order_number,
                        format!("🆕 New task assigned: {}", order.order_number),
                        now,
                    );
                }
            }
            SnapshotChange::StatusChanged { order, .. } if is_focus => {
                if external {
                    let message = if order.status == OrderStatus::Cancelled {
                        format!("⚠️ Order {} was cancelled", order.order_number)
                    } else {
                        format!("Order {} is now {}", order.order_number, order.status.label())
                    };
                    self.state
                        .raise(NotificationKind::StatusChanged, order.id, &order.order_number, message, now);
                }
                self.focus = Some(order);
                self.rebind_gesture();
            }
            SnapshotChange::StatusChanged { .. } => {}
            SnapshotChange::NoLongerVisible { id, order_number, .. } => {
                if external {
                    self.state.raise(
                        NotificationKind::Disappeared,
                        id,
                        &order_number,
                        format!("🚨 Order {order_number} has been reassigned to another partner"),
                        now,
                    );
                }
                if is_focus {
                    self.back_to_list();
                }
            }
        }
    }
}

impl RoleView for FulfillmentView {
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
        let external = !change.originated_by(&self.state.principal);

        let partner_id = self.partner_id.clone();
        let changes = diff_snapshots(
            &self.state.last_seen,
            snapshot,
            |o| o.is_assigned_to(&partner_id),
            self.focus.as_ref(),
        );
        self.state.last_seen = snapshot.clone();

        for c in changes {
            self.handle(c, external, change.timestamp);
        }

        // Pick up non-status edits to the open order
        if let Some(id) = self.focus.as_ref().map(|o| o.id) {
            self.focus = self.state.find(id).cloned();
        }
    }

    fn notifications(&self) -> &NotificationCenter {
        &self.state.notifications
    }

    fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.state.notifications
    }
}

// ============================================================================
// Session - agent actions that write to the store
// ============================================================================

impl Session<FulfillmentView> {
    /// Apply the armed gesture's transition if it is due.
    ///
    /// Returns the screen the view ends up on, or `None` when nothing was due.
    pub fn commit_due(&self, now: Instant) -> Option<AgentScreen> {
        let (request, input) = self.view().take_due_commit(now)?;
        let origin = self.principal();

        let result = self.handler().advance(request.order_id, request.target, input, Some(&origin));

        Some(self.view().finish_commit(result, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::sample_order;
    use crate::events::EventEnvelope;
    use std::time::Duration;

    fn view() -> FulfillmentView {
        FulfillmentView::new("X", &NotificationConfig::default(), GestureConfig::default())
    }

    fn assigned(partner: &str, status: OrderStatus) -> Order {
        let mut order = sample_order(status);
        order.id = Uuid::new_v4();
        order.partner_id = Some(partner.to_string());
        order
    }

    fn broadcast(seq: i64, order: &Order, origin: Option<Principal>) -> EventEnvelope<StoreChange> {
        let change = StoreChange::Inserted {
            order_number: order.order_number.clone(),
            status: order.status,
        };
        EventEnvelope::new(order.id, seq, change, Utc::now()).with_origin(origin)
    }

    #[test]
    fn test_initial_load_raises_nothing() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::PartnerAssigned);
        view.seed(&Arc::new(vec![o1.clone()]));

        assert!(view.notifications().is_empty());
        assert_eq!(view.active_tasks(), vec![o1]);
    }

    #[test]
    fn test_new_assignment_raises_one_alert() {
        let mut view = view();
        view.seed(&Arc::new(vec![]));
        let o1 = assigned("X", OrderStatus::PartnerAssigned);

        view.observe(&broadcast(1, &o1, None), &Arc::new(vec![o1.clone()]));

        let active = view.notifications().active(Utc::now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, NotificationKind::Appeared);
        assert_eq!(active[0].order_id, o1.id);
        assert!(active[0].message.contains(&o1.order_number));
    }

    #[test]
    fn test_focused_cancellation_replaces_copy() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::PickedUp);
        view.seed(&Arc::new(vec![o1.clone()]));
        view.select(o1.id, Utc::now()).unwrap();

        let mut cancelled = o1.clone();
        cancelled.status = OrderStatus::Cancelled;
        view.observe(
            &broadcast(1, &cancelled, Some(Principal::requester("c1"))),
            &Arc::new(vec![cancelled.clone()]),
        );

        let active = view.notifications().active(Utc::now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, NotificationKind::StatusChanged);
        assert!(active[0].message.contains("cancelled"));
        assert_eq!(view.focus().map(|o| o.status), Some(OrderStatus::Cancelled));
        assert_eq!(view.screen(), AgentScreen::Detail);
        assert!(!view.gesture().is_enabled());
    }

    #[test]
    fn test_reassignment_returns_to_list() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::PartnerAssigned);
        view.seed(&Arc::new(vec![o1.clone()]));
        view.select(o1.id, Utc::now()).unwrap();

        let mut moved = o1.clone();
        moved.partner_id = Some("Y".to_string());
        view.observe(&broadcast(1, &moved, Some(Principal::operator("admin"))), &Arc::new(vec![moved]));

        assert_eq!(view.screen(), AgentScreen::List);
        assert!(view.focus().is_none());
        let active = view.notifications().active(Utc::now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, NotificationKind::Disappeared);
        assert!(view.active_tasks().is_empty());
    }

    #[test]
    fn test_own_changes_are_silent() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::PickedUp);
        view.seed(&Arc::new(vec![o1.clone()]));
        view.select(o1.id, Utc::now()).unwrap();

        let mut next = o1.clone();
        next.status = OrderStatus::InProcessing;
        view.observe(&broadcast(1, &next, Some(Principal::agent("X"))), &Arc::new(vec![next.clone()]));

        assert!(view.notifications().is_empty());
        assert_eq!(view.focus(), Some(&next));
        assert_eq!(view.gesture().binding().map(|b| b.target), Some(OrderStatus::Ready));
    }

    #[test]
    fn test_stale_broadcast_is_ignored() {
        let mut view = view();
        view.seed(&Arc::new(vec![]));
        let o1 = assigned("X", OrderStatus::PartnerAssigned);
        let o2 = assigned("X", OrderStatus::PartnerAssigned);

        view.observe(&broadcast(2, &o2, None), &Arc::new(vec![o2.clone(), o1.clone()]));
        view.observe(&broadcast(1, &o1, None), &Arc::new(vec![o1.clone()]));

        assert_eq!(view.active_tasks().len(), 2);
        assert_eq!(view.notifications().len(), 2);
    }

    #[test]
    fn test_pickup_form_gates_gesture() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::PartnerAssigned);
        view.seed(&Arc::new(vec![o1.clone()]));
        let now = Utc::now();
        view.select(o1.id, now).unwrap();

        assert_eq!(view.pickup_form().actual_pickup_time, Some(now));
        assert!(!view.gesture().is_enabled());
        assert_eq!(view.drag(500.0), GesturePhase::Idle);

        view.update_pickup_form(PickupDetails::new(12, 0, now));
        assert!(view.gesture().is_enabled());
        view.drag(500.0);
        let t0 = Instant::now();
        assert!(matches!(view.release(t0), GestureOutcome::Armed { .. }));

        assert!(view.take_due_commit(t0).is_none());
        let (request, input) = view.take_due_commit(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(request.target, OrderStatus::PickedUp);
        assert_eq!(input.pickup, Some(PickupDetails::new(12, 0, now)));
    }

    #[test]
    fn test_select_requires_assignment() {
        let mut view = view();
        let other = assigned("Y", OrderStatus::PartnerAssigned);
        view.seed(&Arc::new(vec![other.clone()]));

        assert_eq!(view.select(other.id, Utc::now()), Err(OrderError::NotFound(other.id)));
    }

    #[test]
    fn test_delivery_shows_completion_until_acknowledged() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::OutForDelivery);
        view.seed(&Arc::new(vec![o1.clone()]));
        view.select(o1.id, Utc::now()).unwrap();

        let mut delivered = o1.clone();
        delivered.status = OrderStatus::Delivered;
        assert_eq!(view.finish_commit(Ok(delivered), Utc::now()), AgentScreen::Completed);
        assert!(!view.gesture().is_enabled());

        view.acknowledge_completion();
        assert_eq!(view.screen(), AgentScreen::List);
        assert!(view.focus().is_none());
    }

    #[test]
    fn test_rejected_commit_is_reported() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::Ready);
        view.seed(&Arc::new(vec![o1.clone()]));
        view.select(o1.id, Utc::now()).unwrap();

        let err = OrderError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::OutForDelivery,
        };
        assert_eq!(view.finish_commit(Err(err), Utc::now()), AgentScreen::Detail);

        let active = view.notifications().active(Utc::now());
        assert_eq!(active[0].kind, NotificationKind::CommitRejected);
        assert_eq!(view.gesture().phase(), GesturePhase::Idle);
    }

    #[test]
    fn test_form_edits_after_arming_do_not_change_commit() {
        let mut view = view();
        let o1 = assigned("X", OrderStatus::PartnerAssigned);
        view.seed(&Arc::new(vec![o1.clone()]));
        let now = Utc::now();
        view.select(o1.id, now).unwrap();

        view.update_pickup_form(PickupDetails::new(12, 0, now));
        view.drag(500.0);
        let t0 = Instant::now();
        assert!(matches!(view.release(t0), GestureOutcome::Armed { .. }));

        view.update_pickup_form(PickupDetails::new(3, 3, now));
        assert_eq!(view.pickup_form(), &PickupDetails::new(3, 3, now));

        let (_, input) = view.take_due_commit(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(input.pickup, Some(PickupDetails::new(12, 0, now)));
    }
}
