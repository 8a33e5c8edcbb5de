use chrono::Utc;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Principal;
use crate::events::Aggregate;
use crate::metrics::Metrics;
use crate::store::OrderStore;

use super::aggregate::{apply_transition, Order};
use super::commands::TransitionInput;
use super::errors::OrderError;
use super::events::{OrderCreated, OrderEvent};
use super::tracking::TrackingIdGenerator;
use super::value_objects::{OrderDraft, OrderStatus, PaymentStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// The write path into the store:
//   createOrder: draft -> validate -> tracking code -> OrderCreated -> insert
//   advance:     load -> state machine -> replace, all under the write gate
//   updateOrder: replace as-is (last write wins)
//
// Every write carries the acting principal so subscribers can tell their own
// changes from external ones.
//
// ============================================================================

#[derive(Clone)]
pub struct OrderCommandHandler {
    store: Arc<OrderStore>,
    generator: TrackingIdGenerator,
    metrics: Option<Arc<Metrics>>,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<OrderStore>, generator: TrackingIdGenerator) -> Self {
        Self {
            store,
            generator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    /// Validate a booking, give it a fresh tracking code and insert it.
    ///
    /// Orders with a partner start in PARTNER_ASSIGNED, all others in CREATED.
    pub fn create_order(&self, draft: OrderDraft, origin: Option<&Principal>) -> Result<Order, OrderError> {
        let service_type = draft.service_type.ok_or(OrderError::MissingField("serviceType"))?;
        if draft.customer_id.trim().is_empty() {
            return Err(OrderError::MissingField("customerId"));
        }
        if draft.customer_name.trim().is_empty() {
            return Err(OrderError::MissingField("customerName"));
        }

        let total_amount = draft.total_amount.unwrap_or_else(|| service_type.base_price());
        if !total_amount.is_finite() || total_amount < 0.0 {
            return Err(OrderError::InvalidAmount(total_amount));
        }

        let generated = self
            .generator
            .generate_unique(|candidate| self.store.contains_order_number(candidate));
        if let Some(metrics) = &self.metrics {
            metrics.record_tracking_collisions(generated.collisions);
        }

        let partner_id = draft.partner_id.filter(|p| !p.trim().is_empty());
        let status = if partner_id.is_some() {
            OrderStatus::PartnerAssigned
        } else {
            OrderStatus::Created
        };

        let created = OrderEvent::Created(OrderCreated {
            order_id: Uuid::now_v7(),
            order_number: generated.code,
            customer_id: draft.customer_id,
            customer_name: draft.customer_name,
            customer_phone: draft.customer_phone,
            address: draft.address,
            service_type,
            total_amount,
            payment_status: draft.payment_status.unwrap_or(PaymentStatus::Pending),
            partner_id,
            status,
            pickup_time: draft.pickup_time,
            delivery_time: draft.delivery_time,
            notes: draft.notes,
            created_at: Utc::now(),
        });
        let order = Order::apply_first_event(&created)?;

        self.store.insert(order.clone(), origin);

        if let Some(metrics) = &self.metrics {
            metrics.record_order_created(service_type.display_name());
        }
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            service = %service_type,
            status = %order.status,
            origin = ?origin,
            "✅ Order created"
        );

        Ok(order)
    }

    /// Replace the stored record wholesale.
    ///
    /// Returns `false` when no order with that id exists; nothing is written.
    pub fn update_order(&self, order: Order, origin: Option<&Principal>) -> bool {
        self.store.replace(order, origin)
    }

    /// Run one state machine transition against the stored order.
    ///
    /// The transition is validated against the stored state under the store's
    /// write gate, so a concurrent write can never be overwritten by a
    /// transition computed from a stale copy.
    pub fn advance(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        input: TransitionInput,
        origin: Option<&Principal>,
    ) -> Result<Order, OrderError> {
        let now = Utc::now();
        let (previous, updated) = self
            .store
            .update(order_id, origin, |current| {
                apply_transition(current, target, input, now)
                    .inspect_err(|e| self.record_rejection(current, target, origin, e))
            })
            .ok_or(OrderError::NotFound(order_id))??;

        self.record_transition(&previous, &updated, origin);
        Ok(updated)
    }

    pub fn cancel(&self, order_id: Uuid, reason: Option<String>, origin: Option<&Principal>) -> Result<Order, OrderError> {
        self.advance(order_id, OrderStatus::Cancelled, TransitionInput::cancel(reason), origin)
    }

    /// Operator override: set `status` directly, skipping the single-step rule.
    ///
    /// No timestamps or other fields are touched. `None` when the id is unknown.
    pub fn override_status(&self, order_id: Uuid, status: OrderStatus, origin: Option<&Principal>) -> Option<Order> {
        let (previous, order) = self
            .store
            .update(order_id, origin, |current| {
                Ok::<_, Infallible>(Order {
                    status,
                    ..current.clone()
                })
            })?
            .ok()?;

        if let Some(metrics) = &self.metrics {
            metrics.status_overrides.inc();
        }
        tracing::info!(
            order_number = %order.order_number,
            from = %previous.status,
            to = %status,
            origin = ?origin,
            "🛠️  Status overridden"
        );

        Some(order)
    }

    /// Point the order at another partner (or none).
    ///
    /// A CREATED order given a partner moves to PARTNER_ASSIGNED through the
    /// state machine; other open orders keep their status. Delivered and
    /// cancelled orders are closed to reassignment, and only a CREATED order
    /// may be left without a partner.
    pub fn assign_partner(
        &self,
        order_id: Uuid,
        partner_id: Option<String>,
        origin: Option<&Principal>,
    ) -> Result<Order, OrderError> {
        let now = Utc::now();
        let (previous, updated) = self
            .store
            .update(order_id, origin, |current| {
                let result = match (current.status, partner_id) {
                    (status, _) if status.is_terminal() => Err(OrderError::Closed(status)),
                    (OrderStatus::Created, Some(partner)) => apply_transition(
                        current,
                        OrderStatus::PartnerAssigned,
                        TransitionInput::assign(partner),
                        now,
                    ),
                    (OrderStatus::Created, None) => Ok(current.clone()),
                    (_, None) => Err(OrderError::MissingField("partnerId")),
                    (_, Some(partner)) => Ok(Order {
                        partner_id: Some(partner),
                        ..current.clone()
                    }),
                };
                result.inspect_err(|e| {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_rejected_transition(e.reason());
                    }
                    tracing::warn!(
                        order_number = %current.order_number,
                        status = %current.status,
                        origin = ?origin,
                        error = %e,
                        "Reassignment rejected"
                    );
                })
            })
            .ok_or(OrderError::NotFound(order_id))??;

        if previous.status != updated.status {
            self.record_transition(&previous, &updated, origin);
        }
        tracing::info!(
            order_number = %updated.order_number,
            from = ?previous.partner_id,
            to = ?updated.partner_id,
            origin = ?origin,
            "Partner reassigned"
        );

        Ok(updated)
    }

    fn record_transition(&self, previous: &Order, updated: &Order, origin: Option<&Principal>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_transition(previous.status.as_str(), updated.status.as_str());
        }
        tracing::info!(
            order_number = %updated.order_number,
            from = %previous.status,
            to = %updated.status,
            origin = ?origin,
            "🔄 Order transitioned"
        );
    }

    fn record_rejection(&self, current: &Order, target: OrderStatus, origin: Option<&Principal>, e: &OrderError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejected_transition(e.reason());
        }
        tracing::warn!(
            order_number = %current.order_number,
            from = %current.status,
            to = %target,
            origin = ?origin,
            error = %e,
            "Transition rejected"
        );
    }
}
