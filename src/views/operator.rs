use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::{RoleView, Session, ViewState};
use crate::domain::order::{Order, OrderError, OrderStatus};
use crate::domain::Principal;
use crate::events::EventEnvelope;
use crate::metrics::Metrics;
use crate::notifications::{diff_snapshots, NotificationCenter, NotificationConfig, NotificationKind, SnapshotChange};
use crate::store::{Snapshot, StoreChange};

// ============================================================================
// Operator View - every order, search/filter, direct edits
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerSummary {
    pub partner_id: String,
    pub active_orders: usize,
    pub completed_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_orders: usize,
    pub active_orders: usize,
    pub total_revenue: f64,
    pub customers: usize,
    pub partners: Vec<PartnerSummary>,
}

pub struct OperatorView {
    state: ViewState,
    search: String,
    status_filter: Option<OrderStatus>,
    editing: Option<Order>,
}

impl OperatorView {
    pub fn new(operator_id: impl Into<String>, notifications: &NotificationConfig) -> Self {
        Self {
            state: ViewState::new(Principal::operator(operator_id), notifications),
            search: String::new(),
            status_filter: None,
            editing: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.state.set_metrics(metrics);
        self
    }

    pub fn editing(&self) -> Option<&Order> {
        self.editing.as_ref()
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// `None` shows every status.
    pub fn set_status_filter(&mut self, status: Option<OrderStatus>) {
        self.status_filter = status;
    }

    /// Orders matching the search (customer name or tracking code,
    /// case-insensitive) and the status filter, most recent first.
    pub fn filtered_orders(&self) -> Vec<Order> {
        let query = self.search.to_lowercase();
        self.state
            .last_seen
            .iter()
            .filter(|o| {
                query.is_empty()
                    || o.customer_name.to_lowercase().contains(&query)
                    || o.order_number.to_lowercase().contains(&query)
            })
            .filter(|o| self.status_filter.map_or(true, |s| o.status == s))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> DashboardStats {
        let orders = &self.state.last_seen;
        let customers: HashSet<&str> = orders.iter().map(|o| o.customer_id.as_str()).collect();

        let mut partners: BTreeMap<&str, PartnerSummary> = BTreeMap::new();
        for order in orders.iter() {
            let Some(partner_id) = order.partner_id.as_deref() else {
                continue;
            };
            let summary = partners.entry(partner_id).or_insert_with(|| PartnerSummary {
                partner_id: partner_id.to_string(),
                active_orders: 0,
                completed_orders: 0,
            });
            if order.status == OrderStatus::Delivered {
                summary.completed_orders += 1;
            } else {
                summary.active_orders += 1;
            }
        }

        DashboardStats {
            total_orders: orders.len(),
            active_orders: orders.iter().filter(|o| o.is_active()).count(),
            total_revenue: orders.iter().map(|o| o.total_amount).sum(),
            customers: customers.len(),
            partners: partners.into_values().collect(),
        }
    }

    /// Open an order in the editor.
    pub fn edit(&mut self, order_id: Uuid) -> Result<&Order, OrderError> {
        let order = self.state.find(order_id).cloned().ok_or(OrderError::NotFound(order_id))?;
        Ok(self.editing.insert(order))
    }

    /// Local edits to the open order, written back by `save_editing`.
    pub fn editing_mut(&mut self) -> Option<&mut Order> {
        self.editing.as_mut()
    }

    pub fn close_editor(&mut self) {
        self.editing = None;
    }

    fn handle(&mut self, change: SnapshotChange, now: DateTime<Utc>) {
        let editing_id = self.editing.as_ref().map(|o| o.id);

        match change {
            SnapshotChange::NewlyVisible(order) => self.state.raise(
                NotificationKind::Appeared,
                order.id,
                &order.order_number,
                format!("🆕 New order {} from {}", order.order_number, order.customer_name),
                now,
            ),
            SnapshotChange::StatusChanged { from, order } if editing_id == Some(order.id) => {
                self.state.raise(
                    NotificationKind::StatusChanged,
                    order.id,
                    &order.order_number,
                    format!(
                        "⚠️ Order {} changed from {} to {} while open",
                        order.order_number,
                        from.label(),
                        order.status.label()
                    ),
                    now,
                );
                self.editing = Some(order);
            }
            SnapshotChange::StatusChanged { .. } => {}
            SnapshotChange::NoLongerVisible { id, order_number, .. } => {
                self.state.raise(
                    NotificationKind::Disappeared,
                    id,
                    &order_number,
                    format!("🚨 Order {order_number} is no longer available"),
                    now,
                );
                if editing_id == Some(id) {
                    self.editing = None;
                }
            }
        }
    }
}

impl RoleView for OperatorView {
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

        let changes = diff_snapshots(&self.state.last_seen, snapshot, |_| true, self.editing.as_ref());
        self.state.last_seen = snapshot.clone();

        if change.originated_by(&self.state.principal) {
            // Our own save or override: the stored record is the new baseline
            if let Some(id) = self.editing.as_ref().map(|o| o.id) {
                self.editing = self.state.find(id).cloned();
            }
            return;
        }

        for c in changes {
            self.handle(c, change.timestamp);
        }
    }

    fn notifications(&self) -> &NotificationCenter {
        &self.state.notifications
    }

    fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.state.notifications
    }
}

impl Session<OperatorView> {
    /// Set any status directly, bypassing the single-step rule.
    pub fn override_status(&self, order_id: Uuid, status: OrderStatus) -> Option<Order> {
        let origin = self.principal();
        self.handler().override_status(order_id, status, Some(&origin))
    }

    pub fn reassign(&self, order_id: Uuid, partner_id: Option<String>) -> Result<Order, OrderError> {
        let origin = self.principal();
        self.handler().assign_partner(order_id, partner_id, Some(&origin))
    }

    /// Save the editor's copy back to the store as-is.
    pub fn save_editing(&self) -> bool {
        let Some(order) = self.view().editing().cloned() else {
            return false;
        };
        let origin = self.principal();
        self.handler().update_order(order, Some(&origin))
    }
}
