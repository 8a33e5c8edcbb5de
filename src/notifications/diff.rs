use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// Snapshot Diff - previous vs current, keyed by order id
// ============================================================================
//
// Pure function over two immutable snapshots. Each affected id lands in
// exactly one class:
//
//   NoLongerVisible  was visible (or focused), now filtered out or gone
//   StatusChanged    visible in both, status differs
//   NewlyVisible     visible now, not visible in the previous snapshot
//
// For the focused order the "before" status is the view's own copy, not the
// previous snapshot, so a change the view has not yet absorbed is reported
// even if an intermediate broadcast was coalesced.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotChange {
    NewlyVisible(Order),
    NoLongerVisible {
        id: Uuid,
        order_number: String,
        /// The record as it now stands, if it still exists at all.
        current: Option<Order>,
    },
    StatusChanged {
        from: OrderStatus,
        order: Order,
    },
}

impl SnapshotChange {
    pub fn order_id(&self) -> Uuid {
        match self {
            SnapshotChange::NewlyVisible(order) | SnapshotChange::StatusChanged { order, .. } => order.id,
            SnapshotChange::NoLongerVisible { id, .. } => *id,
        }
    }

    pub fn order_number(&self) -> &str {
        match self {
            SnapshotChange::NewlyVisible(order) | SnapshotChange::StatusChanged { order, .. } => &order.order_number,
            SnapshotChange::NoLongerVisible { order_number, .. } => order_number,
        }
    }
}

/// Classify what changed between two snapshots from one view's perspective.
///
/// `visible` is the view's filter ("assigned to me", "booked by me", ...).
/// `focus` is the view's in-memory copy of the order it is working on.
///
/// Visibility is judged against the view's previous visible set, so an order
/// reassigned to this view comes back as `NewlyVisible`.
pub fn diff_snapshots<F>(previous: &[Order], current: &[Order], visible: F, focus: Option<&Order>) -> Vec<SnapshotChange>
where
    F: Fn(&Order) -> bool,
{
    let before: HashMap<Uuid, &Order> = previous.iter().filter(|o| visible(*o)).map(|o| (o.id, o)).collect();
    let after: HashMap<Uuid, &Order> = current.iter().map(|o| (o.id, o)).collect();

    let mut changes = Vec::new();

    // Focused order first: it drives navigation in the view
    if let Some(focused) = focus {
        match after.get(&focused.id) {
            Some(now) if visible(*now) => {
                if now.status != focused.status {
                    changes.push(SnapshotChange::StatusChanged {
                        from: focused.status,
                        order: (*now).clone(),
                    });
                }
            }
            now => changes.push(SnapshotChange::NoLongerVisible {
                id: focused.id,
                order_number: focused.order_number.clone(),
                current: now.map(|o| (*o).clone()),
            }),
        }
    }
    let focus_id = focus.map(|o| o.id);

    for order in current {
        if Some(order.id) == focus_id || !visible(order) {
            continue;
        }
        match before.get(&order.id) {
            None => changes.push(SnapshotChange::NewlyVisible(order.clone())),
            Some(prev) if prev.status != order.status => changes.push(SnapshotChange::StatusChanged {
                from: prev.status,
                order: order.clone(),
            }),
            Some(_) => {}
        }
    }

    for prev in previous {
        if Some(prev.id) == focus_id || !before.contains_key(&prev.id) {
            continue;
        }
        let now = after.get(&prev.id);
        if !now.is_some_and(|o| visible(*o)) {
            changes.push(SnapshotChange::NoLongerVisible {
                id: prev.id,
                order_number: prev.order_number.clone(),
                current: now.map(|o| (*o).clone()),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::sample_order;

    fn order_for(partner: &str, status: OrderStatus) -> Order {
        let mut order = sample_order(status);
        order.id = Uuid::new_v4();
        order.partner_id = Some(partner.to_string());
        order
    }

    fn assigned_to(partner: &'static str) -> impl Fn(&Order) -> bool {
        move |o: &Order| o.is_assigned_to(partner)
    }

    #[test]
    fn test_new_assignment_from_empty_previous() {
        let o1 = order_for("X", OrderStatus::PartnerAssigned);

        let changes = diff_snapshots(&[], &[o1.clone()], assigned_to("X"), None);

        assert_eq!(changes, vec![SnapshotChange::NewlyVisible(o1)]);
    }

    #[test]
    fn test_orders_for_others_are_ignored() {
        let other = order_for("Y", OrderStatus::PartnerAssigned);
        assert!(diff_snapshots(&[], &[other], assigned_to("X"), None).is_empty());
    }

    #[test]
    fn test_unchanged_snapshot_yields_nothing() {
        let o1 = order_for("X", OrderStatus::PickedUp);
        let snapshot = vec![o1.clone()];
        assert!(diff_snapshots(&snapshot, &snapshot, assigned_to("X"), Some(&o1)).is_empty());
    }

    #[test]
    fn test_focused_cancellation_is_status_divergence() {
        let focused = order_for("X", OrderStatus::PickedUp);
        let mut cancelled = focused.clone();
        cancelled.status = OrderStatus::Cancelled;

        let changes = diff_snapshots(&[focused.clone()], &[cancelled.clone()], assigned_to("X"), Some(&focused));

        assert_eq!(
            changes,
            vec![SnapshotChange::StatusChanged {
                from: OrderStatus::PickedUp,
                order: cancelled,
            }]
        );
    }

    #[test]
    fn test_focus_copy_is_the_baseline() {
        // Previous snapshot already shows the change; the focus copy does not
        let focused = order_for("X", OrderStatus::PickedUp);
        let mut cancelled = focused.clone();
        cancelled.status = OrderStatus::Cancelled;

        let changes = diff_snapshots(&[cancelled.clone()], &[cancelled.clone()], assigned_to("X"), Some(&focused));

        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], SnapshotChange::StatusChanged { from: OrderStatus::PickedUp, .. }));
    }

    #[test]
    fn test_reassignment_is_disappearance_not_status_change() {
        let focused = order_for("X", OrderStatus::PartnerAssigned);
        let mut moved = focused.clone();
        moved.partner_id = Some("Y".to_string());
        moved.status = OrderStatus::Cancelled;

        let changes = diff_snapshots(&[focused.clone()], &[moved.clone()], assigned_to("X"), Some(&focused));

        assert_eq!(
            changes,
            vec![SnapshotChange::NoLongerVisible {
                id: focused.id,
                order_number: focused.order_number.clone(),
                current: Some(moved),
            }]
        );
    }

    #[test]
    fn test_unfocused_disappearance_and_new_arrival() {
        let leaving = order_for("X", OrderStatus::PickedUp);
        let mut left = leaving.clone();
        left.partner_id = None;
        let arriving = order_for("Y", OrderStatus::PartnerAssigned);
        let mut arrived = arriving.clone();
        arrived.partner_id = Some("X".to_string());

        let changes = diff_snapshots(
            &[leaving.clone(), arriving],
            &[left, arrived.clone()],
            assigned_to("X"),
            None,
        );

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], SnapshotChange::NewlyVisible(arrived));
        assert!(matches!(&changes[1], SnapshotChange::NoLongerVisible { id, .. } if *id == leaving.id));
    }

    #[test]
    fn test_each_id_classified_once() {
        let a = order_for("X", OrderStatus::PickedUp);
        let mut a_next = a.clone();
        a_next.status = OrderStatus::InProcessing;
        let b = order_for("X", OrderStatus::PartnerAssigned);

        let changes = diff_snapshots(&[a.clone()], &[b.clone(), a_next], assigned_to("X"), Some(&a));

        let mut ids: Vec<Uuid> = changes.iter().map(SnapshotChange::order_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), changes.len());
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_deleted_focus_reports_no_current_record() {
        let focused = order_for("X", OrderStatus::Ready);

        let changes = diff_snapshots(&[focused.clone()], &[], assigned_to("X"), Some(&focused));

        assert!(matches!(&changes[..], [SnapshotChange::NoLongerVisible { current: None, .. }]));
        assert_eq!(changes[0].order_number(), focused.order_number);
    }
}
