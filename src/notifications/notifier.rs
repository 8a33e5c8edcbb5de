use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Notification Center - transient, auto-expiring alerts for one view
// ============================================================================

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub ttl: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An order entered the view (new booking, new assignment).
    Appeared,
    /// An order the view owned or watched left it (reassignment).
    Disappeared,
    /// Another actor changed the status of an order the view shows.
    StatusChanged,
    /// A transition the view attempted was refused.
    CommitRejected,
    /// Delivery acknowledged.
    Completed,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Appeared => "appeared",
            NotificationKind::Disappeared => "disappeared",
            NotificationKind::StatusChanged => "status_changed",
            NotificationKind::CommitRejected => "commit_rejected",
            NotificationKind::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub order_id: Uuid,
    pub order_number: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Holds the notifications a view is currently showing.
///
/// Expiry only drops the alert; it never touches order data.
#[derive(Debug)]
pub struct NotificationCenter {
    ttl: chrono::Duration,
    items: Vec<Notification>,
    next_id: u64,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(&NotificationConfig::default())
    }
}

impl NotificationCenter {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            ttl: chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX),
            items: Vec::new(),
            next_id: 1,
        }
    }

    pub fn push(
        &mut self,
        kind: NotificationKind,
        order_id: Uuid,
        order_number: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> &Notification {
        let id = self.next_id;
        self.next_id += 1;

        let notification = Notification {
            id,
            kind,
            order_id,
            order_number: order_number.to_string(),
            message: message.into(),
            raised_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        tracing::info!(
            kind = kind.as_str(),
            order_number = %notification.order_number,
            message = %notification.message,
            "🔔 Notification raised"
        );

        self.items.push(notification);
        &self.items[self.items.len() - 1]
    }

    /// Notifications still showing at `now`, oldest first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<&Notification> {
        self.items.iter().filter(|n| !n.is_expired(now)).collect()
    }

    /// The banner to show: the most recent unexpired notification.
    pub fn latest(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.items.iter().rev().find(|n| !n.is_expired(now))
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// Drop everything expired at `now`; returns how many were removed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|n| !n.is_expired(now));
        before - self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
