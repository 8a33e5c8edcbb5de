use actix::prelude::*;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::views::RoleView;

// ============================================================================
// Notification Sweeper - periodic expiry for every attached view
// ============================================================================

/// Anything holding notifications that can lapse.
pub trait ExpiringNotifications: Send + Sync {
    fn expire_notifications(&self, now: chrono::DateTime<Utc>) -> usize;
}

impl<V: RoleView> ExpiringNotifications for Mutex<V> {
    fn expire_notifications(&self, now: chrono::DateTime<Utc>) -> usize {
        self.lock().notifications_mut().expire(now)
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Watch(pub Arc<dyn ExpiringNotifications>);

/// Forces a sweep and reports how many notifications were dropped.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct SweepNow;

pub struct NotificationSweeper {
    interval: Duration,
    targets: Vec<Arc<dyn ExpiringNotifications>>,
}

impl NotificationSweeper {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            targets: Vec::new(),
        }
    }

    fn sweep(&self) -> usize {
        let now = Utc::now();
        let expired: usize = self.targets.iter().map(|t| t.expire_notifications(now)).sum();
        if expired > 0 {
            tracing::debug!(expired = expired, "Expired notifications");
        }
        expired
    }
}

impl Actor for NotificationSweeper {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "NotificationSweeper started");

        ctx.run_interval(self.interval, |act, _ctx| {
            act.sweep();
        });
    }
}

impl Handler<Watch> for NotificationSweeper {
    type Result = ();

    fn handle(&mut self, msg: Watch, _: &mut Self::Context) {
        self.targets.push(msg.0);
    }
}

impl Handler<SweepNow> for NotificationSweeper {
    type Result = usize;

    fn handle(&mut self, _msg: SweepNow, _: &mut Self::Context) -> usize {
        self.sweep()
    }
}
