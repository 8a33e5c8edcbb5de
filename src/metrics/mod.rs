// Private module declaration
mod server;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order creation and lifecycle transitions (accepted / rejected)
// - Operator status overrides
// - Tracking code collisions
// - Store writes (size, replace against unknown ids)
// - Notifications raised per role
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the engine
pub struct Metrics {
    registry: Registry,

    // Order lifecycle
    pub orders_created: IntCounterVec,
    pub transitions: IntCounterVec,
    pub transitions_rejected: IntCounterVec,
    pub status_overrides: IntCounter,

    // Tracking codes
    pub tracking_code_collisions: IntCounter,

    // Store
    pub store_orders: IntGauge,
    pub store_replace_unknown: IntCounter,

    // Views
    pub notifications_raised: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounterVec::new(
            Opts::new("orders_created_total", "Total orders created"),
            &["service"],
        )?;
        registry.register(Box::new(orders_created.clone()))?;

        let transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Lifecycle transitions applied"),
            &["from", "to"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        let transitions_rejected = IntCounterVec::new(
            Opts::new("order_transitions_rejected_total", "Lifecycle transitions rejected"),
            &["reason"],
        )?;
        registry.register(Box::new(transitions_rejected.clone()))?;

        let status_overrides = IntCounter::new(
            "status_overrides_total",
            "Direct status overrides issued by operators",
        )?;
        registry.register(Box::new(status_overrides.clone()))?;

        let tracking_code_collisions = IntCounter::new(
            "tracking_code_collisions_total",
            "Tracking code draws rejected because the code was taken",
        )?;
        registry.register(Box::new(tracking_code_collisions.clone()))?;

        let store_orders = IntGauge::new("store_orders", "Orders currently held by the store")?;
        registry.register(Box::new(store_orders.clone()))?;

        let store_replace_unknown = IntCounter::new(
            "store_replace_unknown_total",
            "Replace calls that matched no order id",
        )?;
        registry.register(Box::new(store_replace_unknown.clone()))?;

        let notifications_raised = IntCounterVec::new(
            Opts::new("notifications_raised_total", "Notifications raised by role views"),
            &["role", "kind"],
        )?;
        registry.register(Box::new(notifications_raised.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            transitions,
            transitions_rejected,
            status_overrides,
            tracking_code_collisions,
            store_orders,
            store_replace_unknown,
            notifications_raised,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self, service: &str) {
        self.orders_created.with_label_values(&[service]).inc();
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_rejected_transition(&self, reason: &str) {
        self.transitions_rejected.with_label_values(&[reason]).inc();
    }

    pub fn record_tracking_collisions(&self, collisions: u32) {
        self.tracking_code_collisions.inc_by(u64::from(collisions));
    }

    pub fn record_notification(&self, role: &str, kind: &str) {
        self.notifications_raised.with_label_values(&[role, kind]).inc();
    }
}

// Registry and label vectors have no useful Debug output; show the scalars
impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("status_overrides", &self.status_overrides.get())
            .field("tracking_code_collisions", &self.tracking_code_collisions.get())
            .field("store_orders", &self.store_orders.get())
            .field("store_replace_unknown", &self.store_replace_unknown.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_created("Wash & Fold");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_transition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("PARTNER_ASSIGNED", "PICKED_UP");
        metrics.record_transition("PARTNER_ASSIGNED", "PICKED_UP");
        metrics.record_rejected_transition("invalid_transition");

        assert_eq!(
            metrics.transitions.with_label_values(&["PARTNER_ASSIGNED", "PICKED_UP"]).get(),
            2
        );
        assert_eq!(
            metrics.transitions_rejected.with_label_values(&["invalid_transition"]).get(),
            1
        );
    }

    #[test]
    fn test_record_collisions_and_notifications() {
        let metrics = Metrics::new().unwrap();
        metrics.record_tracking_collisions(3);
        metrics.record_tracking_collisions(0);
        metrics.record_notification("fulfillment_agent", "appeared");

        assert_eq!(metrics.tracking_code_collisions.get(), 3);
        assert_eq!(
            metrics.notifications_raised.with_label_values(&["fulfillment_agent", "appeared"]).get(),
            1
        );
    }

    #[test]
    fn test_debug_shows_scalar_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.store_orders.set(4);

        let rendered = format!("{:?}", metrics);
        assert!(rendered.starts_with("Metrics {"));
        assert!(rendered.contains("store_orders: 4"));
    }
}
