use actix::prelude::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use laundro_sync::actors::{
    AgentSessionActor, DragGesture, GetAgentState, NotificationSweeper, ReleaseGesture, SelectOrder,
    UpdatePickupForm, Watch,
};
use laundro_sync::domain::order::{OrderStatus, PickupDetails, ServiceType, TrackingIdGenerator};
use laundro_sync::metrics::{self, Metrics};
use laundro_sync::store::{restore_or_seed, seed_orders, JsonFileRepository, OrderStore, SnapshotMirror};
use laundro_sync::views::{FulfillmentView, OperatorView, RequesterProfile, RequesterView, Session};
use laundro_sync::{AppConfig, OrderCommandHandler};

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,laundro_sync=debug")))
        .init();

    tracing::info!("🚀 Starting laundro_sync demo");

    let config = AppConfig::from_env()?;

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Order store, restored from the snapshot when there is one ===
    let orders = match &config.snapshot_path {
        Some(path) => restore_or_seed(&JsonFileRepository::new(path.clone())),
        None => seed_orders(),
    };
    let store = Arc::new(OrderStore::with_orders(orders).with_metrics(metrics.clone()));
    if let Some(path) = &config.snapshot_path {
        store.subscribe(Arc::new(SnapshotMirror::new(JsonFileRepository::new(path.clone()))));
        tracing::info!(path = %path.display(), "💾 Mirroring orders to snapshot");
    }

    // Metrics HTTP server runs on its own runtime
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_store = store.clone();
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Metrics runtime error: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_store, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    let handler = OrderCommandHandler::new(store.clone(), TrackingIdGenerator::new(config.tracking.clone()))
        .with_metrics(metrics.clone());

    // === 3. Attach one view per role ===
    let operator = Session::attach(
        handler.clone(),
        OperatorView::new("admin", &config.notifications).with_metrics(metrics.clone()),
    );
    let requester = Session::attach(
        handler.clone(),
        RequesterView::new(
            RequesterProfile {
                customer_id: "c1".to_string(),
                name: "Rahul Sharma".to_string(),
                phone: "+91 9123456780".to_string(),
                address: "Flat 402, Sunshine Apts, Mumbai".to_string(),
            },
            config.default_partner.clone(),
            &config.notifications,
        )
        .with_metrics(metrics.clone()),
    );
    let partner_id = config.default_partner.clone().unwrap_or_else(|| "p1".to_string());
    let agent_session = Session::attach(
        handler.clone(),
        FulfillmentView::new(partner_id.clone(), &config.notifications, config.gesture.clone())
            .with_metrics(metrics.clone()),
    );

    let sweeper = NotificationSweeper::new(Duration::from_millis(500)).start();
    sweeper.send(Watch(operator.shared_view())).await?;
    sweeper.send(Watch(requester.shared_view())).await?;
    sweeper.send(Watch(agent_session.shared_view())).await?;

    let agent = AgentSessionActor::new(agent_session, config.completion_delay).start();

    // === 4. Walk one order through its lifecycle ===
    tracing::info!("📝 Demonstrating the order lifecycle across roles");

    let order = requester.book(ServiceType::WashFold, "Tomorrow, 10:00 AM", "2 Days later, 06:00 PM", None)?;
    tracing::info!(order_number = %order.order_number, status = %order.status, "Requester booked");

    if order.status == OrderStatus::Created {
        operator.reassign(order.id, Some(partner_id.clone()))?;
    }

    // Agent: pickup with counts, then every later stage, one swipe each
    agent.send(SelectOrder { order_id: order.id }).await??;
    agent
        .send(UpdatePickupForm(PickupDetails::new(12, 0, Utc::now())))
        .await?;

    let settle = config.gesture.settle_delay + Duration::from_millis(100);
    for _ in 0..OrderStatus::SEQUENCE.len() {
        let state = agent.send(GetAgentState).await?;
        if !state.gesture_enabled {
            break;
        }
        tracing::info!(label = ?state.gesture_label, "Agent swipes");
        agent.send(DragGesture { offset: config.gesture.threshold }).await?;
        agent.send(ReleaseGesture).await?;
        actix::clock::sleep(settle).await;
    }

    let final_state = store.get(order.id);
    if let Some(done) = &final_state {
        tracing::info!(
            order_number = %done.order_number,
            status = %done.status,
            payment = ?done.payment_status,
            picked_up = ?done.actual_pickup_time,
            ready = ?done.ready_at_time,
            delivered = ?done.actual_delivery_time,
            "✅ Lifecycle finished"
        );
    }

    // Let the delivery acknowledgment run out
    actix::clock::sleep(config.completion_delay).await;
    let state = agent.send(GetAgentState).await?;
    tracing::info!(screen = ?state.screen, past = state.past_tasks.len(), "Agent back on task list");

    let stats = operator.view().stats();
    tracing::info!(
        total = stats.total_orders,
        active = stats.active_orders,
        revenue = stats.total_revenue,
        "📈 Operator dashboard"
    );
    for n in requester.notifications(Utc::now()) {
        tracing::info!(message = %n.message, "Requester notification");
    }

    tracing::info!("🎉 Demo complete!");

    Ok(())
}
