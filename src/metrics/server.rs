use actix_web::{web, App, HttpResponse, HttpServer};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

use crate::store::OrderStore;

#[derive(Clone)]
struct ServerState {
    registry: Arc<Registry>,
    store: Arc<OrderStore>,
}

/// Serve `/metrics` and `/health` until the server stops.
///
/// Runs its own actix-web system; call it from a dedicated thread/runtime.
pub async fn start_metrics_server(registry: Arc<Registry>, store: Arc<OrderStore>, port: u16) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    let state = ServerState { registry, store };
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn metrics_handler(state: web::Data<ServerState>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(state: web::Data<ServerState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "laundro-sync",
        "orders": state.store.len(),
        "revision": state.store.revision(),
    }))
}
