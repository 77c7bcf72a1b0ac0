use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};
use warboard_core::registry::TableRegistry;
use warboard_core::store::SnapshotStore;

#[derive(Clone)]
pub struct HealthState {
    snapshot_store: SnapshotStore,
    registry: Arc<Mutex<TableRegistry>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub storage: HealthCheck,
    pub reserved_tables: u32,
    pub available_tables: u32,
    pub checked_at: String,
}

pub fn router(snapshot_store: SnapshotStore, registry: Arc<Mutex<TableRegistry>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { snapshot_store, registry })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    snapshot_store: SnapshotStore,
    registry: Arc<Mutex<TableRegistry>>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(snapshot_store, registry)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = storage_check(&state.snapshot_store);
    let ready = storage.status == "ready";

    let (reserved_tables, available_tables) = {
        let registry = state.registry.lock().await;
        (registry.capacity() - registry.available_count(), registry.available_count())
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "warboard-server runtime initialized".to_string(),
        },
        storage,
        reserved_tables,
        available_tables,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn storage_check(snapshot_store: &SnapshotStore) -> HealthCheck {
    match snapshot_store.probe() {
        Ok(()) => {
            HealthCheck { status: "ready", detail: "reservation snapshot accessible".to_string() }
        }
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("reservation snapshot probe failed: {error}"),
        },
    }
}
