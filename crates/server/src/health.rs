//! Readiness endpoint for the approval workflow.
//!
//! Beyond a reachable database, "ready" means the ticket schema has been
//! migrated; the payload also carries the number of tickets awaiting a
//! decision so operators can see a backed-up queue at a glance.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use fleetops_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub schema: HealthCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_decisions: Option<i64>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        ticket_id = "unknown",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                ticket_id = "unknown",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let schema = if database.status == "ready" {
        schema_check(&state.db_pool).await
    } else {
        HealthCheck {
            status: "degraded",
            detail: "skipped while the database is unreachable".to_string(),
        }
    };

    let pending_decisions = if schema.status == "ready" {
        pending_decision_count(&state.db_pool).await
    } else {
        None
    };

    let ready = database.status == "ready" && schema.status == "ready";
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        schema,
        pending_decisions,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn schema_check(pool: &DbPool) -> HealthCheck {
    let result = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master \
         WHERE type = 'table' AND name IN ('service_ticket', 'ticket_approval')",
    )
    .fetch_one(pool)
    .await;

    match result {
        Ok(2) => HealthCheck { status: "ready", detail: "ticket schema is migrated".to_string() },
        Ok(found) => HealthCheck {
            status: "degraded",
            detail: format!("ticket schema incomplete ({found} of 2 tables present)"),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("schema probe failed: {error}") }
        }
    }
}

async fn pending_decision_count(pool: &DbPool) -> Option<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM service_ticket WHERE status = 'submitted'")
        .fetch_one(pool)
        .await
        .ok()
}
