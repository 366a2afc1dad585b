//! JSON API for the service ticket approval workflow.
//!
//! Endpoints:
//! - `GET  /api/v1/subsidiaries/{subsidiary_id}/approval-queue` — tickets awaiting a decision
//! - `GET  /api/v1/tickets/{ticket_id}`                         — single ticket with badges
//! - `GET  /api/v1/tickets/{ticket_id}/approvals`               — decision history, oldest first
//! - `POST /api/v1/tickets/{ticket_id}/decision`                — record an approver decision
//!
//! Decisions authenticate through the `x-fleetops-approver` header. Requests
//! without it are rejected before the ticket is even loaded.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use fleetops_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use fleetops_core::badges::{priority_badge, status_badge, Badge};
use fleetops_core::domain::approval::{ApprovalAction, TicketApproval};
use fleetops_core::domain::ticket::{ProfileId, ServiceTicket, SubsidiaryId, TicketId, TicketStatus};
use fleetops_core::errors::{ApplicationError, InterfaceError};
use fleetops_core::workflow::{prepare_decision, DecisionContext, DecisionInput};
use fleetops_db::repositories::{
    ApprovalRepository, DecisionStore, QueueEntry, SqlApprovalRepository, SqlDecisionStore,
    SqlTicketRepository, TicketRepository,
};
use fleetops_db::DbPool;

pub const APPROVER_HEADER: &str = "x-fleetops-approver";

#[derive(Clone)]
pub struct ApiState {
    tickets: Arc<dyn TicketRepository>,
    approvals: Arc<dyn ApprovalRepository>,
    decisions: Arc<dyn DecisionStore>,
    audit: Arc<dyn AuditSink>,
}

impl ApiState {
    pub fn new(db_pool: DbPool, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            tickets: Arc::new(SqlTicketRepository::new(db_pool.clone())),
            approvals: Arc::new(SqlApprovalRepository::new(db_pool.clone())),
            decisions: Arc::new(SqlDecisionStore::new(db_pool)),
            audit,
        }
    }

    pub fn with_stores(
        tickets: Arc<dyn TicketRepository>,
        approvals: Arc<dyn ApprovalRepository>,
        decisions: Arc<dyn DecisionStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { tickets, approvals, decisions, audit }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/subsidiaries/{subsidiary_id}/approval-queue", get(approval_queue))
        .route("/api/v1/tickets/{ticket_id}", get(get_ticket))
        .route("/api/v1/tickets/{ticket_id}/approvals", get(list_approvals))
        .route("/api/v1/tickets/{ticket_id}/decision", post(submit_decision))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub ticket: ServiceTicket,
    pub vehicle_label: String,
    pub requester_name: String,
    pub vendor_name: Option<String>,
    pub status_badge: Badge,
    pub priority_badge: Badge,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub subsidiary_id: String,
    pub tickets: Vec<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: ServiceTicket,
    pub status_badge: Badge,
    pub priority_badge: Badge,
}

#[derive(Debug, Serialize)]
pub struct ApprovalHistoryResponse {
    pub ticket_id: String,
    pub approvals: Vec<TicketApproval>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub ticket_id: String,
    pub approval_id: String,
    pub action: ApprovalAction,
    pub status: TicketStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub correlation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(error: InterfaceError) -> ApiError {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let correlation_id = match &error {
        InterfaceError::BadRequest { correlation_id, .. }
        | InterfaceError::Unauthorized { correlation_id, .. }
        | InterfaceError::Conflict { correlation_id, .. }
        | InterfaceError::ServiceUnavailable { correlation_id, .. }
        | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
    };

    let body = ErrorBody {
        message: error.user_message().to_string(),
        error: error.to_string(),
        correlation_id,
    };
    (status, Json(body))
}

fn application_error(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiError {
    error_response(error.into().into_interface(correlation_id))
}

fn not_found(ticket_id: &str, correlation_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("ticket `{ticket_id}` not found"),
            message: "Ticket not found.".to_string(),
            correlation_id: correlation_id.to_string(),
        }),
    )
}

fn approver_from_headers(headers: &HeaderMap, correlation_id: &str) -> Result<ProfileId, ApiError> {
    headers
        .get(APPROVER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| ProfileId(value.to_string()))
        .ok_or_else(|| {
            application_error(
                ApplicationError::Unauthenticated(format!("missing {APPROVER_HEADER} header")),
                correlation_id,
            )
        })
}

fn queue_item(entry: QueueEntry) -> QueueItem {
    QueueItem {
        status_badge: status_badge(entry.ticket.status),
        priority_badge: priority_badge(entry.ticket.priority),
        ticket: entry.ticket,
        vehicle_label: entry.vehicle_label,
        requester_name: entry.requester_name,
        vendor_name: entry.vendor_name,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn approval_queue(
    State(state): State<ApiState>,
    Path(subsidiary_id): Path<String>,
) -> Result<Json<QueueResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let entries = state
        .tickets
        .list_submitted(&SubsidiaryId(subsidiary_id.clone()))
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    info!(
        event_name = "ingress.queue_viewed",
        correlation_id = %correlation_id,
        subsidiary_id = %subsidiary_id,
        entries = entries.len(),
        "approval queue served"
    );

    Ok(Json(QueueResponse {
        subsidiary_id,
        tickets: entries.into_iter().map(queue_item).collect(),
    }))
}

pub async fn get_ticket(
    State(state): State<ApiState>,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let ticket = state
        .tickets
        .find_by_id(&TicketId(ticket_id.clone()))
        .await
        .map_err(|error| application_error(error, &correlation_id))?
        .ok_or_else(|| not_found(&ticket_id, &correlation_id))?;

    Ok(Json(TicketResponse {
        status_badge: status_badge(ticket.status),
        priority_badge: priority_badge(ticket.priority),
        ticket,
    }))
}

pub async fn list_approvals(
    State(state): State<ApiState>,
    Path(ticket_id): Path<String>,
) -> Result<Json<ApprovalHistoryResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let id = TicketId(ticket_id.clone());

    state
        .tickets
        .find_by_id(&id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?
        .ok_or_else(|| not_found(&ticket_id, &correlation_id))?;

    let approvals = state
        .approvals
        .list_for_ticket(&id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    Ok(Json(ApprovalHistoryResponse { ticket_id, approvals }))
}

pub async fn submit_decision(
    State(state): State<ApiState>,
    Path(ticket_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<DecisionInput>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let approver_id = match approver_from_headers(&headers, &correlation_id) {
        Ok(approver_id) => approver_id,
        Err(response) => {
            state.audit.emit(AuditEvent::new(
                Some(TicketId(ticket_id.clone())),
                correlation_id.clone(),
                "ingress.decision_unauthorized",
                AuditCategory::Ingress,
                "anonymous",
                AuditOutcome::Rejected,
            ));
            return Err(response);
        }
    };

    let ticket = state
        .tickets
        .find_by_id(&TicketId(ticket_id.clone()))
        .await
        .map_err(|error| application_error(error, &correlation_id))?
        .ok_or_else(|| not_found(&ticket_id, &correlation_id))?;

    let ctx = DecisionContext { approver_id, subsidiary_id: ticket.subsidiary_id.clone() };

    let prepared = prepare_decision(&ticket, input, &ctx, Utc::now()).map_err(|error| {
        warn!(
            event_name = "workflow.decision_rejected",
            correlation_id = %correlation_id,
            ticket_id = %ticket_id,
            error = %error,
            "decision rejected before persistence"
        );
        state.audit.emit(
            AuditEvent::new(
                Some(ticket.id.clone()),
                correlation_id.clone(),
                "workflow.decision_rejected",
                AuditCategory::Workflow,
                ctx.approver_id.0.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        );
        application_error(error, &correlation_id)
    })?;

    if let Err(error) = state.decisions.record(&prepared).await {
        warn!(
            event_name = "workflow.decision_failed",
            correlation_id = %correlation_id,
            ticket_id = %ticket_id,
            error = %error,
            "decision was not persisted"
        );
        state.audit.emit(
            AuditEvent::new(
                Some(ticket.id.clone()),
                correlation_id.clone(),
                "workflow.decision_failed",
                AuditCategory::Persistence,
                ctx.approver_id.0.clone(),
                AuditOutcome::Failed,
            )
            .with_metadata("error", error.to_string()),
        );
        return Err(application_error(error, &correlation_id));
    }

    state.audit.emit(prepared.audit_event(correlation_id.clone()));
    info!(
        event_name = "workflow.decision_recorded",
        correlation_id = %correlation_id,
        ticket_id = %ticket_id,
        approver_id = %ctx.approver_id.0,
        action = ?prepared.approval.action,
        "decision recorded"
    );

    Ok(Json(DecisionResponse {
        ticket_id,
        approval_id: prepared.approval.id.0.clone(),
        action: prepared.approval.action,
        status: prepared.next_status,
        approved_at: prepared.approved_at,
        correlation_id,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::Json;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use fleetops_core::audit::{AuditCategory, AuditOutcome, InMemoryAuditSink};
    use fleetops_core::badges::BadgeTone;
    use fleetops_core::domain::approval::ApprovalAction;
    use fleetops_core::domain::ticket::{
        ProfileId, ServiceTicket, SubsidiaryId, TicketId, TicketPriority, TicketStatus, TicketType,
        TicketUrgency, VehicleId,
    };
    use fleetops_core::workflow::DecisionInput;
    use fleetops_db::fixtures::{insert_profile, insert_submitted_ticket, insert_vehicle};
    use fleetops_db::repositories::{
        FailingDecisionStore, InMemoryApprovalRepository, InMemoryTicketRepository,
        TicketRepository,
    };
    use fleetops_db::{connect_with_settings, migrations};

    use super::{
        approval_queue, get_ticket, list_approvals, submit_decision, ApiState, APPROVER_HEADER,
    };

    async fn sql_state() -> (ApiState, InMemoryAuditSink) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        insert_vehicle(&pool, "VEH-1", "SUB-1").await.expect("vehicle");
        insert_profile(&pool, "USR-REQ", "Dana Reyes", "SUB-1").await.expect("profile");
        insert_submitted_ticket(&pool, "TKT-1", "SUB-1", "VEH-1", "USR-REQ")
            .await
            .expect("ticket");

        let audit = InMemoryAuditSink::default();
        (ApiState::new(pool, Arc::new(audit.clone())), audit)
    }

    fn approver_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(APPROVER_HEADER, HeaderValue::from_static("USR-APPROVER"));
        headers
    }

    fn approve_input() -> DecisionInput {
        DecisionInput { action: Some(ApprovalAction::Approve), ..DecisionInput::default() }
    }

    #[tokio::test]
    async fn queue_lists_submitted_tickets_with_badges() {
        let (state, _) = sql_state().await;

        let Json(payload) =
            approval_queue(State(state), Path("SUB-1".to_string())).await.expect("queue");

        assert_eq!(payload.subsidiary_id, "SUB-1");
        assert_eq!(payload.tickets.len(), 1);
        let item = &payload.tickets[0];
        assert_eq!(item.ticket.id.0, "TKT-1");
        assert_eq!(item.requester_name, "Dana Reyes");
        assert_eq!(item.status_badge.label, "Submitted");
        assert_eq!(item.status_badge.tone, BadgeTone::Info);
    }

    #[tokio::test]
    async fn queue_for_an_unknown_subsidiary_is_empty_not_an_error() {
        let (state, _) = sql_state().await;

        let Json(payload) =
            approval_queue(State(state), Path("SUB-ELSEWHERE".to_string())).await.expect("queue");

        assert!(payload.tickets.is_empty());
    }

    #[tokio::test]
    async fn get_ticket_returns_404_for_unknown_id() {
        let (state, _) = sql_state().await;

        let error = get_ticket(State(state), Path("TKT-MISSING".to_string()))
            .await
            .expect_err("unknown ticket");

        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn decision_without_approver_header_is_unauthorized() {
        let (state, audit) = sql_state().await;

        let error = submit_decision(
            State(state),
            Path("TKT-1".to_string()),
            HeaderMap::new(),
            Json(approve_input()),
        )
        .await
        .expect_err("missing header");

        assert_eq!(error.0, StatusCode::UNAUTHORIZED);

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "ingress.decision_unauthorized");
        assert_eq!(events[0].category, AuditCategory::Ingress);
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
        assert_eq!(events[0].actor, "anonymous");
    }

    #[tokio::test]
    async fn decision_without_an_action_is_a_bad_request() {
        let (state, audit) = sql_state().await;

        let error = submit_decision(
            State(state),
            Path("TKT-1".to_string()),
            approver_headers(),
            Json(DecisionInput::default()),
        )
        .await
        .expect_err("empty decision form");

        assert_eq!(error.0, StatusCode::BAD_REQUEST);

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "workflow.decision_rejected");
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
        assert_eq!(events[0].actor, "USR-APPROVER");
        assert!(events[0].metadata.contains_key("error"));
    }

    #[tokio::test]
    async fn decision_for_an_unknown_ticket_is_404() {
        let (state, _) = sql_state().await;

        let error = submit_decision(
            State(state),
            Path("TKT-MISSING".to_string()),
            approver_headers(),
            Json(approve_input()),
        )
        .await
        .expect_err("unknown ticket");

        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn approve_decision_updates_the_ticket_and_emits_audit() {
        let (state, audit) = sql_state().await;

        let Json(payload) = submit_decision(
            State(state.clone()),
            Path("TKT-1".to_string()),
            approver_headers(),
            Json(approve_input()),
        )
        .await
        .expect("decision");

        assert_eq!(payload.status, TicketStatus::Approved);
        assert!(payload.approved_at.is_some());

        let Json(ticket) =
            get_ticket(State(state.clone()), Path("TKT-1".to_string())).await.expect("ticket");
        assert_eq!(ticket.ticket.status, TicketStatus::Approved);
        assert_eq!(ticket.status_badge.label, "Approved");

        let Json(history) =
            list_approvals(State(state.clone()), Path("TKT-1".to_string())).await.expect("history");
        assert_eq!(history.approvals.len(), 1);
        assert_eq!(history.approvals[0].approver_id.0, "USR-APPROVER");

        let Json(queue) =
            approval_queue(State(state), Path("SUB-1".to_string())).await.expect("queue");
        assert!(queue.tickets.is_empty(), "decided ticket must leave the queue");

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "workflow.decision_recorded");
    }

    #[tokio::test]
    async fn second_decision_on_a_decided_ticket_is_rejected() {
        let (state, _) = sql_state().await;

        submit_decision(
            State(state.clone()),
            Path("TKT-1".to_string()),
            approver_headers(),
            Json(approve_input()),
        )
        .await
        .expect("first decision");

        let error = submit_decision(
            State(state),
            Path("TKT-1".to_string()),
            approver_headers(),
            Json(approve_input()),
        )
        .await
        .expect_err("second decision");

        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn persistence_failure_maps_to_service_unavailable() {
        let tickets = Arc::new(InMemoryTicketRepository::default());
        tickets.save(submitted_ticket("TKT-1")).await.expect("seed ticket");
        let audit = InMemoryAuditSink::default();
        let state = ApiState::with_stores(
            tickets,
            Arc::new(InMemoryApprovalRepository::default()),
            Arc::new(FailingDecisionStore),
            Arc::new(audit.clone()),
        );

        let error = submit_decision(
            State(state),
            Path("TKT-1".to_string()),
            approver_headers(),
            Json(approve_input()),
        )
        .await
        .expect_err("store failure");

        assert_eq!(error.0, StatusCode::SERVICE_UNAVAILABLE);

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "workflow.decision_failed");
        assert_eq!(events[0].category, AuditCategory::Persistence);
        assert_eq!(events[0].outcome, AuditOutcome::Failed);
    }

    fn submitted_ticket(id: &str) -> ServiceTicket {
        let now = Utc::now();
        ServiceTicket {
            id: TicketId(id.to_string()),
            ticket_number: format!("ST-{id}"),
            title: "Brake pad replacement".to_string(),
            description: "Front axle pads below wear limit".to_string(),
            ticket_type: TicketType::Preventive,
            priority: TicketPriority::High,
            urgency: TicketUrgency::Within24h,
            status: TicketStatus::Submitted,
            estimated_total_cost: Decimal::new(32_500, 2),
            actual_total_cost: None,
            vehicle_id: VehicleId("VEH-1".to_string()),
            requested_by: ProfileId("USR-REQ".to_string()),
            vendor_id: None,
            subsidiary_id: SubsidiaryId("SUB-1".to_string()),
            created_at: now,
            submitted_at: Some(now),
            approved_at: None,
            completed_at: None,
            updated_at: now,
        }
    }
}
