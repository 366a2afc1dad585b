use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use fleetops_core::domain::approval::{ApprovalAction, ApprovalId, TicketApproval};
use fleetops_core::domain::ticket::{
    ServiceTicket, SubsidiaryId, TicketId, TicketPriority, TicketStatus, TicketType, TicketUrgency,
};
use fleetops_core::errors::ApplicationError;
use fleetops_core::workflow::PreparedDecision;

pub mod approval;
pub mod decision;
pub mod memory;
pub mod ticket;

pub use approval::SqlApprovalRepository;
pub use decision::SqlDecisionStore;
pub use memory::{FailingDecisionStore, InMemoryApprovalRepository, InMemoryTicketRepository};
pub use ticket::SqlTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => ApplicationError::Conflict(message),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// One approval-queue row: the ticket plus the joined display fields the
/// queue renders alongside it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueEntry {
    pub ticket: ServiceTicket,
    pub vehicle_label: String,
    pub requester_name: String,
    pub vendor_name: Option<String>,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<ServiceTicket>, RepositoryError>;
    async fn save(&self, ticket: ServiceTicket) -> Result<(), RepositoryError>;

    /// Tickets awaiting a decision for one subsidiary, oldest submission
    /// first. An empty list is a normal result, not an error.
    async fn list_submitted(
        &self,
        subsidiary_id: &SubsidiaryId,
    ) -> Result<Vec<QueueEntry>, RepositoryError>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn find_by_id(&self, id: &ApprovalId)
        -> Result<Option<TicketApproval>, RepositoryError>;

    /// Approval rows are audit entries: insert-only, never upserted.
    async fn insert(&self, approval: TicketApproval) -> Result<(), RepositoryError>;

    async fn list_for_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<TicketApproval>, RepositoryError>;
}

/// Applies one prepared decision atomically: the approval row and the ticket
/// status update either both land or neither does.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn record(&self, decision: &PreparedDecision) -> Result<(), RepositoryError>;
}

pub(crate) fn status_as_str(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Draft => "draft",
        TicketStatus::Submitted => "submitted",
        TicketStatus::Approved => "approved",
        TicketStatus::Rejected => "rejected",
        TicketStatus::InProgress => "in_progress",
        TicketStatus::Completed => "completed",
        TicketStatus::Cancelled => "cancelled",
    }
}

pub(crate) fn parse_status(value: &str) -> Result<TicketStatus, RepositoryError> {
    match value {
        "draft" => Ok(TicketStatus::Draft),
        "submitted" => Ok(TicketStatus::Submitted),
        "approved" => Ok(TicketStatus::Approved),
        "rejected" => Ok(TicketStatus::Rejected),
        "in_progress" => Ok(TicketStatus::InProgress),
        "completed" => Ok(TicketStatus::Completed),
        "cancelled" => Ok(TicketStatus::Cancelled),
        other => Err(RepositoryError::Decode(format!("unknown ticket status `{other}`"))),
    }
}

pub(crate) fn ticket_type_as_str(ticket_type: TicketType) -> &'static str {
    match ticket_type {
        TicketType::Breakdown => "breakdown",
        TicketType::Preventive => "preventive",
        TicketType::Scheduled => "scheduled",
    }
}

pub(crate) fn parse_ticket_type(value: &str) -> Result<TicketType, RepositoryError> {
    match value {
        "breakdown" => Ok(TicketType::Breakdown),
        "preventive" => Ok(TicketType::Preventive),
        "scheduled" => Ok(TicketType::Scheduled),
        other => Err(RepositoryError::Decode(format!("unknown ticket type `{other}`"))),
    }
}

pub(crate) fn priority_as_str(priority: TicketPriority) -> &'static str {
    match priority {
        TicketPriority::Critical => "critical",
        TicketPriority::High => "high",
        TicketPriority::Medium => "medium",
        TicketPriority::Low => "low",
    }
}

pub(crate) fn parse_priority(value: &str) -> Result<TicketPriority, RepositoryError> {
    match value {
        "critical" => Ok(TicketPriority::Critical),
        "high" => Ok(TicketPriority::High),
        "medium" => Ok(TicketPriority::Medium),
        "low" => Ok(TicketPriority::Low),
        other => Err(RepositoryError::Decode(format!("unknown ticket priority `{other}`"))),
    }
}

pub(crate) fn urgency_as_str(urgency: TicketUrgency) -> &'static str {
    match urgency {
        TicketUrgency::Immediate => "immediate",
        TicketUrgency::Within24h => "within_24h",
        TicketUrgency::WithinWeek => "within_week",
        TicketUrgency::Scheduled => "scheduled",
    }
}

pub(crate) fn parse_urgency(value: &str) -> Result<TicketUrgency, RepositoryError> {
    match value {
        "immediate" => Ok(TicketUrgency::Immediate),
        "within_24h" => Ok(TicketUrgency::Within24h),
        "within_week" => Ok(TicketUrgency::WithinWeek),
        "scheduled" => Ok(TicketUrgency::Scheduled),
        other => Err(RepositoryError::Decode(format!("unknown ticket urgency `{other}`"))),
    }
}

pub(crate) fn action_as_str(action: ApprovalAction) -> &'static str {
    match action {
        ApprovalAction::Approve => "approve",
        ApprovalAction::ApproveWithModifications => "approve_with_modifications",
        ApprovalAction::RequestInfo => "request_info",
        ApprovalAction::Reject => "reject",
    }
}

pub(crate) fn parse_action(value: &str) -> Result<ApprovalAction, RepositoryError> {
    match value {
        "approve" => Ok(ApprovalAction::Approve),
        "approve_with_modifications" => Ok(ApprovalAction::ApproveWithModifications),
        "request_info" => Ok(ApprovalAction::RequestInfo),
        "reject" => Ok(ApprovalAction::Reject),
        other => Err(RepositoryError::Decode(format!("unknown approval action `{other}`"))),
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{value}`: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, RepositoryError> {
    value
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("bad decimal `{value}`: {e}")))
}

pub(crate) fn parse_optional_decimal(
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value.as_deref().map(parse_decimal).transpose()
}
