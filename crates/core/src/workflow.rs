//! Decision preparation for the ticket approval workflow.
//!
//! This module is pure: it validates one approver decision against one ticket
//! and produces the approval record plus the status change to persist. The
//! transactional write itself lives in the persistence layer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome};
use crate::domain::approval::{ApprovalAction, ApprovalId, TicketApproval};
use crate::domain::ticket::{ProfileId, ServiceTicket, SubsidiaryId, TicketStatus, VendorId};
use crate::errors::DomainError;

/// Explicit actor context for a decision. Always passed in, never read from
/// ambient state, so the workflow stays independently testable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub approver_id: ProfileId,
    pub subsidiary_id: SubsidiaryId,
}

/// Raw decision form contents. `action` is optional here because an empty
/// form is a representable state; `prepare_decision` rejects it before
/// anything is persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub action: Option<ApprovalAction>,
    pub comments: Option<String>,
    pub modifications: Option<String>,
    pub modified_labor_cost_limit: Option<Decimal>,
    pub modified_parts_cost_limit: Option<Decimal>,
    pub modified_total_cost_limit: Option<Decimal>,
    pub modified_completion_date: Option<NaiveDate>,
    pub modified_vendor_id: Option<VendorId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreparedDecision {
    pub approval: TicketApproval,
    pub next_status: TicketStatus,
    pub approved_at: Option<DateTime<Utc>>,
    /// `updated_at` observed on the ticket when the decision was prepared.
    /// The persistence layer uses it as the optimistic-concurrency guard.
    pub expected_updated_at: DateTime<Utc>,
}

impl PreparedDecision {
    /// The ticket row only needs rewriting when the action moves the status.
    pub fn changes_status(&self) -> bool {
        self.approval.action != ApprovalAction::RequestInfo
    }

    pub fn audit_event(&self, correlation_id: impl Into<String>) -> AuditEvent {
        AuditEvent::new(
            Some(self.approval.ticket_id.clone()),
            correlation_id,
            "workflow.decision_recorded",
            AuditCategory::Workflow,
            self.approval.approver_id.0.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("action", action_name(self.approval.action))
        .with_metadata("next_status", format!("{:?}", self.next_status))
    }
}

fn action_name(action: ApprovalAction) -> &'static str {
    match action {
        ApprovalAction::Approve => "approve",
        ApprovalAction::ApproveWithModifications => "approve_with_modifications",
        ApprovalAction::RequestInfo => "request_info",
        ApprovalAction::Reject => "reject",
    }
}

/// Validate one approver decision against one ticket.
///
/// Exactly one approval record is produced per successful call. Modification
/// overrides are only carried for `approve_with_modifications`; for every
/// other action they are dropped rather than silently persisted.
pub fn prepare_decision(
    ticket: &ServiceTicket,
    input: DecisionInput,
    ctx: &DecisionContext,
    now: DateTime<Utc>,
) -> Result<PreparedDecision, DomainError> {
    let action = input.action.ok_or(DomainError::MissingDecisionAction)?;

    if ticket.status != TicketStatus::Submitted {
        return Err(DomainError::InvariantViolation(format!(
            "ticket {} is not awaiting approval (status {:?})",
            ticket.ticket_number, ticket.status
        )));
    }

    let next_status = match action {
        ApprovalAction::Approve | ApprovalAction::ApproveWithModifications => {
            TicketStatus::Approved
        }
        ApprovalAction::Reject => TicketStatus::Rejected,
        ApprovalAction::RequestInfo => TicketStatus::Submitted,
    };

    if next_status != ticket.status && !ticket.can_transition_to(next_status) {
        return Err(DomainError::InvalidTicketTransition { from: ticket.status, to: next_status });
    }

    let with_modifications = action == ApprovalAction::ApproveWithModifications;
    let approval = TicketApproval {
        id: ApprovalId(Uuid::new_v4().to_string()),
        ticket_id: ticket.id.clone(),
        approver_id: ctx.approver_id.clone(),
        subsidiary_id: ctx.subsidiary_id.clone(),
        action,
        comments: input.comments,
        modifications: with_modifications.then_some(input.modifications).flatten(),
        modified_labor_cost_limit: with_modifications
            .then_some(input.modified_labor_cost_limit)
            .flatten(),
        modified_parts_cost_limit: with_modifications
            .then_some(input.modified_parts_cost_limit)
            .flatten(),
        modified_total_cost_limit: with_modifications
            .then_some(input.modified_total_cost_limit)
            .flatten(),
        modified_completion_date: with_modifications
            .then_some(input.modified_completion_date)
            .flatten(),
        modified_vendor_id: with_modifications.then_some(input.modified_vendor_id).flatten(),
        created_at: now,
    };

    let approved_at = (next_status == TicketStatus::Approved).then_some(now);

    Ok(PreparedDecision {
        approval,
        next_status,
        approved_at,
        expected_updated_at: ticket.updated_at,
    })
}
