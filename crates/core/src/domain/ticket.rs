use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubsidiaryId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Breakdown,
    Preventive,
    Scheduled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketUrgency {
    Immediate,
    Within24h,
    WithinWeek,
    Scheduled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl TicketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// One service request for a vehicle, tracked through the approval lifecycle.
///
/// `updated_at` doubles as the optimistic-concurrency token: every persisted
/// status change must carry the `updated_at` the writer last observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceTicket {
    pub id: TicketId,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
    pub urgency: TicketUrgency,
    pub status: TicketStatus,
    pub estimated_total_cost: Decimal,
    pub actual_total_cost: Option<Decimal>,
    pub vehicle_id: VehicleId,
    pub requested_by: ProfileId,
    pub vendor_id: Option<VendorId>,
    pub subsidiary_id: SubsidiaryId,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceTicket {
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        if next == TicketStatus::Cancelled {
            return !self.status.is_terminal();
        }

        matches!(
            (&self.status, next),
            (TicketStatus::Draft, TicketStatus::Submitted)
                | (TicketStatus::Submitted, TicketStatus::Approved)
                | (TicketStatus::Submitted, TicketStatus::Rejected)
                | (TicketStatus::Approved, TicketStatus::InProgress)
                | (TicketStatus::InProgress, TicketStatus::Completed)
        )
    }

    pub fn transition_to(&mut self, next: TicketStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidTicketTransition { from: self.status, to: next });
        }

        let now = Utc::now();
        match next {
            TicketStatus::Submitted => self.submitted_at = Some(now),
            TicketStatus::Approved => self.approved_at = Some(now),
            TicketStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        self.status = next;
        Ok(())
    }
}
