use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ticket::{ProfileId, SubsidiaryId, TicketId, VendorId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    ApproveWithModifications,
    RequestInfo,
    Reject,
}

/// One approver's decision on a ticket. Immutable once written; a ticket may
/// accumulate several of these (a `request_info` followed by a later
/// `approve`, say).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketApproval {
    pub id: ApprovalId,
    pub ticket_id: TicketId,
    pub approver_id: ProfileId,
    pub subsidiary_id: SubsidiaryId,
    pub action: ApprovalAction,
    pub comments: Option<String>,
    pub modifications: Option<String>,
    pub modified_labor_cost_limit: Option<Decimal>,
    pub modified_parts_cost_limit: Option<Decimal>,
    pub modified_total_cost_limit: Option<Decimal>,
    pub modified_completion_date: Option<NaiveDate>,
    pub modified_vendor_id: Option<VendorId>,
    pub created_at: DateTime<Utc>,
}
