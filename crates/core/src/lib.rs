pub mod audit;
pub mod badges;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use badges::{priority_badge, status_badge, Badge, BadgeTone};
pub use domain::approval::{ApprovalAction, ApprovalId, TicketApproval};
pub use domain::ticket::{
    ProfileId, ServiceTicket, SubsidiaryId, TicketId, TicketPriority, TicketStatus, TicketType,
    TicketUrgency, VehicleId, VendorId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use workflow::{prepare_decision, DecisionContext, DecisionInput, PreparedDecision};
