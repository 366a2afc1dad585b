use std::collections::HashMap;

use tokio::sync::RwLock;

use fleetops_core::domain::approval::{ApprovalId, TicketApproval};
use fleetops_core::domain::ticket::{ServiceTicket, SubsidiaryId, TicketId, TicketStatus};
use fleetops_core::workflow::PreparedDecision;

use super::{
    ApprovalRepository, DecisionStore, QueueEntry, RepositoryError, TicketRepository,
};

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<String, ServiceTicket>>,
}

#[async_trait::async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<ServiceTicket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.get(&id.0).cloned())
    }

    async fn save(&self, ticket: ServiceTicket) -> Result<(), RepositoryError> {
        let mut tickets = self.tickets.write().await;
        tickets.insert(ticket.id.0.clone(), ticket);
        Ok(())
    }

    async fn list_submitted(
        &self,
        subsidiary_id: &SubsidiaryId,
    ) -> Result<Vec<QueueEntry>, RepositoryError> {
        let tickets = self.tickets.read().await;
        let mut queue: Vec<QueueEntry> = tickets
            .values()
            .filter(|t| t.subsidiary_id == *subsidiary_id && t.status == TicketStatus::Submitted)
            .cloned()
            .map(|ticket| QueueEntry {
                // The double has no registry tables; echo the references.
                vehicle_label: ticket.vehicle_id.0.clone(),
                requester_name: ticket.requested_by.0.clone(),
                vendor_name: ticket.vendor_id.as_ref().map(|id| id.0.clone()),
                ticket,
            })
            .collect();
        queue.sort_by_key(|entry| entry.ticket.submitted_at);
        Ok(queue)
    }
}

#[derive(Default)]
pub struct InMemoryApprovalRepository {
    approvals: RwLock<HashMap<String, TicketApproval>>,
}

#[async_trait::async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn find_by_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<TicketApproval>, RepositoryError> {
        let approvals = self.approvals.read().await;
        Ok(approvals.get(&id.0).cloned())
    }

    async fn insert(&self, approval: TicketApproval) -> Result<(), RepositoryError> {
        let mut approvals = self.approvals.write().await;
        if approvals.contains_key(&approval.id.0) {
            return Err(RepositoryError::Decode(format!(
                "approval `{}` already recorded",
                approval.id.0
            )));
        }
        approvals.insert(approval.id.0.clone(), approval);
        Ok(())
    }

    async fn list_for_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<TicketApproval>, RepositoryError> {
        let approvals = self.approvals.read().await;
        let mut history: Vec<TicketApproval> =
            approvals.values().filter(|a| a.ticket_id == *ticket_id).cloned().collect();
        history.sort_by_key(|a| a.created_at);
        Ok(history)
    }
}

/// Decision store that always reports a backend failure. Lets callers test
/// the "persistence failed, nothing committed" path without a database.
#[derive(Default)]
pub struct FailingDecisionStore;

#[async_trait::async_trait]
impl DecisionStore for FailingDecisionStore {
    async fn record(&self, decision: &PreparedDecision) -> Result<(), RepositoryError> {
        Err(RepositoryError::Decode(format!(
            "simulated write failure for ticket `{}`",
            decision.approval.ticket_id.0
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use fleetops_core::domain::approval::{ApprovalAction, ApprovalId, TicketApproval};
    use fleetops_core::domain::ticket::{
        ProfileId, ServiceTicket, SubsidiaryId, TicketId, TicketPriority, TicketStatus, TicketType,
        TicketUrgency, VehicleId,
    };

    use crate::repositories::{
        ApprovalRepository, InMemoryApprovalRepository, InMemoryTicketRepository, TicketRepository,
    };

    fn ticket(id: &str, status: TicketStatus) -> ServiceTicket {
        let now = Utc::now();
        ServiceTicket {
            id: TicketId(id.to_string()),
            ticket_number: format!("ST-{id}"),
            title: "Tyre rotation".to_string(),
            description: "Routine rotation".to_string(),
            ticket_type: TicketType::Scheduled,
            priority: TicketPriority::Low,
            urgency: TicketUrgency::Scheduled,
            status,
            estimated_total_cost: Decimal::new(8_000, 2),
            actual_total_cost: None,
            vehicle_id: VehicleId("VEH-1".to_string()),
            requested_by: ProfileId("USR-1".to_string()),
            vendor_id: None,
            subsidiary_id: SubsidiaryId("SUB-1".to_string()),
            created_at: now,
            submitted_at: (status == TicketStatus::Submitted).then_some(now),
            approved_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn in_memory_ticket_repo_round_trip() {
        let repo = InMemoryTicketRepository::default();
        let ticket = ticket("TKT-1", TicketStatus::Draft);

        repo.save(ticket.clone()).await.expect("save");
        let found = repo.find_by_id(&ticket.id).await.expect("find");

        assert_eq!(found, Some(ticket));
    }

    #[tokio::test]
    async fn in_memory_queue_filters_and_orders_like_the_sql_repo() {
        let repo = InMemoryTicketRepository::default();

        let mut older = ticket("TKT-OLD", TicketStatus::Submitted);
        older.submitted_at = Some(Utc::now() - Duration::hours(3));
        repo.save(older).await.expect("save older");
        repo.save(ticket("TKT-NEW", TicketStatus::Submitted)).await.expect("save newer");
        repo.save(ticket("TKT-DRAFT", TicketStatus::Draft)).await.expect("save draft");

        let queue =
            repo.list_submitted(&SubsidiaryId("SUB-1".to_string())).await.expect("queue");

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].ticket.id.0, "TKT-OLD");
        assert_eq!(queue[1].ticket.id.0, "TKT-NEW");
    }

    #[tokio::test]
    async fn in_memory_approvals_refuse_duplicates() {
        let repo = InMemoryApprovalRepository::default();
        let approval = TicketApproval {
            id: ApprovalId("APR-1".to_string()),
            ticket_id: TicketId("TKT-1".to_string()),
            approver_id: ProfileId("USR-A".to_string()),
            subsidiary_id: SubsidiaryId("SUB-1".to_string()),
            action: ApprovalAction::Approve,
            comments: None,
            modifications: None,
            modified_labor_cost_limit: None,
            modified_parts_cost_limit: None,
            modified_total_cost_limit: None,
            modified_completion_date: None,
            modified_vendor_id: None,
            created_at: Utc::now(),
        };

        repo.insert(approval.clone()).await.expect("first insert");
        assert!(repo.insert(approval).await.is_err());
    }
}
