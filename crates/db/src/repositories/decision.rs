use chrono::Utc;

use fleetops_core::workflow::PreparedDecision;

use super::approval::{bind_approval, INSERT_APPROVAL};
use super::{status_as_str, DecisionStore, RepositoryError};
use crate::DbPool;

/// Persists one decision as a single transaction: the approval audit row and
/// the ticket status update land together or not at all. The ticket update
/// carries the `updated_at` the approver observed; a concurrent decision that
/// already moved the ticket makes the guard miss and the whole transaction
/// rolls back with a conflict.
pub struct SqlDecisionStore {
    pool: DbPool,
}

impl SqlDecisionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DecisionStore for SqlDecisionStore {
    async fn record(&self, decision: &PreparedDecision) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        bind_approval(sqlx::query(INSERT_APPROVAL), &decision.approval)
            .execute(&mut *tx)
            .await?;

        if decision.changes_status() {
            let result = sqlx::query(
                "UPDATE service_ticket
                 SET status = ?, approved_at = COALESCE(?, approved_at), updated_at = ?
                 WHERE id = ? AND status = 'submitted' AND updated_at = ?",
            )
            .bind(status_as_str(decision.next_status))
            .bind(decision.approved_at.map(|dt| dt.to_rfc3339()))
            .bind(Utc::now().to_rfc3339())
            .bind(&decision.approval.ticket_id.0)
            .bind(decision.expected_updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(RepositoryError::Conflict(format!(
                    "ticket {} was decided by someone else",
                    decision.approval.ticket_id.0
                )));
            }
        } else {
            // request_info leaves the status alone, but the decision is still
            // only valid against the ticket state the approver saw.
            let guard = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM service_ticket
                 WHERE id = ? AND status = 'submitted' AND updated_at = ?",
            )
            .bind(&decision.approval.ticket_id.0)
            .bind(decision.expected_updated_at.to_rfc3339())
            .fetch_one(&mut *tx)
            .await?;

            if guard == 0 {
                tx.rollback().await?;
                return Err(RepositoryError::Conflict(format!(
                    "ticket {} is no longer awaiting approval",
                    decision.approval.ticket_id.0
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
