use chrono::NaiveDate;
use sqlx::Row;

use fleetops_core::domain::approval::{ApprovalId, TicketApproval};
use fleetops_core::domain::ticket::{ProfileId, SubsidiaryId, TicketId, VendorId};

use super::{
    action_as_str, parse_action, parse_optional_decimal, parse_timestamp, ApprovalRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlApprovalRepository {
    pool: DbPool,
}

impl SqlApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const APPROVAL_COLUMNS: &str = "id, ticket_id, approver_id, subsidiary_id, action, comments, \
     modifications, modified_labor_cost_limit, modified_parts_cost_limit, \
     modified_total_cost_limit, modified_completion_date, modified_vendor_id, created_at";

pub(crate) fn row_to_approval(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<TicketApproval, RepositoryError> {
    let get_text = |name: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(name).map_err(|e| RepositoryError::Decode(e.to_string()))
    };
    let get_opt_text = |name: &str| -> Result<Option<String>, RepositoryError> {
        row.try_get::<Option<String>, _>(name).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let modified_completion_date = get_opt_text("modified_completion_date")?
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| RepositoryError::Decode(format!("bad date `{raw}`: {e}")))
        })
        .transpose()?;

    Ok(TicketApproval {
        id: ApprovalId(get_text("id")?),
        ticket_id: TicketId(get_text("ticket_id")?),
        approver_id: ProfileId(get_text("approver_id")?),
        subsidiary_id: SubsidiaryId(get_text("subsidiary_id")?),
        action: parse_action(&get_text("action")?)?,
        comments: get_opt_text("comments")?,
        modifications: get_opt_text("modifications")?,
        modified_labor_cost_limit: parse_optional_decimal(get_opt_text(
            "modified_labor_cost_limit",
        )?)?,
        modified_parts_cost_limit: parse_optional_decimal(get_opt_text(
            "modified_parts_cost_limit",
        )?)?,
        modified_total_cost_limit: parse_optional_decimal(get_opt_text(
            "modified_total_cost_limit",
        )?)?,
        modified_completion_date,
        modified_vendor_id: get_opt_text("modified_vendor_id")?.map(VendorId),
        created_at: parse_timestamp(&get_text("created_at")?)?,
    })
}

pub(crate) fn bind_approval<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    approval: &'q TicketApproval,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&approval.id.0)
        .bind(&approval.ticket_id.0)
        .bind(&approval.approver_id.0)
        .bind(&approval.subsidiary_id.0)
        .bind(action_as_str(approval.action))
        .bind(&approval.comments)
        .bind(&approval.modifications)
        .bind(approval.modified_labor_cost_limit.map(|v| v.to_string()))
        .bind(approval.modified_parts_cost_limit.map(|v| v.to_string()))
        .bind(approval.modified_total_cost_limit.map(|v| v.to_string()))
        .bind(approval.modified_completion_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(approval.modified_vendor_id.as_ref().map(|id| id.0.clone()))
        .bind(approval.created_at.to_rfc3339())
}

pub(crate) const INSERT_APPROVAL: &str =
    "INSERT INTO ticket_approval (id, ticket_id, approver_id, subsidiary_id, action, comments,
                                  modifications, modified_labor_cost_limit,
                                  modified_parts_cost_limit, modified_total_cost_limit,
                                  modified_completion_date, modified_vendor_id, created_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

#[async_trait::async_trait]
impl ApprovalRepository for SqlApprovalRepository {
    async fn find_by_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<TicketApproval>, RepositoryError> {
        let query = format!("SELECT {APPROVAL_COLUMNS} FROM ticket_approval WHERE id = ?");
        let row = sqlx::query(&query).bind(&id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_approval(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, approval: TicketApproval) -> Result<(), RepositoryError> {
        bind_approval(sqlx::query(INSERT_APPROVAL), &approval).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_for_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<TicketApproval>, RepositoryError> {
        let query = format!(
            "SELECT {APPROVAL_COLUMNS} FROM ticket_approval
             WHERE ticket_id = ? ORDER BY created_at ASC"
        );
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&query).bind(&ticket_id.0).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_approval).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use fleetops_core::domain::approval::{ApprovalAction, ApprovalId, TicketApproval};
    use fleetops_core::domain::ticket::{ProfileId, SubsidiaryId, TicketId, VendorId};

    use super::SqlApprovalRepository;
    use crate::fixtures::{insert_profile, insert_submitted_ticket, insert_vehicle, insert_vendor};
    use crate::repositories::ApprovalRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        insert_vehicle(&pool, "VEH-1", "SUB-1").await.expect("vehicle");
        insert_profile(&pool, "USR-REQ", "Dana Reyes", "SUB-1").await.expect("profile");
        insert_vendor(&pool, "VND-1", "Hartmann Garage").await.expect("vendor");
        insert_submitted_ticket(&pool, "TKT-1", "SUB-1", "VEH-1", "USR-REQ")
            .await
            .expect("parent ticket");
        pool
    }

    fn sample_approval(id: &str, ticket_id: &str, action: ApprovalAction) -> TicketApproval {
        TicketApproval {
            id: ApprovalId(id.to_string()),
            ticket_id: TicketId(ticket_id.to_string()),
            approver_id: ProfileId("USR-APPROVER".to_string()),
            subsidiary_id: SubsidiaryId("SUB-1".to_string()),
            action,
            comments: Some("looks reasonable".to_string()),
            modifications: None,
            modified_labor_cost_limit: None,
            modified_parts_cost_limit: None,
            modified_total_cost_limit: None,
            modified_completion_date: None,
            modified_vendor_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trips_optional_fields() {
        let pool = setup().await;
        let repo = SqlApprovalRepository::new(pool);

        let mut approval =
            sample_approval("APR-1", "TKT-1", ApprovalAction::ApproveWithModifications);
        approval.modifications = Some("cap parts spend".to_string());
        approval.modified_total_cost_limit = Some(Decimal::new(500_000, 2));
        approval.modified_completion_date = NaiveDate::from_ymd_opt(2026, 9, 15);
        approval.modified_vendor_id = Some(VendorId("VND-1".to_string()));

        repo.insert(approval.clone()).await.expect("insert");
        let found = repo
            .find_by_id(&ApprovalId("APR-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.action, ApprovalAction::ApproveWithModifications);
        assert_eq!(found.modified_total_cost_limit, Some(Decimal::new(500_000, 2)));
        assert_eq!(found.modified_labor_cost_limit, None);
        assert_eq!(found.modified_parts_cost_limit, None);
        assert_eq!(found.modified_completion_date, NaiveDate::from_ymd_opt(2026, 9, 15));
        assert_eq!(found.modified_vendor_id, Some(VendorId("VND-1".to_string())));
    }

    #[tokio::test]
    async fn inserting_the_same_audit_row_twice_is_an_error() {
        let pool = setup().await;
        let repo = SqlApprovalRepository::new(pool);

        let approval = sample_approval("APR-1", "TKT-1", ApprovalAction::Approve);
        repo.insert(approval.clone()).await.expect("first insert");

        let result = repo.insert(approval).await;
        assert!(result.is_err(), "audit rows must never be overwritten");
    }

    #[tokio::test]
    async fn a_ticket_accumulates_decision_history_in_order() {
        let pool = setup().await;
        let repo = SqlApprovalRepository::new(pool);

        let mut first = sample_approval("APR-1", "TKT-1", ApprovalAction::RequestInfo);
        first.created_at = Utc::now() - chrono::Duration::hours(2);
        let second = sample_approval("APR-2", "TKT-1", ApprovalAction::Approve);

        repo.insert(second).await.expect("insert second");
        repo.insert(first).await.expect("insert first");

        let history =
            repo.list_for_ticket(&TicketId("TKT-1".to_string())).await.expect("history");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id.0, "APR-1");
        assert_eq!(history[0].action, ApprovalAction::RequestInfo);
        assert_eq!(history[1].id.0, "APR-2");
    }

    #[tokio::test]
    async fn approvals_require_an_existing_ticket() {
        let pool = setup().await;
        let repo = SqlApprovalRepository::new(pool);

        let orphan = sample_approval("APR-1", "TKT-MISSING", ApprovalAction::Approve);
        let result = repo.insert(orphan).await;

        assert!(result.is_err(), "foreign key to service_ticket must hold");
    }
}
