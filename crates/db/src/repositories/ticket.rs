use sqlx::Row;

use fleetops_core::domain::ticket::{
    ProfileId, ServiceTicket, SubsidiaryId, TicketId, VehicleId, VendorId,
};

use super::{
    parse_decimal, parse_optional_decimal, parse_optional_timestamp, parse_priority, parse_status,
    parse_ticket_type, parse_timestamp, parse_urgency, priority_as_str, status_as_str,
    ticket_type_as_str, urgency_as_str, QueueEntry, RepositoryError, TicketRepository,
};
use crate::DbPool;

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const TICKET_COLUMNS: &str = "id, ticket_number, title, description, ticket_type, priority, \
     urgency, status, estimated_total_cost, actual_total_cost, vehicle_id, requested_by, \
     vendor_id, subsidiary_id, created_at, submitted_at, approved_at, completed_at, updated_at";

pub(crate) fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceTicket, RepositoryError> {
    let get_text = |name: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(name).map_err(|e| RepositoryError::Decode(e.to_string()))
    };
    let get_opt_text = |name: &str| -> Result<Option<String>, RepositoryError> {
        row.try_get::<Option<String>, _>(name).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    Ok(ServiceTicket {
        id: TicketId(get_text("id")?),
        ticket_number: get_text("ticket_number")?,
        title: get_text("title")?,
        description: get_text("description")?,
        ticket_type: parse_ticket_type(&get_text("ticket_type")?)?,
        priority: parse_priority(&get_text("priority")?)?,
        urgency: parse_urgency(&get_text("urgency")?)?,
        status: parse_status(&get_text("status")?)?,
        estimated_total_cost: parse_decimal(&get_text("estimated_total_cost")?)?,
        actual_total_cost: parse_optional_decimal(get_opt_text("actual_total_cost")?)?,
        vehicle_id: VehicleId(get_text("vehicle_id")?),
        requested_by: ProfileId(get_text("requested_by")?),
        vendor_id: get_opt_text("vendor_id")?.map(VendorId),
        subsidiary_id: SubsidiaryId(get_text("subsidiary_id")?),
        created_at: parse_timestamp(&get_text("created_at")?)?,
        submitted_at: parse_optional_timestamp(get_opt_text("submitted_at")?)?,
        approved_at: parse_optional_timestamp(get_opt_text("approved_at")?)?,
        completed_at: parse_optional_timestamp(get_opt_text("completed_at")?)?,
        updated_at: parse_timestamp(&get_text("updated_at")?)?,
    })
}

#[async_trait::async_trait]
impl TicketRepository for SqlTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<ServiceTicket>, RepositoryError> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM service_ticket WHERE id = ?");
        let row = sqlx::query(&query).bind(&id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_ticket(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, ticket: ServiceTicket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO service_ticket (id, ticket_number, title, description, ticket_type,
                                         priority, urgency, status, estimated_total_cost,
                                         actual_total_cost, vehicle_id, requested_by, vendor_id,
                                         subsidiary_id, created_at, submitted_at, approved_at,
                                         completed_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 ticket_type = excluded.ticket_type,
                 priority = excluded.priority,
                 urgency = excluded.urgency,
                 status = excluded.status,
                 estimated_total_cost = excluded.estimated_total_cost,
                 actual_total_cost = excluded.actual_total_cost,
                 vendor_id = excluded.vendor_id,
                 submitted_at = excluded.submitted_at,
                 approved_at = excluded.approved_at,
                 completed_at = excluded.completed_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&ticket.id.0)
        .bind(&ticket.ticket_number)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket_type_as_str(ticket.ticket_type))
        .bind(priority_as_str(ticket.priority))
        .bind(urgency_as_str(ticket.urgency))
        .bind(status_as_str(ticket.status))
        .bind(ticket.estimated_total_cost.to_string())
        .bind(ticket.actual_total_cost.map(|cost| cost.to_string()))
        .bind(&ticket.vehicle_id.0)
        .bind(&ticket.requested_by.0)
        .bind(ticket.vendor_id.as_ref().map(|id| id.0.clone()))
        .bind(&ticket.subsidiary_id.0)
        .bind(ticket.created_at.to_rfc3339())
        .bind(ticket.submitted_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.approved_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_submitted(
        &self,
        subsidiary_id: &SubsidiaryId,
    ) -> Result<Vec<QueueEntry>, RepositoryError> {
        let query = format!(
            "SELECT {}, v.plate AS vehicle_plate, v.make AS vehicle_make,
                    v.model AS vehicle_model, p.full_name AS requester_name,
                    vn.name AS vendor_name
             FROM service_ticket t
             JOIN vehicle v ON v.id = t.vehicle_id
             JOIN profile p ON p.id = t.requested_by
             LEFT JOIN vendor vn ON vn.id = t.vendor_id
             WHERE t.subsidiary_id = ? AND t.status = 'submitted'
             ORDER BY t.submitted_at ASC",
            TICKET_COLUMNS
                .split(", ")
                .map(|col| format!("t.{col}"))
                .collect::<Vec<_>>()
                .join(", "),
        );

        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&query).bind(&subsidiary_id.0).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let ticket = row_to_ticket(row)?;
                let plate: String = row
                    .try_get("vehicle_plate")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let make: String = row
                    .try_get("vehicle_make")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let model: String = row
                    .try_get("vehicle_model")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let requester_name: String = row
                    .try_get("requester_name")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let vendor_name: Option<String> = row
                    .try_get("vendor_name")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;

                Ok(QueueEntry {
                    ticket,
                    vehicle_label: format!("{make} {model} ({plate})"),
                    requester_name,
                    vendor_name,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use fleetops_core::domain::ticket::{
        ProfileId, ServiceTicket, SubsidiaryId, TicketId, TicketPriority, TicketStatus, TicketType,
        TicketUrgency, VehicleId,
    };

    use super::SqlTicketRepository;
    use crate::fixtures::{insert_profile, insert_vehicle};
    use crate::repositories::TicketRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        insert_vehicle(&pool, "VEH-1", "SUB-1").await.expect("vehicle");
        insert_profile(&pool, "USR-1", "Dana Reyes", "SUB-1").await.expect("profile");
        pool
    }

    fn sample_ticket(id: &str, status: TicketStatus) -> ServiceTicket {
        let now = Utc::now();
        ServiceTicket {
            id: TicketId(id.to_string()),
            ticket_number: format!("ST-{id}"),
            title: "Coolant leak".to_string(),
            description: "Visible puddle under radiator".to_string(),
            ticket_type: TicketType::Breakdown,
            priority: TicketPriority::High,
            urgency: TicketUrgency::Within24h,
            status,
            estimated_total_cost: Decimal::new(32_500, 2),
            actual_total_cost: None,
            vehicle_id: VehicleId("VEH-1".to_string()),
            requested_by: ProfileId("USR-1".to_string()),
            vendor_id: None,
            subsidiary_id: SubsidiaryId("SUB-1".to_string()),
            created_at: now,
            submitted_at: (status != TicketStatus::Draft).then_some(now),
            approved_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_all_fields() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        let mut ticket = sample_ticket("TKT-1", TicketStatus::Submitted);
        ticket.actual_total_cost = Some(Decimal::new(30_000, 2));
        repo.save(ticket.clone()).await.expect("save");

        let found = repo
            .find_by_id(&TicketId("TKT-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.ticket_number, ticket.ticket_number);
        assert_eq!(found.status, TicketStatus::Submitted);
        assert_eq!(found.estimated_total_cost, ticket.estimated_total_cost);
        assert_eq!(found.actual_total_cost, ticket.actual_total_cost);
        assert_eq!(found.submitted_at.map(|dt| dt.timestamp()), ticket.submitted_at.map(|dt| dt.timestamp()));
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown_ticket() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        let found = repo.find_by_id(&TicketId("TKT-404".to_string())).await.expect("find");
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn queue_only_contains_submitted_tickets_for_the_subsidiary() {
        let pool = setup().await;
        insert_vehicle(&pool, "VEH-2", "SUB-2").await.expect("vehicle");
        insert_profile(&pool, "USR-2", "Lee Okafor", "SUB-2").await.expect("profile");
        let repo = SqlTicketRepository::new(pool);

        repo.save(sample_ticket("TKT-1", TicketStatus::Submitted)).await.expect("save 1");
        repo.save(sample_ticket("TKT-2", TicketStatus::Draft)).await.expect("save 2");
        repo.save(sample_ticket("TKT-3", TicketStatus::Approved)).await.expect("save 3");

        let mut foreign = sample_ticket("TKT-4", TicketStatus::Submitted);
        foreign.subsidiary_id = SubsidiaryId("SUB-2".to_string());
        foreign.vehicle_id = VehicleId("VEH-2".to_string());
        foreign.requested_by = ProfileId("USR-2".to_string());
        repo.save(foreign).await.expect("save 4");

        let queue =
            repo.list_submitted(&SubsidiaryId("SUB-1".to_string())).await.expect("list queue");

        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].ticket.id.0, "TKT-1");
        assert_eq!(queue[0].requester_name, "Dana Reyes");
        assert!(queue[0].vehicle_label.contains("VEH-1"));
    }

    #[tokio::test]
    async fn queue_is_ordered_oldest_submission_first() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        let now = Utc::now();
        let mut older = sample_ticket("TKT-OLD", TicketStatus::Submitted);
        older.submitted_at = Some(now - Duration::hours(6));
        let mut newer = sample_ticket("TKT-NEW", TicketStatus::Submitted);
        newer.submitted_at = Some(now);

        repo.save(newer).await.expect("save newer");
        repo.save(older).await.expect("save older");

        let queue =
            repo.list_submitted(&SubsidiaryId("SUB-1".to_string())).await.expect("list queue");

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].ticket.id.0, "TKT-OLD");
        assert_eq!(queue[1].ticket.id.0, "TKT-NEW");
    }

    #[tokio::test]
    async fn empty_queue_is_a_valid_result() {
        let pool = setup().await;
        let repo = SqlTicketRepository::new(pool);

        let queue =
            repo.list_submitted(&SubsidiaryId("SUB-1".to_string())).await.expect("list queue");

        assert!(queue.is_empty());
    }
}
