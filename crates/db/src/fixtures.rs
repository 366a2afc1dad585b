use serde::Serialize;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo tickets and the states the seed leaves them in.
const SEED_TICKETS: &[SeedTicketContract] = &[
    SeedTicketContract {
        ticket_id: "tkt-demo-001",
        ticket_number: "ST-2026-0001",
        status: "submitted",
        subsidiary_id: "sub-north",
        expected_approval_count: 0,
        description: "Brake pad replacement awaiting approval",
    },
    SeedTicketContract {
        ticket_id: "tkt-demo-002",
        ticket_number: "ST-2026-0002",
        status: "submitted",
        subsidiary_id: "sub-north",
        expected_approval_count: 0,
        description: "Critical coolant leak awaiting approval",
    },
    SeedTicketContract {
        ticket_id: "tkt-demo-003",
        ticket_number: "ST-2026-0003",
        status: "draft",
        subsidiary_id: "sub-north",
        expected_approval_count: 0,
        description: "Annual service still in draft",
    },
    SeedTicketContract {
        ticket_id: "tkt-demo-004",
        ticket_number: "ST-2026-0004",
        status: "approved",
        subsidiary_id: "sub-south",
        expected_approval_count: 1,
        description: "Windshield repair already approved",
    },
];

const SEED_TICKET_IDS: &[&str] =
    &["tkt-demo-001", "tkt-demo-002", "tkt-demo-003", "tkt-demo-004"];
const SEED_APPROVAL_IDS: &[&str] = &["apr-demo-001"];
const SEED_VEHICLE_IDS: &[&str] = &["veh-demo-001", "veh-demo-002", "veh-demo-003"];
const SEED_PROFILE_IDS: &[&str] =
    &["usr-demo-driver", "usr-demo-lead", "usr-demo-approver", "usr-demo-south"];
const SEED_VENDOR_IDS: &[&str] = &["vnd-demo-001", "vnd-demo-002"];

/// Deterministic demo dataset: two submitted tickets in the north queue, a
/// draft, and an already-approved ticket with its audit row.
pub struct DemoDataset;

impl DemoDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset. Reloading is idempotent.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let tickets_seeded = SEED_TICKETS
            .iter()
            .map(|ticket| TicketSeedInfo {
                ticket_id: ticket.ticket_id,
                status: ticket.status,
                description: ticket.description,
            })
            .collect();

        Ok(SeedResult { tickets_seeded })
    }

    /// Verify the seeded rows match the contract above.
    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let mut checks = Vec::new();

        for (label, table, ids) in [
            ("vehicles", "vehicle", SEED_VEHICLE_IDS),
            ("profiles", "profile", SEED_PROFILE_IDS),
            ("vendors", "vendor", SEED_VENDOR_IDS),
        ] {
            let quoted = sql_array_from_ids(ids);
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id IN {quoted}"))
                    .fetch_one(pool)
                    .await?;
            checks.push((label, count == ids.len() as i64));
        }

        for ticket in SEED_TICKETS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM service_ticket
                 WHERE id = ?1 AND ticket_number = ?2 AND status = ?3 AND subsidiary_id = ?4)",
            )
            .bind(ticket.ticket_id)
            .bind(ticket.ticket_number)
            .bind(ticket.status)
            .bind(ticket.subsidiary_id)
            .fetch_one(pool)
            .await?;
            checks.push((ticket.ticket_id, exists == 1));

            let approvals: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM ticket_approval WHERE ticket_id = ?1")
                    .bind(ticket.ticket_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((ticket.approval_count_label(), approvals == ticket.expected_approval_count));
        }

        // Submitted seeds must be visible in queue order.
        let queue_ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM service_ticket
             WHERE subsidiary_id = 'sub-north' AND status = 'submitted'
             ORDER BY submitted_at ASC",
        )
        .fetch_all(pool)
        .await?;
        checks.push(("north-queue-order", queue_ids == ["tkt-demo-001", "tkt-demo-002"]));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(SeedVerification { all_present, checks })
    }

    /// Remove seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let approvals = sql_array_from_ids(SEED_APPROVAL_IDS);
        let tickets = sql_array_from_ids(SEED_TICKET_IDS);
        let vehicles = sql_array_from_ids(SEED_VEHICLE_IDS);
        let profiles = sql_array_from_ids(SEED_PROFILE_IDS);
        let vendors = sql_array_from_ids(SEED_VENDOR_IDS);

        sqlx::query(&format!("DELETE FROM ticket_approval WHERE id IN {approvals}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM service_ticket WHERE id IN {tickets}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM vehicle WHERE id IN {vehicles}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM profile WHERE id IN {profiles}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM vendor WHERE id IN {vendors}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTicketContract {
    ticket_id: &'static str,
    ticket_number: &'static str,
    status: &'static str,
    subsidiary_id: &'static str,
    expected_approval_count: i64,
    description: &'static str,
}

impl SeedTicketContract {
    fn approval_count_label(&self) -> &'static str {
        match self.ticket_id {
            "tkt-demo-001" => "tkt-demo-001-approvals",
            "tkt-demo-002" => "tkt-demo-002-approvals",
            "tkt-demo-003" => "tkt-demo-003-approvals",
            _ => "tkt-demo-004-approvals",
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub tickets_seeded: Vec<TicketSeedInfo>,
}

#[derive(Debug, Serialize)]
pub struct TicketSeedInfo {
    pub ticket_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Insert a minimal vehicle row. The plate mirrors the id so tests can spot
/// the vehicle in rendered labels.
pub async fn insert_vehicle(
    pool: &DbPool,
    id: &str,
    subsidiary_id: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO vehicle (id, plate, make, model, subsidiary_id) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(id)
        .bind("Volvo")
        .bind("FH16")
        .bind(subsidiary_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_profile(
    pool: &DbPool,
    id: &str,
    full_name: &str,
    subsidiary_id: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO profile (id, full_name, email, subsidiary_id) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(full_name)
        .bind(format!("{id}@example.com"))
        .bind(subsidiary_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_vendor(pool: &DbPool, id: &str, name: &str) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO vendor (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a ticket already in the submitted state, ready for a decision.
pub async fn insert_submitted_ticket(
    pool: &DbPool,
    id: &str,
    subsidiary_id: &str,
    vehicle_id: &str,
    requested_by: &str,
) -> Result<(), RepositoryError> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO service_ticket (
             id, ticket_number, title, description, ticket_type, priority, urgency, status,
             estimated_total_cost, actual_total_cost, vehicle_id, requested_by, vendor_id,
             subsidiary_id, created_at, submitted_at, approved_at, completed_at, updated_at
         ) VALUES (?, ?, ?, ?, 'preventive', 'high', 'within_24h', 'submitted',
                   '325.00', NULL, ?, ?, NULL, ?, ?, ?, NULL, NULL, ?)",
    )
    .bind(id)
    .bind(format!("ST-{id}"))
    .bind("Brake pad replacement")
    .bind("Front axle pads below wear limit")
    .bind(vehicle_id)
    .bind(requested_by)
    .bind(subsidiary_id)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!DemoDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn seed_load_verify_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present, "checks: {:?}", first_verification.checks);
        assert_eq!(first.tickets_seeded.len(), 4);

        let second = DemoDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.tickets_seeded.len(), 4);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn clean_removes_every_seeded_row() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        DemoDataset::load(&pool).await.expect("load seed fixtures");
        DemoDataset::clean(&pool).await.expect("clean seed fixtures");

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM service_ticket")
            .fetch_one(&pool)
            .await
            .expect("count tickets");
        assert_eq!(remaining, 0);
    }
}
