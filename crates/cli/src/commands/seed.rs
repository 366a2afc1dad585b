use serde_json::json;

use fleetops_core::config::{AppConfig, LoadOptions};
use fleetops_db::{connect, migrations, DemoDataset, TicketSeedInfo};

use crate::commands::{CommandResult, ErrorClass};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                ErrorClass::ConfigValidation,
                format!("configuration issue: {error}"),
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                ErrorClass::RuntimeInit,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| (ErrorClass::DbConnectivity, error.to_string()))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| (ErrorClass::Migration, error.to_string()))?;

        let seed_result = DemoDataset::load(&pool)
            .await
            .map_err(|error| (ErrorClass::SeedExecution, error.to_string()))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| (ErrorClass::SeedVerification, error.to_string()))?;

        let run_result: Result<Vec<TicketSeedInfo>, (ErrorClass, String)> =
            if !verification.all_present {
                let failed_checks = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(*check))
                    .collect::<Vec<_>>();
                let message = if failed_checks.is_empty() {
                    "Some seed data failed to load".to_string()
                } else {
                    format!("Seed verification failed for checks: {}", failed_checks.join(", "))
                };
                Err((ErrorClass::SeedVerification, message))
            } else {
                Ok(seed_result.tickets_seeded)
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(tickets) => {
            let ticket_descriptions: Vec<String> = tickets
                .iter()
                .map(|t| format!("  - {} [{}]: {}", t.ticket_id, t.status, t.description))
                .collect();
            let message = format!("demo dataset loaded:\n{}", ticket_descriptions.join("\n"));
            CommandResult::success_with_details(
                "seed",
                message,
                Some(json!({ "tickets": tickets })),
            )
        }
        Err((class, message)) => CommandResult::failure("seed", class, message),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks =
            [("vehicles", true), ("tkt-demo-001", false), ("north-queue-order", false)];

        let failed_checks = checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(*check))
            .collect::<Vec<_>>();

        let message = if failed_checks.is_empty() {
            "Some seed data failed to load".to_string()
        } else {
            format!("Seed verification failed for checks: {}", failed_checks.join(", "))
        };

        assert_eq!(
            message,
            "Seed verification failed for checks: tkt-demo-001, north-queue-order"
        );
    }
}
