use serde_json::json;

use fleetops_core::config::{AppConfig, LoadOptions};
use fleetops_db::{connect, migrations};

use crate::commands::{CommandResult, ErrorClass};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                ErrorClass::ConfigValidation,
                format!("configuration issue: {error}"),
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
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

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(&pool)
            .await
            .map_err(|error| (ErrorClass::Migration, error.to_string()))?;

        pool.close().await;
        Ok::<i64, (ErrorClass, String)>(applied)
    });

    match result {
        Ok(applied) => {
            let available = migrations::MIGRATOR.iter().count();
            CommandResult::success_with_details(
                "migrate",
                format!("schema is current at {applied} applied migrations"),
                Some(json!({ "applied": applied, "available": available })),
            )
        }
        Err((class, message)) => CommandResult::failure("migrate", class, message),
    }
}
