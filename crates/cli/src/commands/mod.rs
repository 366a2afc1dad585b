pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use serde_json::Value;

/// Failure classes an operator command can report. Each class owns its exit
/// code so scripts can branch on the failure without parsing the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    ConfigValidation,
    RuntimeInit,
    DbConnectivity,
    Migration,
    SeedExecution,
    SeedVerification,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigValidation => "config_validation",
            Self::RuntimeInit => "runtime_init",
            Self::DbConnectivity => "db_connectivity",
            Self::Migration => "migration",
            Self::SeedExecution => "seed_execution",
            Self::SeedVerification => "seed_verification",
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Self::ConfigValidation => 2,
            Self::RuntimeInit => 3,
            Self::DbConnectivity => 4,
            Self::Migration => 5,
            Self::SeedExecution => 6,
            Self::SeedVerification => 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandReport {
    command: &'static str,
    status: &'static str,
    error_class: Option<&'static str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &'static str, message: impl Into<String>) -> Self {
        Self::success_with_details(command, message, None)
    }

    pub fn success_with_details(
        command: &'static str,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let report = CommandReport {
            command,
            status: "ok",
            error_class: None,
            message: message.into(),
            details,
        };
        Self { exit_code: 0, output: serialize_report(report) }
    }

    pub fn failure(command: &'static str, class: ErrorClass, message: impl Into<String>) -> Self {
        let report = CommandReport {
            command,
            status: "error",
            error_class: Some(class.as_str()),
            message: message.into(),
            details: None,
        };
        Self { exit_code: class.exit_code(), output: serialize_report(report) }
    }
}

fn serialize_report(report: CommandReport) -> String {
    serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
