pub mod chat;
pub mod config;
pub mod migrate;
pub mod offer;
pub mod replay;

use lucy_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use serde_json::Value;

/// Error class, message and exit code of a failed command step.
pub type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::ok(command, message.into(), None)
    }

    pub fn success_with_details(command: &str, message: impl Into<String>, details: Value) -> Self {
        Self::ok(command, message.into(), Some(details))
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    /// Puts free-form text (a transcript, a listing) above the JSON payload line.
    pub fn with_preamble(mut self, preamble: &str) -> Self {
        if !preamble.is_empty() {
            self.output = format!("{}\n{}", preamble.trim_end(), self.output);
        }
        self
    }

    fn ok(command: &str, message: String, details: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message,
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

pub(crate) fn load_config() -> Result<AppConfig, Failure> {
    AppConfig::load(LoadOptions::default())
        .map_err(|error| ("config_validation", format!("configuration issue: {error}"), 2))
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, Failure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
