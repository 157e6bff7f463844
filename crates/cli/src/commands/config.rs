use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lucy_core::config::AppConfig;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// Prints one attributed line per setting, then the redacted effective config as JSON details.
pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("config", failure),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let lines = settings(&config)
        .into_iter()
        .map(|(key_path, value, env_key)| {
            let source = field_source(
                key_path,
                env_key,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            );
            render_line(key_path, &value, source)
        })
        .collect::<Vec<_>>()
        .join("\n");

    CommandResult::success_with_details(
        "config",
        "effective config (source precedence: env > file > default)",
        config.redacted(),
    )
    .with_preamble(&lines)
}

fn settings(config: &AppConfig) -> Vec<(&'static str, String, Option<&'static str>)> {
    let offer = &config.offer;
    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    vec![
        ("database.url", config.database.url.clone(), Some("LUCY_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("LUCY_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("LUCY_DATABASE_TIMEOUT_SECS"),
        ),
        ("llm.provider", config.llm.provider.as_str().to_string(), Some("LUCY_LLM_PROVIDER")),
        ("llm.model", config.llm.model.clone(), Some("LUCY_LLM_MODEL")),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            Some("LUCY_LLM_BASE_URL"),
        ),
        ("llm.api_key", api_key.to_string(), Some("LUCY_LLM_API_KEY")),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), Some("LUCY_LLM_TIMEOUT_SECS")),
        (
            "offer.trading_days_per_month",
            offer.trading_days_per_month.to_string(),
            Some("LUCY_OFFER_TRADING_DAYS_PER_MONTH"),
        ),
        ("offer.net_margin", offer.net_margin.to_string(), Some("LUCY_OFFER_NET_MARGIN")),
        (
            "offer.affordability_ratio",
            offer.affordability_ratio.to_string(),
            Some("LUCY_OFFER_AFFORDABILITY_RATIO"),
        ),
        (
            "offer.minimum_amount",
            offer.minimum_amount.to_string(),
            Some("LUCY_OFFER_MINIMUM_AMOUNT"),
        ),
        (
            "offer.maximum_amount",
            offer.maximum_amount.to_string(),
            Some("LUCY_OFFER_MAXIMUM_AMOUNT"),
        ),
        (
            "offer.rounding_step",
            offer.rounding_step.to_string(),
            Some("LUCY_OFFER_ROUNDING_STEP"),
        ),
        ("offer.tenure_days", offer.tenure_days.to_string(), Some("LUCY_OFFER_TENURE_DAYS")),
        ("offer.daily_rate", offer.daily_rate.to_string(), Some("LUCY_OFFER_DAILY_RATE")),
        (
            "offer.default_monthly_gross",
            offer.default_monthly_gross.to_string(),
            Some("LUCY_OFFER_DEFAULT_MONTHLY_GROSS"),
        ),
        (
            "offer.late_fee_rate",
            offer.late_fee_rate.to_string(),
            Some("LUCY_OFFER_LATE_FEE_RATE"),
        ),
        ("ledger.signing_key", "<redacted>".to_string(), Some("LUCY_LEDGER_SIGNING_KEY")),
        ("logging.level", config.logging.level.clone(), Some("LUCY_LOGGING_LEVEL")),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            Some("LUCY_LOGGING_FORMAT"),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("lucy.toml"), PathBuf::from("config/lucy.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
