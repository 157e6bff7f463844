use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offer::OfferPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub offer: OfferPolicy,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub signing_key: SecretString,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
    /// Deterministic canned replies; needs no credentials.
    Template,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::Template => "template",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://lucy.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Template,
                api_key: None,
                base_url: None,
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
            },
            offer: OfferPolicy::default(),
            ledger: LedgerConfig { signing_key: secret_value("lucy-local-ledger-key".to_string()) },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "template" => Ok(Self::Template),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama|template)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("lucy.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(offer) = patch.offer {
            let policy = &mut self.offer;
            if let Some(value) = offer.trading_days_per_month {
                policy.trading_days_per_month = value;
            }
            if let Some(value) = offer.net_margin {
                policy.net_margin = value;
            }
            if let Some(value) = offer.affordability_ratio {
                policy.affordability_ratio = value;
            }
            if let Some(value) = offer.minimum_amount {
                policy.minimum_amount = value;
            }
            if let Some(value) = offer.maximum_amount {
                policy.maximum_amount = value;
            }
            if let Some(value) = offer.rounding_step {
                policy.rounding_step = value;
            }
            if let Some(value) = offer.tenure_days {
                policy.tenure_days = value;
            }
            if let Some(value) = offer.daily_rate {
                policy.daily_rate = value;
            }
            if let Some(value) = offer.default_monthly_gross {
                policy.default_monthly_gross = value;
            }
            if let Some(value) = offer.late_fee_rate {
                policy.late_fee_rate = value;
            }
        }

        if let Some(ledger) = patch.ledger {
            if let Some(signing_key_value) = ledger.signing_key {
                self.ledger.signing_key = secret_value(signing_key_value);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LUCY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LUCY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("LUCY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LUCY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LUCY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LUCY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("LUCY_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LUCY_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LUCY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LUCY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LUCY_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LUCY_OFFER_TRADING_DAYS_PER_MONTH") {
            self.offer.trading_days_per_month =
                parse_u32("LUCY_OFFER_TRADING_DAYS_PER_MONTH", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_NET_MARGIN") {
            self.offer.net_margin = parse_decimal("LUCY_OFFER_NET_MARGIN", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_AFFORDABILITY_RATIO") {
            self.offer.affordability_ratio =
                parse_decimal("LUCY_OFFER_AFFORDABILITY_RATIO", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_MINIMUM_AMOUNT") {
            self.offer.minimum_amount = parse_decimal("LUCY_OFFER_MINIMUM_AMOUNT", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_MAXIMUM_AMOUNT") {
            self.offer.maximum_amount = parse_decimal("LUCY_OFFER_MAXIMUM_AMOUNT", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_ROUNDING_STEP") {
            self.offer.rounding_step = parse_decimal("LUCY_OFFER_ROUNDING_STEP", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_TENURE_DAYS") {
            self.offer.tenure_days = parse_u32("LUCY_OFFER_TENURE_DAYS", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_DAILY_RATE") {
            self.offer.daily_rate = parse_decimal("LUCY_OFFER_DAILY_RATE", &value)?;
        }
        if let Some(value) = read_env("LUCY_OFFER_DEFAULT_MONTHLY_GROSS") {
            self.offer.default_monthly_gross =
                parse_decimal("LUCY_OFFER_DEFAULT_MONTHLY_GROSS", &value)?;
        }

        if let Some(value) = read_env("LUCY_OFFER_LATE_FEE_RATE") {
            self.offer.late_fee_rate = parse_decimal("LUCY_OFFER_LATE_FEE_RATE", &value)?;
        }

        if let Some(value) = read_env("LUCY_LEDGER_SIGNING_KEY") {
            self.ledger.signing_key = secret_value(value);
        }

        let log_level = read_env("LUCY_LOGGING_LEVEL").or_else(|| read_env("LUCY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("LUCY_LOGGING_FORMAT").or_else(|| read_env("LUCY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_timeout_secs) = overrides.llm_timeout_secs {
            self.llm.timeout_secs = llm_timeout_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        self.offer.validate().map_err(|error| ConfigError::Validation(error.to_string()))?;
        validate_ledger(&self.ledger)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Effective configuration with secrets replaced by a marker.
    pub fn redacted(&self) -> serde_json::Value {
        let api_key = self.llm.api_key.as_ref().map(|_| "[redacted]");
        serde_json::json!({
            "database": {
                "url": self.database.url,
                "max_connections": self.database.max_connections,
                "timeout_secs": self.database.timeout_secs,
            },
            "llm": {
                "provider": self.llm.provider.as_str(),
                "model": self.llm.model,
                "api_key": api_key,
                "base_url": self.llm.base_url,
                "timeout_secs": self.llm.timeout_secs,
            },
            "offer": self.offer,
            "ledger": { "signing_key": "[redacted]" },
            "logging": {
                "level": self.logging.level,
                "format": self.logging.format,
            },
        })
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("lucy.toml"), PathBuf::from("config/lucy.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::Template => {}
    }

    Ok(())
}

fn validate_ledger(ledger: &LedgerConfig) -> Result<(), ConfigError> {
    if ledger.signing_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("ledger.signing_key must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    offer: Option<OfferPatch>,
    ledger: Option<LedgerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OfferPatch {
    trading_days_per_month: Option<u32>,
    net_margin: Option<Decimal>,
    affordability_ratio: Option<Decimal>,
    minimum_amount: Option<Decimal>,
    maximum_amount: Option<Decimal>,
    rounding_step: Option<Decimal>,
    tenure_days: Option<u32>,
    daily_rate: Option<Decimal>,
    default_monthly_gross: Option<Decimal>,
    late_fee_rate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LedgerPatch {
    signing_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_need_no_file_or_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(config.llm.provider == LlmProvider::Template, "template provider by default")?;
        ensure(config.offer.maximum_amount == Decimal::from(50_000), "default loan cap")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_LUCY_LLM_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("lucy.toml");
            fs::write(
                &path,
                r#"
[llm]
provider = "openai"
api_key = "${TEST_LUCY_LLM_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.provider == LlmProvider::OpenAi, "provider should come from file")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_LUCY_LLM_KEY"]);
        result
    }

    #[test]
    fn offer_section_overrides_policy() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LUCY_OFFER_TENURE_DAYS", "45");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("lucy.toml");
            fs::write(
                &path,
                r#"
[offer]
maximum_amount = 75000
daily_rate = "0.005"
net_margin = 0.5
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.offer.maximum_amount == Decimal::from(75_000), "cap from file")?;
            ensure(config.offer.daily_rate == Decimal::new(5, 3), "rate from file")?;
            ensure(config.offer.net_margin == Decimal::new(5, 1), "margin from file")?;
            ensure(config.offer.tenure_days == 45, "tenure from env")?;
            ensure(config.offer.minimum_amount == Decimal::from(10_000), "floor keeps default")
        })();

        clear_vars(&["LUCY_OFFER_TENURE_DAYS"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LUCY_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("LUCY_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("lucy.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
format = "pretty"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "env log format should win over file",
            )
        })();

        clear_vars(&["LUCY_DATABASE_URL", "LUCY_LOG_FORMAT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LUCY_LLM_PROVIDER", "anthropic");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["LUCY_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn invalid_offer_policy_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LUCY_OFFER_MINIMUM_AMOUNT", "90000");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected offer validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("minimum_amount")
            );
            ensure(has_message, "validation failure should mention offer.minimum_amount")
        })();

        clear_vars(&["LUCY_OFFER_MINIMUM_AMOUNT"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LUCY_OFFER_DAILY_RATE", "six tenths");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) if key == "LUCY_OFFER_DAILY_RATE" => {
                Ok(())
            }
            other => Err(format!("unexpected result: {other:?}")),
        };

        clear_vars(&["LUCY_OFFER_DAILY_RATE"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug_or_redaction() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LUCY_LLM_API_KEY", "sk-secret-value");
        env::set_var("LUCY_LEDGER_SIGNING_KEY", "ledger-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");
            let redacted = config.redacted().to_string();

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("ledger-secret-value"),
                "debug output should not contain signing key",
            )?;
            ensure(!redacted.contains("sk-secret-value"), "redacted view hides api key")?;
            ensure(redacted.contains("[redacted]"), "redacted view marks secrets")
        })();

        clear_vars(&["LUCY_LLM_API_KEY", "LUCY_LEDGER_SIGNING_KEY"]);
        result
    }
}
