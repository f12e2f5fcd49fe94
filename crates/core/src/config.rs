use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "suggestbox.toml";
pub const MAX_COMPANION_SCAN_LIMIT: u8 = 100;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub suggestions: SuggestionsConfig,
    pub gateway: GatewayConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionsConfig {
    pub intake_channel_id: String,
    pub votes_channel_id: Option<String>,
    pub open_discussion_threads: bool,
    pub companion_scan_limit: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    pub call_timeout_secs: u64,
    pub max_reconnect_retries: u32,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub bot_token: Option<String>,
    pub intake_channel_id: Option<String>,
    pub votes_channel_id: Option<String>,
    pub open_discussion_threads: Option<bool>,
    pub log_level: Option<String>,
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
            discord: DiscordConfig { bot_token: String::new().into() },
            suggestions: SuggestionsConfig {
                intake_channel_id: String::new(),
                votes_channel_id: None,
                open_discussion_threads: true,
                companion_scan_limit: 50,
            },
            gateway: GatewayConfig {
                call_timeout_secs: 10,
                max_reconnect_retries: 5,
                reconnect_base_delay_ms: 250,
                reconnect_max_delay_ms: 5_000,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), health_check_port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = secret_value(bot_token_value);
            }
        }

        if let Some(suggestions) = patch.suggestions {
            if let Some(intake_channel_id) = suggestions.intake_channel_id {
                self.suggestions.intake_channel_id = intake_channel_id;
            }
            if let Some(votes_channel_id) = suggestions.votes_channel_id {
                self.suggestions.votes_channel_id = non_blank(votes_channel_id);
            }
            if let Some(open_discussion_threads) = suggestions.open_discussion_threads {
                self.suggestions.open_discussion_threads = open_discussion_threads;
            }
            if let Some(companion_scan_limit) = suggestions.companion_scan_limit {
                self.suggestions.companion_scan_limit = companion_scan_limit;
            }
        }

        if let Some(gateway) = patch.gateway {
            if let Some(call_timeout_secs) = gateway.call_timeout_secs {
                self.gateway.call_timeout_secs = call_timeout_secs;
            }
            if let Some(max_reconnect_retries) = gateway.max_reconnect_retries {
                self.gateway.max_reconnect_retries = max_reconnect_retries;
            }
            if let Some(reconnect_base_delay_ms) = gateway.reconnect_base_delay_ms {
                self.gateway.reconnect_base_delay_ms = reconnect_base_delay_ms;
            }
            if let Some(reconnect_max_delay_ms) = gateway.reconnect_max_delay_ms {
                self.gateway.reconnect_max_delay_ms = reconnect_max_delay_ms;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
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
        let bot_token =
            read_env("SUGGESTBOX_DISCORD_BOT_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = bot_token {
            self.discord.bot_token = secret_value(value);
        }

        if let Some(value) = read_env("SUGGESTBOX_INTAKE_CHANNEL_ID") {
            self.suggestions.intake_channel_id = value;
        }
        if let Some(value) = read_env("SUGGESTBOX_VOTES_CHANNEL_ID") {
            self.suggestions.votes_channel_id = Some(value);
        }
        if let Some(value) = read_env("SUGGESTBOX_OPEN_DISCUSSION_THREADS") {
            self.suggestions.open_discussion_threads =
                parse_bool("SUGGESTBOX_OPEN_DISCUSSION_THREADS", &value)?;
        }
        if let Some(value) = read_env("SUGGESTBOX_COMPANION_SCAN_LIMIT") {
            self.suggestions.companion_scan_limit =
                parse_u8("SUGGESTBOX_COMPANION_SCAN_LIMIT", &value)?;
        }

        if let Some(value) = read_env("SUGGESTBOX_GATEWAY_CALL_TIMEOUT_SECS") {
            self.gateway.call_timeout_secs =
                parse_u64("SUGGESTBOX_GATEWAY_CALL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SUGGESTBOX_GATEWAY_MAX_RECONNECT_RETRIES") {
            self.gateway.max_reconnect_retries =
                parse_u32("SUGGESTBOX_GATEWAY_MAX_RECONNECT_RETRIES", &value)?;
        }

        if let Some(value) = read_env("SUGGESTBOX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SUGGESTBOX_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("SUGGESTBOX_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level =
            read_env("SUGGESTBOX_LOGGING_LEVEL").or_else(|| read_env("SUGGESTBOX_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SUGGESTBOX_LOGGING_FORMAT").or_else(|| read_env("SUGGESTBOX_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = secret_value(bot_token);
        }
        if let Some(intake_channel_id) = overrides.intake_channel_id {
            self.suggestions.intake_channel_id = intake_channel_id;
        }
        if let Some(votes_channel_id) = overrides.votes_channel_id {
            self.suggestions.votes_channel_id = non_blank(votes_channel_id);
        }
        if let Some(open_discussion_threads) = overrides.open_discussion_threads {
            self.suggestions.open_discussion_threads = open_discussion_threads;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_suggestions(&self.suggestions)?;
        validate_gateway(&self.gateway)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
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

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let bot_token = discord.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Get it from https://discord.com/developers/applications > Your App > Bot > Reset Token".to_string(),
        ));
    }
    if bot_token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.bot_token must not contain whitespace (hint: drop any `Bot ` prefix)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_suggestions(suggestions: &SuggestionsConfig) -> Result<(), ConfigError> {
    if suggestions.intake_channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "suggestions.intake_channel_id is required (right-click the channel > Copy Channel ID)"
                .to_string(),
        ));
    }
    if !is_snowflake(&suggestions.intake_channel_id) {
        return Err(ConfigError::Validation(format!(
            "suggestions.intake_channel_id must be a numeric channel id, got `{}`",
            suggestions.intake_channel_id
        )));
    }

    if let Some(votes_channel_id) = &suggestions.votes_channel_id {
        if !is_snowflake(votes_channel_id) {
            return Err(ConfigError::Validation(format!(
                "suggestions.votes_channel_id must be a numeric channel id, got `{votes_channel_id}`"
            )));
        }
        if votes_channel_id == &suggestions.intake_channel_id {
            return Err(ConfigError::Validation(
                "suggestions.votes_channel_id must differ from suggestions.intake_channel_id"
                    .to_string(),
            ));
        }
    }

    if suggestions.companion_scan_limit == 0
        || suggestions.companion_scan_limit > MAX_COMPANION_SCAN_LIMIT
    {
        return Err(ConfigError::Validation(format!(
            "suggestions.companion_scan_limit must be in range 1..={MAX_COMPANION_SCAN_LIMIT}"
        )));
    }

    Ok(())
}

fn validate_gateway(gateway: &GatewayConfig) -> Result<(), ConfigError> {
    if gateway.call_timeout_secs == 0 || gateway.call_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "gateway.call_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if gateway.reconnect_base_delay_ms > gateway.reconnect_max_delay_ms {
        return Err(ConfigError::Validation(
            "gateway.reconnect_base_delay_ms must not exceed gateway.reconnect_max_delay_ms"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
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

fn is_snowflake(value: &str) -> bool {
    !value.is_empty() && value.len() <= 20 && value.bytes().all(|byte| byte.is_ascii_digit())
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    suggestions: Option<SuggestionsPatch>,
    gateway: Option<GatewayPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionsPatch {
    intake_channel_id: Option<String>,
    votes_channel_id: Option<String>,
    open_discussion_threads: Option<bool>,
    companion_scan_limit: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    call_timeout_secs: Option<u64>,
    max_reconnect_retries: Option<u32>,
    reconnect_base_delay_ms: Option<u64>,
    reconnect_max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
