use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use suggestbox_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

use super::CommandResult;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_owned()];
    for field in fields(&config) {
        let source = field_source(&field, file_doc.as_ref(), file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    CommandResult::text(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let suggestions = &config.suggestions;
    let gateway = &config.gateway;
    vec![
        Field {
            key: "discord.bot_token",
            env_keys: &["SUGGESTBOX_DISCORD_BOT_TOKEN", "DISCORD_TOKEN"],
            value: redact_token(config.discord.bot_token.expose_secret()),
        },
        Field {
            key: "suggestions.intake_channel_id",
            env_keys: &["SUGGESTBOX_INTAKE_CHANNEL_ID"],
            value: suggestions.intake_channel_id.clone(),
        },
        Field {
            key: "suggestions.votes_channel_id",
            env_keys: &["SUGGESTBOX_VOTES_CHANNEL_ID"],
            value: suggestions.votes_channel_id.clone().unwrap_or_else(|| "<unset>".to_owned()),
        },
        Field {
            key: "suggestions.open_discussion_threads",
            env_keys: &["SUGGESTBOX_OPEN_DISCUSSION_THREADS"],
            value: suggestions.open_discussion_threads.to_string(),
        },
        Field {
            key: "suggestions.companion_scan_limit",
            env_keys: &["SUGGESTBOX_COMPANION_SCAN_LIMIT"],
            value: suggestions.companion_scan_limit.to_string(),
        },
        Field {
            key: "gateway.call_timeout_secs",
            env_keys: &["SUGGESTBOX_GATEWAY_CALL_TIMEOUT_SECS"],
            value: gateway.call_timeout_secs.to_string(),
        },
        Field {
            key: "gateway.max_reconnect_retries",
            env_keys: &["SUGGESTBOX_GATEWAY_MAX_RECONNECT_RETRIES"],
            value: gateway.max_reconnect_retries.to_string(),
        },
        Field {
            key: "gateway.reconnect_base_delay_ms",
            env_keys: &[],
            value: gateway.reconnect_base_delay_ms.to_string(),
        },
        Field {
            key: "gateway.reconnect_max_delay_ms",
            env_keys: &[],
            value: gateway.reconnect_max_delay_ms.to_string(),
        },
        Field {
            key: "server.bind_address",
            env_keys: &["SUGGESTBOX_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Field {
            key: "server.health_check_port",
            env_keys: &["SUGGESTBOX_SERVER_HEALTH_CHECK_PORT"],
            value: config.server.health_check_port.to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["SUGGESTBOX_LOGGING_LEVEL", "SUGGESTBOX_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["SUGGESTBOX_LOGGING_FORMAT", "SUGGESTBOX_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    match (file_doc, file_path) {
        (Some(doc), Some(path)) if contains_path(doc, field.key) => {
            format!("file ({})", path.display())
        }
        _ => "default".to_owned(),
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |current, key| current.get(key)).is_some()
}

/// Keeps the first token segment, which only encodes the bot's user id.
pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_owned();
    }

    match trimmed.split_once('.') {
        Some((user_segment, _)) if !user_segment.is_empty() => format!("{user_segment}.***"),
        _ => "<redacted>".to_owned(),
    }
}
