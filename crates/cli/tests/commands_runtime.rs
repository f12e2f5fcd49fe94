use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use suggestbox_cli::commands::{config, doctor};

const VALID_ENV: &[(&str, &str)] = &[
    ("SUGGESTBOX_DISCORD_BOT_TOKEN", "MTIz.Ghx1.c2lnbmF0dXJl"),
    ("SUGGESTBOX_INTAKE_CHANNEL_ID", "100"),
];

#[test]
fn config_reports_sources_and_redacts_the_token() {
    with_env(VALID_ENV, || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        assert!(result.output.contains(
            "- discord.bot_token = MTIz.*** (source: env (SUGGESTBOX_DISCORD_BOT_TOKEN))"
        ));
        assert!(!result.output.contains("c2lnbmF0dXJl"));
        let intake = "- suggestions.intake_channel_id = 100 (source: env (SUGGESTBOX_INTAKE_CHANNEL_ID))";
        assert!(result.output.contains(intake));
        let votes = "- suggestions.votes_channel_id = <unset> (source: default)";
        assert!(result.output.contains(votes));
    });
}

#[test]
fn config_attributes_the_legacy_token_variable() {
    with_env(&[("DISCORD_TOKEN", "MTIz.a.b"), ("SUGGESTBOX_INTAKE_CHANNEL_ID", "100")], || {
        let result = config::run();

        assert!(result.output.contains("(source: env (DISCORD_TOKEN))"));
    });
}

#[test]
fn config_returns_validation_failure_without_a_token() {
    with_env(&[("SUGGESTBOX_INTAKE_CHANNEL_ID", "100")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("discord.bot_token"));
    });
}

#[test]
fn doctor_json_passes_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks array")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, ["config_validation", "discord_token_shape", "channel_routing"]);
    });
}

#[test]
fn doctor_flags_a_token_with_the_wrong_shape() {
    with_env(
        &[("SUGGESTBOX_DISCORD_BOT_TOKEN", "not-a-token"), ("SUGGESTBOX_INTAKE_CHANNEL_ID", "100")],
        || {
            let result = doctor::run(false);
            assert_eq!(result.exit_code, 1);

            assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
            assert!(result.output.contains("- [ok] config_validation"));
            assert!(result.output.contains("- [fail] discord_token_shape"));
        },
    );
}

#[test]
fn doctor_skips_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DISCORD_TOKEN",
        "SUGGESTBOX_DISCORD_BOT_TOKEN",
        "SUGGESTBOX_INTAKE_CHANNEL_ID",
        "SUGGESTBOX_VOTES_CHANNEL_ID",
        "SUGGESTBOX_OPEN_DISCUSSION_THREADS",
        "SUGGESTBOX_COMPANION_SCAN_LIMIT",
        "SUGGESTBOX_GATEWAY_CALL_TIMEOUT_SECS",
        "SUGGESTBOX_GATEWAY_MAX_RECONNECT_RETRIES",
        "SUGGESTBOX_SERVER_BIND_ADDRESS",
        "SUGGESTBOX_SERVER_HEALTH_CHECK_PORT",
        "SUGGESTBOX_LOGGING_LEVEL",
        "SUGGESTBOX_LOGGING_FORMAT",
        "SUGGESTBOX_LOG_LEVEL",
        "SUGGESTBOX_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
