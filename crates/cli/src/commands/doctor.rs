use secrecy::ExposeSecret;
use serde::Serialize;
use suggestbox_core::config::{AppConfig, LoadOptions};

use super::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const TOKEN_CHECK: &str = "discord_token_shape";
const ROUTING_CHECK: &str = "channel_routing";

/// Exits non-zero when any check does not pass.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()));
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report<E: ToString>(loaded: Result<AppConfig, E>) -> DoctorReport {
    let checks = match loaded {
        Ok(config) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_owned(),
            },
            check_token_shape(config.discord.bot_token.expose_secret()),
            check_channel_routing(&config),
        ],
        Err(error) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
            skipped(TOKEN_CHECK),
            skipped(ROUTING_CHECK),
        ],
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let (overall_status, summary) = if all_pass {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    } else {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    };

    DoctorReport { overall_status, summary: summary.to_owned(), checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_owned(),
    }
}

// Bot tokens are three dot-separated segments: user id, timestamp, signature.
fn check_token_shape(token: &str) -> DoctorCheck {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty()) {
        DoctorCheck {
            name: TOKEN_CHECK,
            status: CheckStatus::Pass,
            details: "token has the expected three-segment shape".to_owned(),
        }
    } else {
        DoctorCheck {
            name: TOKEN_CHECK,
            status: CheckStatus::Fail,
            details: format!(
                "expected three dot-separated segments, found {}; copy the token from the Bot page",
                segments.len()
            ),
        }
    }
}

fn check_channel_routing(config: &AppConfig) -> DoctorCheck {
    let suggestions = &config.suggestions;
    let votes = match &suggestions.votes_channel_id {
        Some(channel_id) => format!("vote details go to {channel_id}"),
        None => "vote details disabled".to_owned(),
    };
    let threads = if suggestions.open_discussion_threads { "on" } else { "off" };

    DoctorCheck {
        name: ROUTING_CHECK,
        status: CheckStatus::Pass,
        details: format!(
            "suggestions read from {}; {votes}; discussion threads {threads}",
            suggestions.intake_channel_id
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use suggestbox_core::config::AppConfig;

    use super::{build_report, check_token_shape, render_human, CheckStatus};

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.discord.bot_token = "MTIz.Ghx1.c2ln".to_owned().into();
        config.suggestions.intake_channel_id = "100".to_owned();
        config.suggestions.votes_channel_id = Some("200".to_owned());
        config
    }

    #[test]
    fn token_shape_requires_three_segments() {
        assert_eq!(check_token_shape("a.b.c").status, CheckStatus::Pass);
        assert_eq!(check_token_shape("a.b").status, CheckStatus::Fail);
        assert_eq!(check_token_shape("a..c").status, CheckStatus::Fail);
    }

    #[test]
    fn loaded_config_passes_every_check() {
        let report = build_report::<String>(Ok(configured()));

        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert_eq!(report.checks.len(), 3);
        assert!(report.checks[2].details.contains("vote details go to 200"));
    }

    #[test]
    fn load_failure_skips_dependent_checks() {
        let report = build_report(Err("discord.bot_token is required"));

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert_eq!(report.checks[0].status, CheckStatus::Fail);
        assert!(report.checks[1..].iter().all(|check| check.status == CheckStatus::Skipped));
        assert!(render_human(&report).contains("- [fail] config_validation"));
    }
}
