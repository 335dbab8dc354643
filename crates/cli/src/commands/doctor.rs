use grub_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::config::redact_token;
use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::output(exit_code, output);
    }

    CommandResult::output(exit_code, render_human(&report))
}

pub fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_tokens(&config));
            checks.push(check_directory_key(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_token_readiness", "directory_key_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    let bot_token = config.slack.bot_token.expose_secret().trim();
    let app_token = config.slack.app_token.expose_secret().trim();

    let mut problems = Vec::new();
    if !bot_token.starts_with("xoxb-") {
        problems.push("bot token must start with `xoxb-`");
    }
    if !app_token.starts_with("xapp-") {
        problems.push("app token must start with `xapp-` for socket mode");
    }

    if problems.is_empty() {
        DoctorCheck {
            name: "slack_token_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "bot token {} and app token {} are present",
                redact_token(bot_token),
                redact_token(app_token)
            ),
        }
    } else {
        DoctorCheck {
            name: "slack_token_readiness",
            status: CheckStatus::Fail,
            details: problems.join("; "),
        }
    }
}

fn check_directory_key(config: &AppConfig) -> DoctorCheck {
    let api_key = config.directory.api_key.expose_secret();
    if api_key.trim().is_empty() {
        return DoctorCheck {
            name: "directory_key_readiness",
            status: CheckStatus::Fail,
            details: "directory api key is empty".to_string(),
        };
    }
    if api_key.chars().any(char::is_whitespace) {
        return DoctorCheck {
            name: "directory_key_readiness",
            status: CheckStatus::Fail,
            details: "directory api key contains whitespace".to_string(),
        };
    }

    DoctorCheck {
        name: "directory_key_readiness",
        status: CheckStatus::Pass,
        details: format!("api key present for `{}`", config.directory.base_url),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

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

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
