use std::fs;
use std::path::Path;

use grub_core::config::{env_source, resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use super::CommandResult;

/// Exit code used when the effective configuration fails to load or validate.
pub const CONFIG_FAILURE_EXIT: u8 = 2;

struct Field {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                error.to_string(),
                CONFIG_FAILURE_EXIT,
            )
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::output(0, lines.join("\n"))
}

fn field(key: &'static str, env_key: &'static str, value: String) -> Field {
    Field { key, env_key, value }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        field(
            "slack.app_token",
            "GRUB_SLACK_APP_TOKEN",
            redact_token(config.slack.app_token.expose_secret()),
        ),
        field(
            "slack.bot_token",
            "GRUB_SLACK_BOT_TOKEN",
            redact_token(config.slack.bot_token.expose_secret()),
        ),
        field("slack.api_base_url", "GRUB_SLACK_API_BASE_URL", config.slack.api_base_url.clone()),
        field("directory.api_key", "GRUB_DIRECTORY_API_KEY", redact_key(&config.directory.api_key)),
        field("directory.base_url", "GRUB_DIRECTORY_BASE_URL", config.directory.base_url.clone()),
        field(
            "directory.timeout_secs",
            "GRUB_DIRECTORY_TIMEOUT_SECS",
            config.directory.timeout_secs.to_string(),
        ),
        field(
            "directory.result_limit",
            "GRUB_DIRECTORY_RESULT_LIMIT",
            config.directory.result_limit.to_string(),
        ),
        field(
            "server.bind_address",
            "GRUB_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        field("server.port", "GRUB_SERVER_PORT", config.server.port.to_string()),
        field(
            "server.static_dir",
            "GRUB_SERVER_STATIC_DIR",
            config.server.static_dir.display().to_string(),
        ),
        field(
            "server.outgoing_webhook_enabled",
            "GRUB_SERVER_OUTGOING_WEBHOOK_ENABLED",
            config.server.outgoing_webhook_enabled.to_string(),
        ),
        field(
            "dialogue.timeout_secs",
            "GRUB_DIALOGUE_TIMEOUT_SECS",
            config.dialogue.timeout_secs.to_string(),
        ),
        field(
            "dialogue.sweep_interval_secs",
            "GRUB_DIALOGUE_SWEEP_INTERVAL_SECS",
            config.dialogue.sweep_interval_secs.to_string(),
        ),
        field("logging.level", "GRUB_LOGGING_LEVEL", config.logging.level.clone()),
        field("logging.format", "GRUB_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(var) = env_source(env_key) {
        return format!("env ({var})");
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

pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

fn redact_key(key: &SecretString) -> String {
    if key.expose_secret().trim().is_empty() {
        "<unset>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
