use std::sync::Arc;

use grub_core::config::{AppConfig, ConfigError};
use grub_core::{Assistant, DialogueEngine, DirectoryError};
use grub_slack::events::{bot_dispatcher, EventDispatcher, OutgoingWebhookHandler};
use grub_slack::socket::{ReconnectPolicy, SocketModeRunner};
use grub_slack::transport::SlackSocketTransport;
use grub_slack::web::{SlackApiError, SlackWebClient};
use thiserror::Error;
use tracing::info;

use crate::bot::FoodBot;
use crate::yelp::YelpClient;

pub type FoodAssistant = Assistant<YelpClient, Arc<SlackWebClient>>;

pub struct Application {
    pub config: AppConfig,
    pub bot_user_id: String,
    pub dialogue: Arc<DialogueEngine>,
    pub webhook_dispatcher: Option<Arc<EventDispatcher>>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client could not be created: {0}")]
    SlackClient(#[source] SlackApiError),
    #[error("slack rejected the bot token: {0}")]
    SlackAuth(#[source] SlackApiError),
    #[error("directory client could not be created: {0}")]
    Directory(#[source] DirectoryError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;
    let slack =
        Arc::new(SlackWebClient::from_config(&config.slack).map_err(BootstrapError::SlackClient)?);
    let bot_user_id = slack.auth_test().await.map_err(BootstrapError::SlackAuth)?;
    info!(
        event_name = "system.bootstrap.slack_authenticated",
        correlation_id = "bootstrap",
        bot_user_id = %bot_user_id,
        "slack bot identity resolved"
    );

    let directory = YelpClient::from_config(&config.directory).map_err(BootstrapError::Directory)?;
    let dialogue = Arc::new(DialogueEngine::new(config.dialogue.timeout()));
    let assistant: Arc<FoodAssistant> =
        Arc::new(Assistant::new(dialogue.clone(), directory, slack.clone()));

    let bot = FoodBot::new(assistant, slack.clone());
    let transport = Arc::new(SlackSocketTransport::new(slack.clone(), bot_user_id.clone()));
    let slack_runner = SocketModeRunner::new(
        transport,
        bot_dispatcher(bot),
        slack,
        ReconnectPolicy::default(),
    );

    let webhook_dispatcher = config.server.outgoing_webhook_enabled.then(|| {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(OutgoingWebhookHandler);
        Arc::new(dispatcher)
    });

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        dialogue_timeout_secs = dialogue.timeout().as_secs(),
        outgoing_webhook_enabled = config.server.outgoing_webhook_enabled,
        "application bootstrap complete"
    );

    Ok(Application { config, bot_user_id, dialogue, webhook_dispatcher, slack_runner })
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};
    use grub_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use serde_json::json;

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    async fn serve_slack(auth_ok: bool) -> String {
        let app = Router::new().route(
            "/auth.test",
            post(move || async move {
                if auth_ok {
                    Json(json!({"ok": true, "user_id": "UBOT"}))
                } else {
                    Json(json!({"ok": false, "error": "invalid_auth"}))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{address}")
    }

    fn options(slack_base_url: String) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                slack_api_base_url: Some(slack_base_url),
                directory_api_key: Some("yelp-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_slack_tokens() {
        let mut options = options("http://127.0.0.1:9".to_string());
        options.overrides.slack_app_token = Some("invalid-token".to_string());

        let result = bootstrap(options).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_resolves_the_bot_identity() {
        let app = bootstrap(options(serve_slack(true).await))
            .await
            .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.bot_user_id, "UBOT");
        assert_eq!(app.dialogue.active_count().await, 0);
        assert!(app.webhook_dispatcher.is_none());
    }

    #[tokio::test]
    async fn unvalidated_config_is_rejected_before_any_network_call() {
        let result = bootstrap_with_config(AppConfig::default()).await;

        let error = result.err().expect("default config lacks tokens");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("slack."));
    }

    #[tokio::test]
    async fn rejected_bot_token_is_fatal() {
        let result = bootstrap(options(serve_slack(false).await)).await;
        assert!(matches!(result, Err(BootstrapError::SlackAuth(_))));
    }
}
