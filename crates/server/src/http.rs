use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use grub_core::DialogueEngine;
use grub_slack::events::{
    EventContext, EventDispatcher, HandlerResult, OutgoingWebhookEvent, SlackEnvelope, SlackEvent,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct HttpState {
    dialogue: Arc<DialogueEngine>,
    webhook_dispatcher: Option<Arc<EventDispatcher>>,
}

impl HttpState {
    pub fn new(
        dialogue: Arc<DialogueEngine>,
        webhook_dispatcher: Option<Arc<EventDispatcher>>,
    ) -> Self {
        Self { dialogue, webhook_dispatcher }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub active_conversations: usize,
    pub checked_at: String,
}

/// Fields Slack posts for an outgoing webhook.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutgoingWebhookForm {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
    pub trigger_word: Option<String>,
}

#[derive(Debug, Serialize)]
struct WebhookReply {
    text: String,
}

pub fn router(state: HttpState, static_dir: &Path) -> Router {
    let mut router = Router::new().route("/", get(index)).route("/health", get(health));
    if state.webhook_dispatcher.is_some() {
        router = router.route("/slack/outgoing-webhook", post(outgoing_webhook));
    }
    router.fallback_service(ServeDir::new(static_dir)).with_state(state)
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    state: HttpState,
    static_dir: &Path,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let app = router(state, static_dir);

    info!(
        event_name = "system.http.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http surface started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            error!(
                event_name = "system.http.error",
                correlation_id = "bootstrap",
                error = %error,
                "http server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

async fn index() -> &'static str {
    "hi"
}

pub async fn health(State(state): State<HttpState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready".to_string(),
        service: "grub-server".to_string(),
        active_conversations: state.dialogue.active_count().await,
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}

async fn outgoing_webhook(
    State(state): State<HttpState>,
    Form(form): Form<OutgoingWebhookForm>,
) -> Response {
    let Some(dispatcher) = state.webhook_dispatcher else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let envelope = SlackEnvelope {
        envelope_id: format!("webhook-{}", form.timestamp),
        event: SlackEvent::OutgoingWebhook(OutgoingWebhookEvent {
            channel_id: form.channel_id,
            user_id: form.user_id,
            text: form.text,
            trigger_word: form.trigger_word,
        }),
    };
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };

    match dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Responded(message)) => {
            let text = message
                .payloads
                .iter()
                .map(|payload| payload.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            Json(WebhookReply { text }).into_response()
        }
        Ok(HandlerResult::Processed | HandlerResult::Ignored) => {
            StatusCode::NO_CONTENT.into_response()
        }
        Err(error) => {
            warn!(
                event_name = "ingress.webhook.dispatch_failed",
                correlation_id = %context.correlation_id,
                error = %error,
                "outgoing webhook dispatch failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
