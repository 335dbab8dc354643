//! Slack Web API client for the handful of methods the bot calls.

use std::time::Duration;

use async_trait::async_trait;
use grub_core::config::SlackConfig;
use grub_core::reply::ReplyPayload;
use grub_core::{LookupError, UserLookup};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages::{ChatSink, PostMessageRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack request failed: {0}")]
    Http(String),
    #[error("slack returned http status {status} for {method}")]
    Status { method: &'static str, status: u16 },
    #[error("slack method {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack response for {method} could not be decoded: {detail}")]
    Decode { method: &'static str, detail: String },
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Deserialize)]
struct AuthTestBody {
    user_id: String,
}

#[derive(Deserialize)]
struct ConnectionsOpenBody {
    url: String,
}

#[derive(Deserialize)]
struct UsersInfoBody {
    user: SlackUser,
}

#[derive(Deserialize)]
struct SlackUser {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct Empty {}

#[derive(Clone, Copy)]
enum Token {
    Bot,
    App,
}

pub struct SlackWebClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    app_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        app_token: SecretString,
    ) -> Result<Self, SlackApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| SlackApiError::Http(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            bot_token,
            app_token,
        })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, SlackApiError> {
        Self::new(config.api_base_url.clone(), config.bot_token.clone(), config.app_token.clone())
    }

    /// The bot's own user id, used to recognise mentions.
    pub async fn auth_test(&self) -> Result<String, SlackApiError> {
        let request = self.request("auth.test", Token::Bot, reqwest::Method::POST);
        let body: AuthTestBody = self.call("auth.test", request).await?;
        Ok(body.user_id)
    }

    /// Asks Slack for a fresh Socket Mode WebSocket URL.
    pub async fn open_connection(&self) -> Result<String, SlackApiError> {
        let request = self.request("apps.connections.open", Token::App, reqwest::Method::POST);
        let body: ConnectionsOpenBody = self.call("apps.connections.open", request).await?;
        Ok(body.url)
    }

    pub async fn post_message(
        &self,
        channel_id: &str,
        payload: &ReplyPayload,
    ) -> Result<(), SlackApiError> {
        let request = self
            .request("chat.postMessage", Token::Bot, reqwest::Method::POST)
            .json(&PostMessageRequest::new(channel_id, payload));
        let _: Empty = self.call("chat.postMessage", request).await?;
        Ok(())
    }

    /// `Ok(None)` when Slack reports `user_not_found`.
    pub async fn user_name(&self, user_id: &str) -> Result<Option<String>, SlackApiError> {
        let request = self
            .request("users.info", Token::Bot, reqwest::Method::GET)
            .query(&[("user", user_id)]);
        match self.call::<UsersInfoBody>("users.info", request).await {
            Ok(body) if body.user.name.trim().is_empty() => Ok(None),
            Ok(body) => Ok(Some(body.user.name)),
            Err(SlackApiError::Api { error, .. }) if error == "user_not_found" => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn request(
        &self,
        method: &str,
        token: Token,
        verb: reqwest::Method,
    ) -> reqwest::RequestBuilder {
        let token = match token {
            Token::Bot => self.bot_token.expose_secret(),
            Token::App => self.app_token.expose_secret(),
        };
        self.client.request(verb, format!("{}/{method}", self.base_url)).bearer_auth(token)
    }

    async fn call<T>(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
    {
        let response =
            request.send().await.map_err(|error| SlackApiError::Http(error.to_string()))?;

        if !response.status().is_success() {
            warn!(
                event_name = "egress.slack.http_status",
                method,
                status = %response.status(),
                "slack web api returned an error status"
            );
            return Err(SlackApiError::Status { method, status: response.status().as_u16() });
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|error| SlackApiError::Decode { method, detail: error.to_string() })?;

        if !envelope.ok {
            return Err(SlackApiError::Api {
                method,
                error: envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }

        debug!(event_name = "egress.slack.call_succeeded", method, "slack web api call succeeded");
        envelope.body.ok_or_else(|| SlackApiError::Decode {
            method,
            detail: "response body missing expected fields".to_owned(),
        })
    }
}

#[async_trait]
impl ChatSink for SlackWebClient {
    async fn post(&self, channel_id: &str, payload: &ReplyPayload) -> Result<(), SlackApiError> {
        self.post_message(channel_id, payload).await
    }
}

#[async_trait]
impl UserLookup for SlackWebClient {
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, LookupError> {
        self.user_name(user_id).await.map_err(|error| LookupError(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use grub_core::reply::ReplyPayload;
    use grub_core::UserLookup;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use super::{SlackApiError, SlackWebClient};

    #[derive(Clone, Default)]
    struct Recorded {
        posts: Arc<Mutex<Vec<Value>>>,
        auth_headers: Arc<Mutex<Vec<String>>>,
    }

    async fn record_auth(recorded: &Recorded, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        recorded.auth_headers.lock().await.push(value);
    }

    async fn serve(recorded: Recorded) -> String {
        let app = Router::new()
            .route(
                "/auth.test",
                post(|State(recorded): State<Recorded>, headers: HeaderMap| async move {
                    record_auth(&recorded, &headers).await;
                    Json(json!({"ok": true, "user_id": "UBOT", "team": "T1"}))
                }),
            )
            .route(
                "/apps.connections.open",
                post(|State(recorded): State<Recorded>, headers: HeaderMap| async move {
                    record_auth(&recorded, &headers).await;
                    Json(json!({"ok": true, "url": "wss://example.invalid/link"}))
                }),
            )
            .route(
                "/chat.postMessage",
                post(|State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                    let channel = body["channel"].as_str().unwrap_or_default().to_owned();
                    recorded.posts.lock().await.push(body);
                    if channel == "C-missing" {
                        Json(json!({"ok": false, "error": "channel_not_found"}))
                    } else {
                        Json(json!({"ok": true, "channel": channel, "ts": "1.0"}))
                    }
                }),
            )
            .route(
                "/users.info",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    match params.get("user").map(String::as_str) {
                        Some("U1") => Json(json!({"ok": true, "user": {"id": "U1", "name": "alice"}})),
                        Some("U-broken") => Json(json!({"ok": false, "error": "ratelimited"})),
                        _ => Json(json!({"ok": false, "error": "user_not_found"})),
                    }
                }),
            )
            .with_state(recorded);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{address}")
    }

    fn client(base_url: String) -> SlackWebClient {
        SlackWebClient::new(
            base_url,
            SecretString::from("xoxb-bot-token"),
            SecretString::from("xapp-app-token"),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn auth_test_and_connections_open_use_the_right_tokens() {
        let recorded = Recorded::default();
        let slack = client(serve(recorded.clone()).await);

        assert_eq!(slack.auth_test().await.expect("auth.test"), "UBOT");
        assert_eq!(
            slack.open_connection().await.expect("connections.open"),
            "wss://example.invalid/link"
        );
        assert_eq!(
            *recorded.auth_headers.lock().await,
            vec!["Bearer xoxb-bot-token", "Bearer xapp-app-token"]
        );
    }

    #[tokio::test]
    async fn post_message_sends_channel_and_text() {
        let recorded = Recorded::default();
        let slack = client(serve(recorded.clone()).await);

        slack.post_message("C1", &ReplyPayload::text("Hello, alice!")).await.expect("post");

        let posts = recorded.posts.lock().await;
        assert_eq!(posts[0], json!({"channel": "C1", "text": "Hello, alice!"}));
    }

    #[tokio::test]
    async fn api_level_failures_surface_the_slack_error_code() {
        let slack = client(serve(Recorded::default()).await);

        let error = slack
            .post_message("C-missing", &ReplyPayload::text("hi"))
            .await
            .expect_err("channel missing");
        assert_eq!(
            error,
            SlackApiError::Api { method: "chat.postMessage", error: "channel_not_found".to_owned() }
        );
    }

    #[tokio::test]
    async fn user_lookup_distinguishes_unknown_users_from_failures() {
        let slack = client(serve(Recorded::default()).await);

        assert_eq!(slack.display_name("U1").await, Ok(Some("alice".to_owned())));
        assert_eq!(slack.display_name("U-nobody").await, Ok(None));
        assert!(slack.display_name("U-broken").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        let slack = client("http://127.0.0.1:9".to_owned());
        assert!(matches!(slack.auth_test().await, Err(SlackApiError::Http(_))));
    }
}
