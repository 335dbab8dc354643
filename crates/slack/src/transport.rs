//! Socket Mode over a real WebSocket.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::events::{parse_frame, SlackEnvelope, SocketFrame};
use crate::socket::{SocketTransport, TransportError};
use crate::web::{SlackApiError, SlackWebClient};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Source of Socket Mode URLs; each URL is good for one connection.
#[async_trait]
pub trait ConnectionOpener: Send + Sync {
    async fn open_connection(&self) -> Result<String, SlackApiError>;
}

#[async_trait]
impl ConnectionOpener for SlackWebClient {
    async fn open_connection(&self) -> Result<String, SlackApiError> {
        SlackWebClient::open_connection(self).await
    }
}

pub struct SlackSocketTransport {
    opener: Arc<dyn ConnectionOpener>,
    bot_user_id: String,
    stream: Mutex<Option<WsStream>>,
}

impl SlackSocketTransport {
    pub fn new(opener: Arc<dyn ConnectionOpener>, bot_user_id: impl Into<String>) -> Self {
        Self { opener, bot_user_id: bot_user_id.into(), stream: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for SlackSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .opener
            .open_connection()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Receive("socket is not connected".to_owned()));
        };

        loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                None => return Ok(None),
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    info!(
                        event_name = "ingress.slack.socket_closed",
                        reason = ?frame,
                        "slack closed the socket"
                    );
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {
                    continue
                }
            };

            match parse_frame(text.as_str(), &self.bot_user_id) {
                Ok(SocketFrame::Envelope(envelope)) => return Ok(Some(envelope)),
                Ok(SocketFrame::Hello) => {
                    debug!(event_name = "ingress.slack.hello", "socket mode session ready");
                }
                Ok(SocketFrame::Disconnect { reason }) => {
                    info!(
                        event_name = "ingress.slack.disconnect_requested",
                        reason = %reason,
                        "slack requested a reconnect"
                    );
                    return Ok(None);
                }
                Ok(SocketFrame::Other { frame_type }) => {
                    debug!(frame_type = %frame_type, "ignoring socket frame");
                }
                Err(error) => {
                    warn!(
                        event_name = "ingress.slack.frame_rejected",
                        error = %error,
                        "dropping undecodable socket frame"
                    );
                }
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("socket is not connected".to_owned()));
        };

        let ack = json!({ "envelope_id": envelope_id }).to_string();
        stream
            .send(Message::Text(ack.into()))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        match stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(error) => Err(TransportError::Disconnect(error.to_string())),
        }
    }
}
