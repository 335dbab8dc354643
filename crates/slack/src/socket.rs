use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent};
use crate::messages::{deliver, ChatSink};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// Both variants are fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SocketError {
    #[error("could not establish the initial socket mode connection: {0}")]
    InitialConnect(TransportError),
    #[error("socket mode gave up after {attempts} reconnect attempts: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` ends the current session; the runner reconnects.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    sink: Arc<dyn ChatSink>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        sink: Arc<dyn ChatSink>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, sink, reconnect_policy }
    }

    /// Runs until the connection is lost for good. Sessions that Slack ends
    /// cleanly are reopened straight away; failures back off and retry.
    pub async fn start(&self) -> Result<(), SocketError> {
        let mut connected_once = false;
        let mut attempt = 0_u32;

        loop {
            match self.connect_and_pump(&mut attempt, &mut connected_once).await {
                Ok(()) => {
                    attempt = 0;
                    info!(
                        event_name = "ingress.slack.session_ended",
                        "socket mode session ended; reconnecting"
                    );
                    let delay = self.reconnect_policy.backoff(0);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(transport_error) if !connected_once => {
                    error!(
                        event_name = "ingress.slack.connect_failed",
                        error = %transport_error,
                        "initial socket mode connection failed"
                    );
                    return Err(SocketError::InitialConnect(transport_error));
                }
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        error!(
                            event_name = "ingress.slack.retries_exhausted",
                            max_retries = self.reconnect_policy.max_retries,
                            error = %transport_error,
                            "socket mode retries exhausted"
                        );
                        return Err(SocketError::RetriesExhausted {
                            attempts: attempt,
                            last: transport_error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Resets `attempt` once the transport connects, so the retry budget only
    /// counts consecutive failed reconnects.
    async fn connect_and_pump(
        &self,
        attempt: &mut u32,
        connected_once: &mut bool,
    ) -> Result<(), TransportError> {
        info!(attempt = *attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        *connected_once = true;
        info!(attempt = *attempt, "socket mode transport connected");
        *attempt = 0;

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                self.transport.disconnect().await?;
                return Ok(());
            };
            let (user_id, channel_id) = correlation_fields(&envelope);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                user_id = user_id.unwrap_or("unknown"),
                channel_id = channel_id.unwrap_or("unknown"),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(message)) => {
                    deliver(self.sink.as_ref(), &message, &context.correlation_id).await;
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        user_id = user_id.unwrap_or("unknown"),
                        channel_id = channel_id.unwrap_or("unknown"),
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            }
        }
    }
}

fn correlation_fields(envelope: &SlackEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        SlackEvent::Message(event) => {
            (Some(event.user_id.as_str()), Some(event.channel_id.as_str()))
        }
        SlackEvent::OutgoingWebhook(event) => {
            (Some(event.user_id.as_str()), Some(event.channel_id.as_str()))
        }
        SlackEvent::Unsupported { .. } => (None, None),
    }
}
