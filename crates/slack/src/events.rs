use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use grub_core::{reply, AddressingContext, InboundMessage};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::messages::OutboundMessage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    OutgoingWebhook(OutgoingWebhookEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::OutgoingWebhook(_) => SlackEventType::OutgoingWebhook,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    OutgoingWebhook,
    Unsupported,
}

/// A user message with the bot mention already stripped from `text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub context: AddressingContext,
    pub ts: String,
}

impl MessageEvent {
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage {
            user_id: self.user_id.clone(),
            channel_id: self.channel_id.clone(),
            text: self.text.clone(),
            context: self.context,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingWebhookEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub trigger_word: Option<String>,
}

/// One decoded Socket Mode frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
    Other { frame_type: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("socket frame is not valid json: {0}")]
    Json(String),
    #[error("socket frame of type `{frame_type}` is missing its envelope_id")]
    MissingEnvelopeId { frame_type: String },
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Value,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: String,
    channel_type: Option<String>,
    bot_id: Option<String>,
    subtype: Option<String>,
}

/// Decodes a Socket Mode frame. `bot_user_id` is needed to tell direct
/// mentions and mentions apart from ambient channel chatter.
pub fn parse_frame(raw: &str, bot_user_id: &str) -> Result<SocketFrame, FrameError> {
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|error| FrameError::Json(error.to_string()))?;

    match frame.frame_type.as_str() {
        "hello" => return Ok(SocketFrame::Hello),
        "disconnect" => {
            return Ok(SocketFrame::Disconnect {
                reason: frame.reason.unwrap_or_else(|| "unspecified".to_owned()),
            })
        }
        _ => {}
    }

    let Some(envelope_id) = frame.envelope_id else {
        if frame.frame_type == "events_api" {
            return Err(FrameError::MissingEnvelopeId { frame_type: frame.frame_type });
        }
        return Ok(SocketFrame::Other { frame_type: frame.frame_type });
    };

    let event = match frame.frame_type.as_str() {
        "events_api" => event_from_payload(&frame.payload, bot_user_id),
        other => SlackEvent::Unsupported { event_type: other.to_owned() },
    };

    Ok(SocketFrame::Envelope(SlackEnvelope { envelope_id, event }))
}

fn event_from_payload(payload: &Value, bot_user_id: &str) -> SlackEvent {
    let raw_event = payload.get("event").cloned().unwrap_or(Value::Null);
    let Ok(message) = serde_json::from_value::<RawMessage>(raw_event) else {
        return SlackEvent::Unsupported { event_type: "malformed".to_owned() };
    };

    if message.event_type != "message" {
        return SlackEvent::Unsupported { event_type: message.event_type };
    }
    if let Some(subtype) = message.subtype {
        return SlackEvent::Unsupported { event_type: format!("message.{subtype}") };
    }
    if message.bot_id.is_some() || message.user.is_empty() || message.user == bot_user_id {
        return SlackEvent::Unsupported { event_type: "message.bot".to_owned() };
    }

    let (context, text) =
        classify_addressing(&message.text, message.channel_type.as_deref(), bot_user_id);
    SlackEvent::Message(MessageEvent {
        channel_id: message.channel,
        user_id: message.user,
        text,
        context,
        ts: message.ts,
    })
}

/// Works out how a message was directed at the bot and returns the text with
/// the bot's mention removed.
pub fn classify_addressing(
    text: &str,
    channel_type: Option<&str>,
    bot_user_id: &str,
) -> (AddressingContext, String) {
    let mention = format!("<@{bot_user_id}>");
    let leading = text.trim_start();

    if let Some(rest) = leading.strip_prefix(&mention) {
        let rest = rest.trim_start();
        let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
        let context = if channel_type == Some("im") {
            AddressingContext::DirectMessage
        } else {
            AddressingContext::DirectMention
        };
        return (context, rest.to_owned());
    }

    if channel_type == Some("im") {
        return (AddressingContext::DirectMessage, text.to_owned());
    }

    if !bot_user_id.is_empty() && text.contains(&mention) {
        let stripped = text.replace(&mention, "");
        return (AddressingContext::Mention, stripped.trim().to_owned());
    }

    (AddressingContext::Ambient, text.to_owned())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(OutboundMessage),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("message handler failure: {0}")]
    Message(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers the message handler backed by `service` plus the fixed
/// outgoing-webhook acknowledgement.
pub fn bot_dispatcher<S>(service: S) -> EventDispatcher
where
    S: MessageService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(service));
    dispatcher.register(OutgoingWebhookHandler);
    dispatcher
}

#[async_trait]
pub trait MessageService: Send + Sync {
    /// Replies returned here are posted by the caller before the next
    /// envelope is read. Services that post on their own return `None`.
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Option<OutboundMessage>, EventHandlerError>;
}

pub struct MessageHandler<S> {
    service: S,
}

impl<S> MessageHandler<S>
where
    S: MessageService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let message = self.service.handle_message(event, ctx).await?;
        Ok(match message {
            Some(message) => HandlerResult::Responded(message),
            None => HandlerResult::Processed,
        })
    }
}

pub struct OutgoingWebhookHandler;

#[async_trait]
impl EventHandler for OutgoingWebhookHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::OutgoingWebhook
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::OutgoingWebhook(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        Ok(HandlerResult::Responded(OutboundMessage::new(
            event.channel_id.clone(),
            vec![reply::webhook_acknowledgement()],
        )))
    }
}
