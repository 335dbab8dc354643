use async_trait::async_trait;
use grub_core::reply::{Attachment, ReplyPayload};
use serde::Serialize;
use tracing::{debug, warn};

use crate::web::SlackApiError;

/// Replies bound for one channel, posted in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: String,
    pub payloads: Vec<ReplyPayload>,
}

impl OutboundMessage {
    pub fn new(channel_id: impl Into<String>, payloads: Vec<ReplyPayload>) -> Self {
        Self { channel_id: channel_id.into(), payloads }
    }

    pub fn text(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(channel_id, vec![ReplyPayload::text(text)])
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// Body of a `chat.postMessage` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "<[Attachment]>::is_empty")]
    pub attachments: &'a [Attachment],
}

impl<'a> PostMessageRequest<'a> {
    pub fn new(channel: &'a str, payload: &'a ReplyPayload) -> Self {
        Self { channel, text: &payload.text, attachments: &payload.attachments }
    }
}

#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post(&self, channel_id: &str, payload: &ReplyPayload) -> Result<(), SlackApiError>;
}

/// Posts every payload in order. A failed post is logged and the remaining
/// payloads are still attempted; returns how many were delivered.
pub async fn deliver(
    sink: &dyn ChatSink,
    message: &OutboundMessage,
    correlation_id: &str,
) -> usize {
    let mut delivered = 0;
    for payload in &message.payloads {
        match sink.post(&message.channel_id, payload).await {
            Ok(()) => delivered += 1,
            Err(error) => warn!(
                event_name = "egress.slack.post_failed",
                correlation_id,
                channel_id = %message.channel_id,
                error = %error,
                "failed to post slack reply"
            ),
        }
    }
    debug!(
        event_name = "egress.slack.replies_posted",
        correlation_id,
        channel_id = %message.channel_id,
        delivered,
        "posted slack replies"
    );
    delivered
}
