use std::sync::Arc;

use async_trait::async_trait;
use grub_core::{Assistant, DirectorySearch, PendingSearch, UserLookup};
use grub_slack::events::{EventContext, EventHandlerError, MessageEvent, MessageService};
use grub_slack::messages::{deliver, ChatSink, OutboundMessage};
use tokio::task::JoinHandle;
use tracing::info;

/// Bridges Slack messages into the assistant. Directory searches run on their
/// own task so the socket loop keeps reading while Yelp answers.
pub struct FoodBot<D, U> {
    assistant: Arc<Assistant<D, U>>,
    sink: Arc<dyn ChatSink>,
}

impl<D, U> FoodBot<D, U>
where
    D: DirectorySearch + 'static,
    U: UserLookup + 'static,
{
    pub fn new(assistant: Arc<Assistant<D, U>>, sink: Arc<dyn ChatSink>) -> Self {
        Self { assistant, sink }
    }

    fn spawn_resolution(
        &self,
        notice: OutboundMessage,
        search: PendingSearch,
        correlation_id: String,
    ) -> JoinHandle<()> {
        let assistant = self.assistant.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            deliver(sink.as_ref(), &notice, &correlation_id).await;
            let replies = assistant.resolve(&search).await;
            let answer = OutboundMessage::new(notice.channel_id.clone(), replies);
            deliver(sink.as_ref(), &answer, &correlation_id).await;
            info!(
                event_name = "dialogue.answered",
                correlation_id = %correlation_id,
                conversation_id = %search.conversation_id,
                user_id = %search.key.user_id,
                channel_id = %search.key.channel_id,
                "food dialogue answered"
            );
        })
    }
}

#[async_trait]
impl<D, U> MessageService for FoodBot<D, U>
where
    D: DirectorySearch + 'static,
    U: UserLookup + 'static,
{
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<Option<OutboundMessage>, EventHandlerError> {
        let response = self.assistant.handle(&event.to_inbound()).await;
        let outbound = OutboundMessage::new(event.channel_id.clone(), response.replies);

        match response.pending_search {
            Some(search) => {
                self.spawn_resolution(outbound, search, ctx.correlation_id.clone());
                Ok(None)
            }
            None if outbound.is_empty() => Ok(None),
            None => Ok(Some(outbound)),
        }
    }
}
