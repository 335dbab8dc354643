//! Per-message orchestration: trigger matching, the food dialogue and the
//! canned greeting/help replies.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::dialogue::{ConversationKey, DialogueEngine, DialogueEvent, DialogueTurn, PendingSearch};
use crate::directory::{DirectorySearch, SearchQuery};
use crate::errors::{BotError, LookupError};
use crate::intents::{default_matcher, AddressingContext, Intent, TriggerMatcher};
use crate::reply::{self, ReplyPayload};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
    pub context: AddressingContext,
}

impl InboundMessage {
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(self.user_id.clone(), self.channel_id.clone())
    }
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    /// `Ok(None)` means the platform knows no such user.
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, LookupError>;
}

#[async_trait]
impl<T> UserLookup for Arc<T>
where
    T: UserLookup + ?Sized,
{
    async fn display_name(&self, user_id: &str) -> Result<Option<String>, LookupError> {
        (**self).display_name(user_id).await
    }
}

/// Replies to send now, plus a search to run once they are out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantResponse {
    pub replies: Vec<ReplyPayload>,
    pub pending_search: Option<PendingSearch>,
}

impl AssistantResponse {
    fn ignored() -> Self {
        Self::default()
    }

    fn reply(payload: ReplyPayload) -> Self {
        Self { replies: vec![payload], pending_search: None }
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty() && self.pending_search.is_none()
    }
}

pub struct Assistant<D, U> {
    matcher: TriggerMatcher,
    dialogue: Arc<DialogueEngine>,
    directory: D,
    users: U,
}

impl<D, U> Assistant<D, U>
where
    D: DirectorySearch,
    U: UserLookup,
{
    pub fn new(dialogue: Arc<DialogueEngine>, directory: D, users: U) -> Self {
        Self::with_matcher(default_matcher(), dialogue, directory, users)
    }

    pub fn with_matcher(
        matcher: TriggerMatcher,
        dialogue: Arc<DialogueEngine>,
        directory: D,
        users: U,
    ) -> Self {
        Self { matcher, dialogue, directory, users }
    }

    pub fn dialogue(&self) -> &Arc<DialogueEngine> {
        &self.dialogue
    }

    /// A food trigger always (re)starts the dialogue. Any other message from a
    /// user with an open dialogue is taken as the pending answer before
    /// greeting/help matching is attempted.
    pub async fn handle(&self, message: &InboundMessage) -> AssistantResponse {
        let intent = self.matcher.match_intent(&message.text, message.context);
        let key = message.conversation_key();
        debug!(
            event_name = "ingress.message.classified",
            user_id = %message.user_id,
            channel_id = %message.channel_id,
            context = message.context.as_str(),
            intent = intent.map_or("none", |intent| intent.as_str()),
            "classified inbound message"
        );

        if intent == Some(Intent::FoodRequest) {
            let display_name = self.lookup_display_name(&message.user_id).await;
            let start = self.dialogue.start(key, display_name).await;
            return AssistantResponse::reply(start.prompt);
        }

        if let Some(turn) = self.dialogue.answer(&key, &message.text).await {
            return match turn {
                DialogueTurn::Prompt(prompt) => AssistantResponse::reply(prompt),
                DialogueTurn::Resolve { notice, search } => {
                    AssistantResponse { replies: vec![notice], pending_search: Some(search) }
                }
            };
        }

        match intent {
            Some(Intent::Greeting) => {
                let display_name = self.lookup_display_name(&message.user_id).await;
                AssistantResponse::reply(reply::greeting(display_name.as_deref()))
            }
            Some(Intent::Help) => {
                let display_name = self.lookup_display_name(&message.user_id).await;
                AssistantResponse::reply(reply::help(display_name.as_deref()))
            }
            Some(Intent::FoodRequest) | None => AssistantResponse::ignored(),
        }
    }

    /// Runs the directory search for a completed questionnaire and always
    /// yields at least one reply: the result, a not-found notice or an apology.
    pub async fn resolve(&self, search: &PendingSearch) -> Vec<ReplyPayload> {
        let query = match SearchQuery::new(search.food_choice.clone(), search.location.clone()) {
            Ok(query) => query,
            Err(error) => {
                warn!(
                    event_name = "dialogue.search_skipped",
                    conversation_id = %search.conversation_id,
                    error = %error,
                    "blank answer; skipping directory search"
                );
                self.finish(search, DialogueEvent::SearchReturnedEmpty).await;
                return vec![reply::no_results(&search.food_choice, &search.location)];
            }
        };

        match self.directory.search(&query).await {
            Ok(results) => {
                let event = if results.is_empty() {
                    DialogueEvent::SearchReturnedEmpty
                } else {
                    DialogueEvent::SearchSucceeded
                };
                info!(
                    event_name = "directory.search_completed",
                    conversation_id = %search.conversation_id,
                    result_count = results.len(),
                    "directory search completed"
                );
                self.finish(search, event).await;
                reply::format_result(results.first(), &search.food_choice, &search.location)
            }
            Err(error) => {
                let error = BotError::from(error);
                warn!(
                    event_name = "directory.search_failed",
                    conversation_id = %search.conversation_id,
                    error = %error,
                    "directory search failed"
                );
                self.finish(search, DialogueEvent::SearchFailed).await;
                error.user_reply().into_iter().collect()
            }
        }
    }

    async fn finish(&self, search: &PendingSearch, event: DialogueEvent) {
        if let Err(error) = self.dialogue.finish(search, event).await {
            let error = BotError::from(error);
            warn!(
                event_name = "dialogue.finish_failed",
                conversation_id = %search.conversation_id,
                error = %error,
                "could not complete dialogue"
            );
        }
    }

    async fn lookup_display_name(&self, user_id: &str) -> Option<String> {
        match self.users.display_name(user_id).await {
            Ok(name) => name,
            Err(error) => {
                let error = BotError::from(error);
                warn!(
                    event_name = "users.lookup_failed",
                    user_id,
                    error = %error,
                    "user lookup failed; replying without a name"
                );
                None
            }
        }
    }
}
