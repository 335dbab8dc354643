use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dialogue::states::{DialogueAction, DialogueEvent, DialogueStep, DialogueTransition};
use crate::reply::{self, ReplyPayload};

/// Conversations are scoped to one user in one channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub user_id: String,
    pub channel_id: String,
}

impl ConversationKey {
    pub fn new(user_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), channel_id: channel_id.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueTransitionError {
    #[error("invalid dialogue transition from {step:?} using event {event:?}")]
    InvalidTransition { step: DialogueStep, event: DialogueEvent },
}

pub fn transition(
    current: DialogueStep,
    event: DialogueEvent,
) -> Result<DialogueTransition, DialogueTransitionError> {
    use DialogueAction::{
        AnnounceSearch, Discard, PromptForFoodChoice, SearchDirectory, SendApology, SendNoResults,
        SendResult, StoreFoodChoice, StoreLocation,
    };
    use DialogueEvent::{
        AnswerReceived, SearchFailed, SearchReturnedEmpty, SearchSucceeded, TimedOut,
    };
    use DialogueStep::{AwaitingFoodChoice, AwaitingLocation, Complete, Resolving};

    let (to, actions) = match (current, event) {
        (AwaitingLocation, AnswerReceived) => {
            (AwaitingFoodChoice, vec![StoreLocation, PromptForFoodChoice])
        }
        (AwaitingFoodChoice, AnswerReceived) => {
            (Resolving, vec![StoreFoodChoice, AnnounceSearch, SearchDirectory])
        }
        (Resolving, SearchSucceeded) => (Complete, vec![SendResult, Discard]),
        (Resolving, SearchReturnedEmpty) => (Complete, vec![SendNoResults, Discard]),
        (Resolving, SearchFailed) => (Complete, vec![SendApology, Discard]),
        (Complete, TimedOut) => {
            return Err(DialogueTransitionError::InvalidTransition { step: current, event });
        }
        (_, TimedOut) => (Complete, vec![Discard]),
        _ => return Err(DialogueTransitionError::InvalidTransition { step: current, event }),
    };

    Ok(DialogueTransition { from: current, to, event, actions })
}

#[derive(Clone, Debug)]
pub struct Conversation {
    pub id: Uuid,
    pub key: ConversationKey,
    pub display_name: Option<String>,
    pub location: String,
    pub food_choice: String,
    pub step: DialogueStep,
    last_activity: Instant,
}

impl Conversation {
    pub fn new(key: ConversationKey, display_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            display_name,
            location: String::new(),
            food_choice: String::new(),
            step: DialogueStep::AwaitingLocation,
            last_activity: Instant::now(),
        }
    }

    /// Stores `text` verbatim in whichever field the current step is waiting for.
    pub fn record_answer(
        &mut self,
        text: &str,
    ) -> Result<DialogueTransition, DialogueTransitionError> {
        let outcome = self.apply(DialogueEvent::AnswerReceived)?;
        for action in &outcome.actions {
            match action {
                DialogueAction::StoreLocation => self.location = text.to_owned(),
                DialogueAction::StoreFoodChoice => self.food_choice = text.to_owned(),
                _ => {}
            }
        }
        Ok(outcome)
    }

    pub fn apply(
        &mut self,
        event: DialogueEvent,
    ) -> Result<DialogueTransition, DialogueTransitionError> {
        let outcome = transition(self.step, event)?;
        self.step = outcome.to;
        self.last_activity = Instant::now();
        Ok(outcome)
    }

    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) >= timeout
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationStart {
    pub conversation_id: Uuid,
    pub restarted: bool,
    pub prompt: ReplyPayload,
}

/// Both answers are in; the caller owns the search and reports back through
/// [`DialogueEngine::finish`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSearch {
    pub key: ConversationKey,
    pub conversation_id: Uuid,
    pub location: String,
    pub food_choice: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogueTurn {
    Prompt(ReplyPayload),
    Resolve { notice: ReplyPayload, search: PendingSearch },
}

/// Owns the table of open conversations. Each key holds at most one
/// conversation; the lock is never held across an await on I/O.
pub struct DialogueEngine {
    sessions: RwLock<HashMap<ConversationKey, Conversation>>,
    timeout: Duration,
}

impl DialogueEngine {
    pub fn new(timeout: Duration) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Opens a conversation for `key`, replacing any conversation already
    /// open there.
    pub async fn start(
        &self,
        key: ConversationKey,
        display_name: Option<String>,
    ) -> ConversationStart {
        let conversation = Conversation::new(key.clone(), display_name);
        let conversation_id = conversation.id;
        let prompt = reply::location_prompt(conversation.display_name.as_deref());

        let mut sessions = self.sessions.write().await;
        let previous = sessions.insert(key.clone(), conversation);
        drop(sessions);

        let restarted = previous.is_some();
        info!(
            event_name = "dialogue.started",
            conversation_id = %conversation_id,
            user_id = %key.user_id,
            channel_id = %key.channel_id,
            restarted,
            "food dialogue started"
        );

        ConversationStart { conversation_id, restarted, prompt }
    }

    /// Routes a follow-up message to the conversation open under `key`.
    /// Returns `None` when nothing is waiting for an answer there.
    pub async fn answer(&self, key: &ConversationKey, text: &str) -> Option<DialogueTurn> {
        let mut sessions = self.sessions.write().await;
        let conversation = sessions.get_mut(key)?;

        if conversation.is_expired(Instant::now(), self.timeout) {
            let expired = sessions.remove(key)?;
            drop(sessions);
            log_eviction(&expired);
            return None;
        }

        if conversation.step == DialogueStep::Resolving {
            return None;
        }

        let outcome = match conversation.record_answer(text) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "dialogue.transition_rejected",
                    conversation_id = %conversation.id,
                    error = %error,
                    "dialogue rejected answer"
                );
                return None;
            }
        };

        debug!(
            event_name = "dialogue.advanced",
            conversation_id = %conversation.id,
            from = ?outcome.from,
            to = ?outcome.to,
            "dialogue advanced"
        );

        if outcome.actions.contains(&DialogueAction::SearchDirectory) {
            return Some(DialogueTurn::Resolve {
                notice: reply::search_notice(),
                search: PendingSearch {
                    key: key.clone(),
                    conversation_id: conversation.id,
                    location: conversation.location.clone(),
                    food_choice: conversation.food_choice.clone(),
                },
            });
        }

        Some(DialogueTurn::Prompt(reply::food_choice_prompt(conversation.display_name.as_deref())))
    }

    /// Applies the search outcome and discards the conversation. A conversation
    /// that was restarted or evicted in the meantime is left untouched.
    pub async fn finish(
        &self,
        search: &PendingSearch,
        event: DialogueEvent,
    ) -> Result<Option<DialogueTransition>, DialogueTransitionError> {
        let mut sessions = self.sessions.write().await;
        let Some(conversation) = sessions.get_mut(&search.key) else {
            return Ok(None);
        };
        if conversation.id != search.conversation_id {
            return Ok(None);
        }

        let outcome = conversation.apply(event)?;
        if outcome.actions.contains(&DialogueAction::Discard) {
            sessions.remove(&search.key);
        }
        drop(sessions);

        info!(
            event_name = "dialogue.completed",
            conversation_id = %search.conversation_id,
            user_id = %search.key.user_id,
            channel_id = %search.key.channel_id,
            event = ?event,
            "food dialogue completed"
        );

        Ok(Some(outcome))
    }

    /// Removes every conversation idle for at least the configured timeout.
    pub async fn evict_expired(&self) -> Vec<ConversationKey> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<ConversationKey> = sessions
            .iter()
            .filter(|(_, conversation)| conversation.is_expired(now, self.timeout))
            .map(|(key, _)| key.clone())
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for key in expired {
            if let Some(mut conversation) = sessions.remove(&key) {
                if let Err(error) = conversation.apply(DialogueEvent::TimedOut) {
                    warn!(
                        event_name = "dialogue.transition_rejected",
                        conversation_id = %conversation.id,
                        error = %error,
                        "dialogue rejected timeout"
                    );
                }
                log_eviction(&conversation);
                evicted.push(key);
            }
        }
        evicted
    }

    pub async fn is_active(&self, key: &ConversationKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    pub async fn step(&self, key: &ConversationKey) -> Option<DialogueStep> {
        self.sessions.read().await.get(key).map(|conversation| conversation.step)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn spawn_sweeper(engine: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = engine.evict_expired().await;
                if !evicted.is_empty() {
                    debug!(
                        event_name = "dialogue.sweep",
                        evicted = evicted.len(),
                        "swept idle conversations"
                    );
                }
            }
        })
    }
}

impl Default for DialogueEngine {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

fn log_eviction(conversation: &Conversation) {
    warn!(
        event_name = "dialogue.evicted",
        conversation_id = %conversation.id,
        user_id = %conversation.key.user_id,
        channel_id = %conversation.key.channel_id,
        step = ?conversation.step,
        "evicted idle food dialogue"
    );
}
