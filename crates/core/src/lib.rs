pub mod assistant;
pub mod config;
pub mod dialogue;
pub mod directory;
pub mod errors;
pub mod intents;
pub mod reply;

pub use assistant::{Assistant, AssistantResponse, InboundMessage, UserLookup};
pub use dialogue::{
    ConversationKey, DialogueEngine, DialogueEvent, DialogueStep, DialogueTurn, PendingSearch,
};
pub use directory::{BusinessResult, DirectoryError, DirectorySearch, SearchQuery};
pub use errors::{BotError, LookupError};
pub use intents::{default_matcher, AddressingContext, Intent, TriggerMatcher, TriggerRule};
pub use reply::{Attachment, ReplyPayload};
