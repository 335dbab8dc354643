pub mod engine;
pub mod states;

pub use engine::{
    transition, Conversation, ConversationKey, ConversationStart, DialogueEngine,
    DialogueTransitionError, DialogueTurn, PendingSearch,
};
pub use states::{DialogueAction, DialogueEvent, DialogueStep, DialogueTransition};
