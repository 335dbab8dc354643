use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueStep {
    AwaitingLocation,
    AwaitingFoodChoice,
    Resolving,
    Complete,
}

impl DialogueStep {
    /// Index of the question currently being asked; `Resolving` and
    /// `Complete` both report 2.
    pub fn index(&self) -> u8 {
        match self {
            Self::AwaitingLocation => 0,
            Self::AwaitingFoodChoice => 1,
            Self::Resolving | Self::Complete => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueEvent {
    AnswerReceived,
    SearchSucceeded,
    SearchReturnedEmpty,
    SearchFailed,
    TimedOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueAction {
    StoreLocation,
    PromptForFoodChoice,
    StoreFoodChoice,
    AnnounceSearch,
    SearchDirectory,
    SendResult,
    SendNoResults,
    SendApology,
    Discard,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTransition {
    pub from: DialogueStep,
    pub to: DialogueStep,
    pub event: DialogueEvent,
    pub actions: Vec<DialogueAction>,
}
