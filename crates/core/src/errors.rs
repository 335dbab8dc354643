use thiserror::Error;

use crate::dialogue::DialogueTransitionError;
use crate::directory::DirectoryError;
use crate::reply::{self, ReplyPayload};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("user lookup failed: {0}")]
pub struct LookupError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BotError {
    #[error("messaging transport failed: {0}")]
    TransportFatal(String),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Search(#[from] DirectoryError),
    #[error(transparent)]
    Dialogue(#[from] DialogueTransitionError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl BotError {
    /// Fatal errors terminate the process; everything else is recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportFatal(_) | Self::Configuration(_))
    }

    /// The chat reply owed to the user for this failure, if any. Lookup
    /// failures are absorbed by a non-personalised reply elsewhere.
    pub fn user_reply(&self) -> Option<ReplyPayload> {
        match self {
            Self::Search(DirectoryError::EmptyQuery { .. }) => None,
            Self::Search(_) => Some(reply::search_apology()),
            Self::TransportFatal(_)
            | Self::Lookup(_)
            | Self::Dialogue(_)
            | Self::Configuration(_) => None,
        }
    }
}
