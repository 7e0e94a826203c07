use thiserror::Error;

use crate::Decision;

#[derive(Debug, Error)]
pub enum BlackjackError {
    #[error("Invalid action `{decision}` for the current hand")]
    InvalidAction { decision: Decision },

    #[error("No true-count band covers a true count of {0}")]
    NoCountBand(f64),

    #[error("Malformed strategy table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },

    #[error("`{0}` has not been implemented for this policy")]
    NotImplemented(&'static str),

    #[error("The shoe has no cards left")]
    EmptyShoe,

    #[error("The hand has no cards")]
    EmptyHand,

    #[error("Invalid card rank {0}, it must be in [2, 11]")]
    InvalidCard(u8),

    #[error("{method} is only allowed in {phase} phase")]
    WrongPhase {
        method: &'static str,
        phase: &'static str,
    },

    #[error("Policy `{0}` needs a strategy table")]
    MissingStrategyTable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BlackjackResult<T> = Result<T, BlackjackError>;
