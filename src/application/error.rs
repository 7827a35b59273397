use crate::domain::rules::MoveResult;
use thiserror::Error;
use uuid::Uuid;

/// Error taxonomy for the service layer. The API maps each kind to a status
/// code; `Internal` means an engine invariant broke and is logged loudly.
#[derive(Debug, Error)]
pub enum GameServiceError {
    #[error("game {0} not found")]
    GameNotFound(Uuid),

    #[error("player {user_id} is not in game {game_id}")]
    PlayerNotInGame { user_id: String, game_id: Uuid },

    #[error("it is not {user_id}'s turn")]
    NotYourTurn { user_id: String },

    /// Wrong phase, stale roll state, full game, duplicate join, and the
    /// like. The caller should refresh state and retry the intent.
    #[error("{0}")]
    PreconditionFailed(String),

    /// A proposed move the server-side re-validation rejected; carries the
    /// precise rule outcome so clients can render a reason.
    #[error("invalid move: {reason:?}")]
    InvalidMove { reason: MoveResult },

    #[error("internal engine error: {0}")]
    Internal(String),
}

impl GameServiceError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
