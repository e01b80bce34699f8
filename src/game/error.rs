//! Error types for game setup and session commands

/// Rejected game creation (bad request, unusable area, id exhaustion)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Boundary needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("Boundary encloses no area")]
    DegenerateBoundary,

    #[error("Only {placed} of {requested} control points fit in the play area")]
    PlacementExhausted { placed: usize, requested: usize },

    #[error("Could not allocate a unique identifier")]
    IdExhausted,

    #[error("Player is already in a game")]
    AlreadyInGame,
}

impl SetupError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Join rejections, reported to the requesting player only
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Game is full")]
    GameFull,

    #[error("Game has already started")]
    GameStarted,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Game not found")]
    GameNotFound,

    #[error("Player is already in a game")]
    AlreadyInGame,
}

impl JoinError {
    /// Tag sent to clients in `JoinGameError`
    pub fn tag(self) -> &'static str {
        match self {
            JoinError::GameFull => "GameFull",
            JoinError::GameStarted => "GameStarted",
            JoinError::WrongPassword => "WrongPassword",
            JoinError::GameNotFound => "GameNotFound",
            JoinError::AlreadyInGame => "AlreadyInGame",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("Only the host can start the game")]
    NotHost,

    #[error("Game has already started")]
    AlreadyStarted,

    #[error("Game not found")]
    GameNotFound,
}
