use thiserror::Error;

/// Failures the pipeline signals instead of papering over with defaults
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown team abbreviation: {0}")]
    UnknownTeamAbbreviation(String),

    #[error("no advanced stats row for team: {0}")]
    MissingTeamStats(String),

    #[error("duplicate advanced stats row for team: {0}")]
    DuplicateTeam(String),

    #[error("team stats table has no {0} column")]
    MissingTeamColumn(String),

    #[error("malformed player id response: {0}")]
    MalformedOracleResponse(String),

    #[error("player id response has {got} entries for {expected} names")]
    OracleLengthMismatch { expected: usize, got: usize },

    #[error("no game in the history has complete rolling features")]
    InsufficientHistory,

    #[error("need at least {needed} games to train, got {got}")]
    NotEnoughGames { needed: usize, got: usize },

    #[error("table not found on page: {0}")]
    TableNotFound(String),

    #[error("player name can't be used as a file name: {0:?}")]
    InvalidPlayerName(String),
}
