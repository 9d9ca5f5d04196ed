use thiserror::Error;

/// Failures the planning core surfaces to its caller.
///
/// Missing performance history is deliberately absent here: it switches the
/// selector to the cold-start mix instead of failing.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("posting_hours cannot be empty")]
    EmptyPostingHours,

    #[error("invalid posting hour: {0} (must be between 0 and 23)")]
    InvalidPostingHour(u32),

    #[error("{what} must be at least 1 (got {value})")]
    InvalidCount { what: &'static str, value: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid episode id: {0:?}")]
    InvalidEpisodeId(String),

    #[error("episode not found: {0}")]
    EpisodeNotFound(String),
}

pub type PlannerResult<T> = std::result::Result<T, PlannerError>;
