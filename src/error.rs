use std::path::PathBuf;

/// Closed set of error kinds the engine can surface to a caller.
///
/// `ConfigError` never reaches this type: per §4.3/§7 it is swallowed at the
/// config loader boundary and the engine proceeds with defaults.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("git is not available or {root} is not a git repository")]
    Environment { root: PathBuf },

    #[error("git command failed: {reason}")]
    GitTransient { reason: String },

    #[error("analysis timed out")]
    Timeout,

    #[error("analysis was cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::Environment { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
