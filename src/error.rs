//! Error types shared by every stage of a cover run.

/// Failures raised by the cover engine and its refiners.
///
/// All of them abort the run; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("inconsistent state at iteration {iteration}: {details}")]
    InconsistentState { iteration: usize, details: String },

    #[error("coverage row {item} is already committed or out of range")]
    RowUnavailable { item: usize },

    #[error("non-positive cost {cost} for `{item}` in module {module} at iteration {iteration}")]
    NonPositiveCost {
        iteration: usize,
        item: String,
        module: usize,
        cost: f64,
    },

    #[error("progress sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("progress sink write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl CoverError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverError>;
