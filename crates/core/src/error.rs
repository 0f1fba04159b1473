use crate::extract::ExtractError;
use crate::llm::error::JudgeError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("portfolio {portfolio_id} has no allocations")]
    EmptyPortfolio { portfolio_id: i64 },

    #[error("need at least {required} candidate ETFs, got {available}")]
    InsufficientCandidates { required: usize, available: usize },

    #[error("recommendation failed after {attempts} attempts")]
    RecommendationFailed {
        attempts: u32,
        raw_output: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
