use thiserror::Error;

#[derive(Debug, Error)]
pub enum CpaError {
    #[error("scoring failed: {0}")]
    Scoring(String),
}

pub type Result<T> = std::result::Result<T, CpaError>;
