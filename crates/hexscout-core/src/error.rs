use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ScoutError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Http(_) => "HTTP_ERROR",
        }
    }
}
