use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyntopicalError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network capabilities capped: {0}")]
    Sandbox(String),
}

pub type Result<T> = std::result::Result<T, SyntopicalError>;
