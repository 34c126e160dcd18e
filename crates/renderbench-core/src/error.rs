use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timestamp formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("No tokio runtime is available to drive trial timers")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, Error>;
