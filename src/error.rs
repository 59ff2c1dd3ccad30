use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("training session belongs to another user")]
    Forbidden,

    #[error("invalid answer quality {0}, expected 0..=5")]
    InvalidQuality(i64),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(what: &str, id: i64) -> Self {
        Error::NotFound(format!("{} {}", what, id))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
