use thiserror::Error;

#[derive(Error, Debug)]
pub enum PfennigError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported format: {0}")]
    Format(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, PfennigError>;
