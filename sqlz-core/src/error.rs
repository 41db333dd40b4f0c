use crate::intake::IntakeFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlzError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The whole intake batch produced nothing. Carries the per-blob
    /// failures so the caller can still report them.
    #[error("no valid files found")]
    NoValidFiles { failures: Vec<IntakeFailure> },

    #[error("no compressed output for {0}")]
    NotAvailable(String),

    #[error("unknown file: {0}")]
    UnknownFile(String),

    #[error("Format error: {0}")]
    Format(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, SqlzError>;
