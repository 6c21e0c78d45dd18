use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("key not found")]
    NotFound,

    #[error("cas mismatch")]
    Conflict,

    #[error("key already exists")]
    Exists,

    #[error("io error opening database at {path}: {source}")]
    Open { path: String, source: std::io::Error },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt log record: {0}")]
    Corrupt(String),
}
