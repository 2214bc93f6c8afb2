use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
