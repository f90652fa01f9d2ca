use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid patient id: {0}")]
    InvalidPatientId(String),
    #[error("unknown gender code: {0}")]
    UnknownGender(String),
    #[error("unknown maternal status group: {0}")]
    UnknownMaternalGroup(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
