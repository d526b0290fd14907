#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("record not found")]
    NotFound,
    #[error("store fault: {0}")]
    Fault(String),
}

impl StoreError {
    pub fn fault<E: std::fmt::Display>(error: E) -> Self {
        StoreError::Fault(error.to_string())
    }
}
