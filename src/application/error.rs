#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("catalog fetch error: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}
