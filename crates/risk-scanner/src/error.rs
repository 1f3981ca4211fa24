use risk_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("config error: {0}")]
    Config(String),

    #[error("risk card not found: {0}")]
    NotFound(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("too many policy pages: {count} (max {max})")]
    TooManyDocuments { count: usize, max: usize },
}
