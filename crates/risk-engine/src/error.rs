/// Errors raised while building the engine (configuration and catalog loading)
/// or while admitting a page for evaluation.
///
/// Evaluating an admitted snapshot never fails: detector faults and unknown
/// card IDs are logged and degrade to "no finding".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid risk card catalog: {0}")]
    InvalidCatalog(String),

    #[error("failed to read risk card catalog at {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("page text too large: {chars} chars (max {max})")]
    InputTooLarge { chars: usize, max: usize },

    #[error("malformed risk card catalog: {0}")]
    CatalogFormat(#[from] serde_json::Error),
}
