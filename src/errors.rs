use thiserror::Error;

#[derive(Debug, Error)]
pub enum SparkError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider failures carry the backend's own message verbatim so the
    /// settings surface can show it to the user unchanged.
    #[error("{0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type SparkResult<T> = Result<T, SparkError>;
