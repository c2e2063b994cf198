//! Error types for model probing operations

use std::path::PathBuf;

/// Errors raised while downloading, loading or running a model
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("model directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("missing file: {0}")]
    MissingFile(PathBuf),

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported model type '{0}' for text generation")]
    UnsupportedModel(String),

    #[error("refusing to write outside the model directory: {0}")]
    UnsafePath(String),

    #[error("hub request failed: {0}")]
    Hub(#[from] hf_hub::api::tokio::ApiError),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("tensor runtime error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<tokenizers::Error> for ProbeError {
    fn from(err: tokenizers::Error) -> Self {
        ProbeError::Tokenizer(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_not_found_display() {
        let err = ProbeError::DirectoryNotFound(PathBuf::from("models/missing"));
        assert_eq!(err.to_string(), "model directory not found: models/missing");
    }

    #[test]
    fn test_invalid_json_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ProbeError::InvalidJson {
            path: PathBuf::from("config.json"),
            source,
        };
        assert!(err.to_string().starts_with("invalid JSON in config.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ProbeError = io.into();
        assert!(matches!(err, ProbeError::Io(_)));
    }
}
