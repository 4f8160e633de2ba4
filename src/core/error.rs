

use thiserror::Error;

use crate::db::CollectionError;


#[derive(Error, Debug)]
pub enum SoftDeleteError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("pipeline must be a sequence of stages, a stage document or an array of stages, got {0}")]
    UnsupportedPipeline(String),

    #[error("pipeline stage {index} must be a document, got {actual}")]
    InvalidStage { index: usize, actual: String },

    #[error("Decode error: {0}")]
    Decode(#[from] bson::de::Error),

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl SoftDeleteError {
    /// True for errors raised locally before any database call was issued.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::UnsupportedPipeline(_) | Self::InvalidStage { .. })
    }
}


pub type Result<T> = std::result::Result<T, SoftDeleteError>;
