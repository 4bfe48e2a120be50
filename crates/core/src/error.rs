use std::path::PathBuf;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum EduflexError {
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Invalid API response: {reason}")]
    InvalidApiResponse { reason: String },

    #[error("LLM response is not parsable JSON")]
    UnparsableResponse { raw: String },

    #[error("Narration failed for {audio_path}: {reason}")]
    NarrationFailed { audio_path: PathBuf, reason: String },

    #[error("Media probe failed for {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("Render failed for {output_path}: {reason}")]
    RenderFailed { output_path: PathBuf, reason: String },

    #[error("Worker task failed: {reason}")]
    TaskFailed { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EduflexError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EduflexError>;
