use thiserror::Error;

/// Errors raised inside the spot pipelines.
///
/// None of these ever stop a pipeline: transport errors become a status
/// flag, decode errors drop the offending message, configuration errors put
/// the pipeline into its disabled state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        PipelineError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Decode(e.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
