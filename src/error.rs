use thiserror::Error;

use crate::services::ai_service::InferenceError;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Config,
    Service,
    Parse,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Decode => "decode",
            Stage::Config => "config",
            Stage::Service => "service",
            Stage::Parse => "parse",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    /// Bad image encoding. Never retried, never degraded.
    #[error("Invalid image input: {0}")]
    InvalidInput(String),
    /// Missing credential or model.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Inference service failed after the retry budget was spent.
    #[error("Inference service error: {0}")]
    Upstream(#[from] InferenceError),
    /// The model answered but nothing resembling a food survived extraction.
    #[error("No food items could be extracted from the model response")]
    ExtractionEmpty,
}

impl ScanError {
    pub fn stage(&self) -> Stage {
        match self {
            ScanError::InvalidInput(_) => Stage::Decode,
            ScanError::Configuration(_) => Stage::Config,
            ScanError::Upstream(_) => Stage::Service,
            ScanError::ExtractionEmpty => Stage::Parse,
        }
    }

    /// Whether the offline fallback may stand in for this failure.
    pub fn is_degradable(&self) -> bool {
        matches!(self, ScanError::Upstream(_) | ScanError::ExtractionEmpty)
    }
}
