use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("input too large: {tokens} tokens exceeds the limit of {max}")]
    InputTooLarge { tokens: usize, max: usize },
    #[error("tip generation failed: {message}")]
    TipGeneration { message: String },
}

impl AssessmentError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn too_large(tokens: usize, max: usize) -> Self {
        Self::InputTooLarge { tokens, max }
    }

    pub fn tip_generation(err: impl std::fmt::Display) -> Self {
        Self::TipGeneration {
            message: err.to_string(),
        }
    }
}
