use thiserror::Error;

/// Everything that can go wrong between reading the user's message and
/// finishing (or abandoning) the streamed reply.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid {key} override: {value:?}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("HF_API_TOKEN not set")]
    MissingApiToken,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("inference endpoint returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("response stream broke: {0}")]
    Stream(String),
}

impl ChatError {
    pub fn invalid(name: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::InvalidParameter {
            name,
            value,
            min,
            max,
        }
    }
}
