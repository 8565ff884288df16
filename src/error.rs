use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
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
    #[error("invalid alignment payload: {message}")]
    InvalidPayload { message: String },
    #[error("alignment fetch for passage '{passage_id}' failed: {message}")]
    Fetch { passage_id: String, message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl SyncError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn fetch(passage_id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Fetch {
            passage_id: passage_id.into(),
            message: err.to_string(),
        }
    }
}
