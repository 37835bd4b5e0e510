use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Source text is too short: {chars} characters, at least {min} required")]
    InputTooShort { chars: usize, min: usize },

    #[error("Source text does not match the request: {reason}")]
    RelevanceRejection {
        reason: String,
        topics_found: Vec<String>,
        topics_missing: Vec<String>,
    },

    #[error("Completion service quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Completion service rejected the credentials: {0}")]
    AuthenticationFailure(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Could not parse model output: {0}")]
    ParseFailure(String),

    #[error(
        "No questions could be generated from {chunks} chunk(s). Likely causes: \
         1. the source text is too short or unrelated to the request, \
         2. the completion service is unavailable or failing temporarily, \
         3. the instruction is unclear. Try another document or a more specific instruction."
    )]
    EmptyResult { chunks: usize },

    #[error(
        "All {generated} generated question(s) were rejected as not grounded in the source text. \
         Try a clearer document, a more specific instruction, or a stronger model."
    )]
    AllHallucinated { generated: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that make the completion service unusable for every remaining
    /// chunk of a batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_) | Error::AuthenticationFailure(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Error::RelevanceRejection {
            reason,
            topics_found,
            topics_missing,
        } = self
        {
            let body = Json(json!({
                "error": "The document does not match the request",
                "reason": reason,
                "topics_found": topics_found,
                "topics_missing": topics_missing,
                "suggestion": "Choose a document that covers the requested topics or change the instruction",
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let (status, error_message) = match self {
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            err @ (Error::InputTooShort { .. }
            | Error::EmptyResult { .. }
            | Error::AllHallucinated { .. }) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::QuotaExceeded(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "Completion service quota exceeded. Try again later or check billing.".to_string(),
            ),
            Error::AuthenticationFailure(_) => (
                StatusCode::UNAUTHORIZED,
                "Completion service API key is invalid".to_string(),
            ),
            Error::Completion(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", msg),
            ),
            Error::ParseFailure(msg) => (StatusCode::BAD_GATEWAY, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
