use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use slack_morphism::errors::SlackClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpaceCatError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to access data store: {0}")]
    DataAccess(String),

    #[error("Failed to access Slack API: {0}")]
    SlackApi(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to interact with AWS services: {0}")]
    AwsError(String),

    #[error("Failed to parse request: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    General(String),
}

impl SpaceCatError {
    /// HTTP status code a controller responds with for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            SpaceCatError::Validation(_) | SpaceCatError::ParseError(_) => 400,
            SpaceCatError::Unauthorized(_) => 401,
            SpaceCatError::Forbidden(_) => 403,
            SpaceCatError::NotFound(_) => 404,
            SpaceCatError::Conflict(_) => 409,
            _ => 500,
        }
    }

    /// Message safe to hand back to an API caller.
    ///
    /// Client errors carry their own message; server-side failures are
    /// reduced to a generic one so that backend details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status_code() < 500 {
            self.to_string()
        } else {
            match self {
                SpaceCatError::General(msg) => msg.clone(),
                _ => "Internal server error".to_string(),
            }
        }
    }
}

impl From<SlackClientError> for SpaceCatError {
    fn from(error: SlackClientError) -> Self {
        SpaceCatError::SlackApi(error.to_string())
    }
}

impl From<reqwest::Error> for SpaceCatError {
    fn from(error: reqwest::Error) -> Self {
        SpaceCatError::HttpError(error.to_string())
    }
}

impl From<anyhow::Error> for SpaceCatError {
    fn from(error: anyhow::Error) -> Self {
        SpaceCatError::General(error.to_string())
    }
}

impl From<sqlx::Error> for SpaceCatError {
    fn from(error: sqlx::Error) -> Self {
        SpaceCatError::DataAccess(error.to_string())
    }
}

impl From<serde_json::Error> for SpaceCatError {
    fn from(error: serde_json::Error) -> Self {
        SpaceCatError::ParseError(error.to_string())
    }
}

// Every AWS SDK client shares the same smithy error type.
impl<E, R> From<SdkError<E, R>> for SpaceCatError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(error: SdkError<E, R>) -> Self {
        SpaceCatError::AwsError(DisplayErrorContext(&error).to_string())
    }
}
