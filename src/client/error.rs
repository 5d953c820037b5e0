use thiserror::Error;

/// Failures seen by the table and form clients.
///
/// Cloneable so results can travel through event channels.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Server returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Bad input: {0}")]
    BadInput(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Status {
                code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Unreachable(err.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::BadInput(format!("invalid URL: {}", err))
    }
}
