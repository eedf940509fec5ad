use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Storage request timed out")]
    Timeout,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Client misconfigured: {0}")]
    Configuration(String),
}

impl DatabaseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DatabaseError::Timeout)
    }
}

impl From<reqwest::Error> for DatabaseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DatabaseError::Timeout
        } else if err.is_decode() {
            DatabaseError::Decode(err.to_string())
        } else {
            DatabaseError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Decode(err.to_string())
    }
}
