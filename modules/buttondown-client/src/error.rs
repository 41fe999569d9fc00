use thiserror::Error;

pub type Result<T> = std::result::Result<T, ButtondownError>;

#[derive(Debug, Error)]
pub enum ButtondownError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication rejected (status {0})")]
    Auth(u16),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ButtondownError {
    /// Map a non-success response to the matching variant.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ButtondownError::Auth(status),
            404 => ButtondownError::NotFound(body),
            429 => ButtondownError::RateLimited,
            400 | 422 => ButtondownError::Validation(body),
            _ => ButtondownError::Api {
                status,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for ButtondownError {
    fn from(err: reqwest::Error) -> Self {
        ButtondownError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ButtondownError {
    fn from(err: serde_json::Error) -> Self {
        ButtondownError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_variants() {
        assert!(matches!(
            ButtondownError::from_status(401, String::new()),
            ButtondownError::Auth(401)
        ));
        assert!(matches!(
            ButtondownError::from_status(429, String::new()),
            ButtondownError::RateLimited
        ));
        assert!(matches!(
            ButtondownError::from_status(422, String::new()),
            ButtondownError::Validation(_)
        ));
        assert!(matches!(
            ButtondownError::from_status(500, String::new()),
            ButtondownError::Api { status: 500, .. }
        ));
    }
}
