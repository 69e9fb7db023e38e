//! Error taxonomy for calendar API operations

use thiserror::Error;

use super::transport::TransportError;

/// Errors that can occur when talking to the calendar API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credentials are missing or were refused by the auth endpoint
    #[error("Invalid API configuration: {0}")]
    Configuration(String),

    /// A resource endpoint refused the current credential
    #[error("Authentication rejected (HTTP {status}), try again")]
    AuthenticationRejected { status: u16 },

    /// The remote host could not be reached
    #[error("Unable to connect to server, check your internet connection ({0})")]
    Offline(String),

    /// Unexpected HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Any other transport failure
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The auth endpoint answered without a usable token
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether the user has to fix their credentials before retrying
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unreachable(msg) => Self::Offline(msg),
            TransportError::Failed(msg) => Self::Transport(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_map_to_taxonomy() {
        let offline = ApiError::from(TransportError::Unreachable("connection refused".into()));
        assert!(matches!(offline, ApiError::Offline(ref msg) if msg == "connection refused"));

        let failed = ApiError::from(TransportError::Failed("bad body".into()));
        assert!(matches!(failed, ApiError::Transport(ref msg) if msg == "bad body"));
    }
}
