//! Gateway error handling
//!
//! Validation problems are returned synchronously from façade methods and
//! never produce events. Transport problems travel inside `*Failed` events as
//! their rendered message; the typed form is only returned directly by the
//! callback-style operations.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the gateway client
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or malformed identifying arguments; nothing was sent
    #[error("invalid request: {0}")]
    Validation(String),

    /// The request was sent but did not succeed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GatewayError {
    /// Check if this error was raised before any network activity
    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = GatewayError::Validation("waypoint name is empty".to_string());
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "invalid request: waypoint name is empty");
    }

    #[test]
    fn test_transport_display_is_transparent() {
        let err = GatewayError::from(TransportError::Timeout { ms: 250 });
        assert!(matches!(
            err,
            GatewayError::Transport(TransportError::Timeout { ms: 250 })
        ));
        assert_eq!(err.to_string(), "timeout (250 ms)");
    }
}
