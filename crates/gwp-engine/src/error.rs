//! Engine access errors.

use thiserror::Error;

use crate::schema::EntityType;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while talking to the remote engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The HTTP transport failed (refused, reset, timed out).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The engine answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// An entity looked up by exact name does not exist.
    #[error("{entity} not found: {name}")]
    NotFound { entity: EntityType, name: String },

    /// The engine reached the failed terminal state.
    #[error("Calculation failed: {message}")]
    CalculationFailed { message: String },

    /// A response could not be decoded into the expected shape.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// The startup retry budget ran out.
    #[error("Engine unreachable after {attempts} attempts: {last}")]
    ConnectExhausted {
        attempts: u32,
        last: Box<EngineError>,
    },
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Transport {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::NotFound {
            entity: EntityType::ProductSystem,
            name: "廚餘處理量".into(),
        };
        assert_eq!(err.to_string(), "ProductSystem not found: 廚餘處理量");

        let err = EngineError::ConnectExhausted {
            attempts: 30,
            last: Box::new(EngineError::Transport {
                message: "connection refused".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("30 attempts"));
        assert!(msg.contains("connection refused"));
    }
}
