//! gwp-store: persistence of impact rows and emission detail rows.

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod postgrest;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryStore, StoreOp};
pub use postgrest::PostgrestStore;
pub use store::Datastore;
pub use types::*;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Datastore returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<serde_json::Value>,
    },

    #[error("Permission denied: {message}")]
    Denied {
        message: String,
        detail: Option<serde_json::Value>,
    },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Insert into {table} returned no id")]
    MissingId { table: String },
}

impl StoreError {
    /// Raw datastore payload attached to the error, if any.
    pub fn detail(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Http { detail, .. } | Self::Denied { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode {
            message: err.to_string(),
        }
    }
}
