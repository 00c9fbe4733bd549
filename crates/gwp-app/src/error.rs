//! Error types for the gwp-app service layer.

use gwp_core::{CoreError, RowId};
use gwp_engine::EngineError;
use gwp_model::ModelError;
use gwp_store::StoreError;

/// Application error type that wraps errors from the backend crates and
/// provides a unified error interface for the server and the CLI.
///
/// Backend messages are kept verbatim so they reach the request boundary
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid configuration for {key}: {message}")]
    Config { key: &'static str, message: String },

    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Model(ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Datastore is not configured")]
    StoreDisabled,

    #[error("Emission record not found: {0}")]
    RecordNotFound(RowId),
}

impl AppError {
    /// True for errors caused by the caller's input rather than a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_)
                | AppError::Model(
                    ModelError::MissingInput { .. }
                        | ModelError::InvalidInput(_)
                        | ModelError::UnknownVariant(_)
                )
        )
    }

    /// Raw datastore payload, when the error came from the datastore.
    pub fn detail(&self) -> Option<&serde_json::Value> {
        match self {
            AppError::Store(err) => err.detail(),
            _ => None,
        }
    }
}

/// Result type for gwp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}

// Engine failures surfaced through the resolver stay engine errors.
impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Engine(err) => AppError::Engine(err),
            other => AppError::Model(other),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwp_engine::EntityType;

    #[test]
    fn model_engine_errors_are_flattened() {
        let err: AppError = ModelError::Engine(EngineError::NotFound {
            entity: EntityType::ProductSystem,
            name: "燃料消耗碳排".into(),
        })
        .into();
        assert!(matches!(err, AppError::Engine(EngineError::NotFound { .. })));
        assert!(!err.is_client_error());
    }

    #[test]
    fn input_errors_are_client_errors() {
        let err: AppError = ModelError::MissingInput { field: "oilUse" }.into();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Missing input: oilUse");

        let err: AppError = CoreError::InvalidRowId { value: "abc".into() }.into();
        assert!(err.is_client_error());
    }

    #[test]
    fn store_detail_is_exposed() {
        let err = AppError::from(StoreError::Denied {
            message: "permission denied".into(),
            detail: Some(serde_json::json!({ "code": "42501" })),
        });
        assert_eq!(err.detail().unwrap()["code"], "42501");
    }
}
