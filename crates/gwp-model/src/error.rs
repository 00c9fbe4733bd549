use gwp_core::CoreError;
use gwp_engine::EngineError;

use crate::binding::Role;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    InvalidInput(#[from] CoreError),

    #[error("Missing input: {field}")]
    MissingInput { field: &'static str },

    #[error("Unit {symbol} not found in unit group {group}")]
    UnitNotFound { group: String, symbol: String },

    #[error("Model {model} declares {found} parameters, binding expects {expected}")]
    SlotCount {
        model: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Model {model} parameter #{position} ({slot}) looks like {found}, binding expects {expected}")]
    Drift {
        model: &'static str,
        position: usize,
        slot: String,
        expected: Role,
        found: Role,
    },

    #[error("Unknown model variant: {0}")]
    UnknownVariant(String),
}
