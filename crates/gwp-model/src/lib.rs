//! gwp-model: named models, their parameter bindings, and resolution against the engine.

pub mod binding;
pub mod error;
pub mod inputs;
pub mod resolver;
pub mod validate;

pub use binding::{ModelBinding, ModelVariant, Role, UnitSpec, bind};
pub use error::{ModelError, ModelResult};
pub use inputs::CalcInputs;
pub use resolver::Resolver;
pub use validate::{BindingReport, SlotCheck, validate_binding};

/// Engine reference to a named product system.
pub type ModelDescriptor = gwp_engine::Ref;
/// One declared parameter of a product system, in engine order.
pub type ParameterSlot = gwp_engine::ParameterRedef;
/// A unit inside a unit group.
pub type UnitDescriptor = gwp_engine::Unit;
