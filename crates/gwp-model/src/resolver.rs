//! Exact-name resolution of models, parameters, methods and units.
//!
//! Nothing is cached: every calculation re-resolves against the engine.

use gwp_engine::{Engine, EngineError, EntityType, ParameterRedef, Ref, Unit};
use tracing::debug;

use crate::error::{ModelError, ModelResult};

pub struct Resolver<'e> {
    engine: &'e dyn Engine,
}

impl<'e> Resolver<'e> {
    pub fn new(engine: &'e dyn Engine) -> Self {
        Self { engine }
    }

    fn by_name(&self, ty: EntityType, name: &str) -> ModelResult<Ref> {
        self.engine
            .find_by_name(ty, name)?
            .ok_or_else(|| {
                ModelError::Engine(EngineError::NotFound {
                    entity: ty,
                    name: name.to_string(),
                })
            })
    }

    pub fn resolve_model(&self, name: &str) -> ModelResult<Ref> {
        let model = self.by_name(EntityType::ProductSystem, name)?;
        debug!(model = name, id = %model.id, "resolved model");
        Ok(model)
    }

    pub fn resolve_method(&self, name: &str) -> ModelResult<Ref> {
        self.by_name(EntityType::ImpactMethod, name)
    }

    /// Declared parameters of `model`, in engine order.
    pub fn resolve_parameters(&self, model: &Ref) -> ModelResult<Vec<ParameterRedef>> {
        Ok(self.engine.parameters(model)?)
    }

    pub fn resolve_unit(&self, group_name: &str, unit_symbol: &str) -> ModelResult<Unit> {
        let group = self.engine.unit_group(group_name)?.ok_or_else(|| {
            ModelError::Engine(EngineError::NotFound {
                entity: EntityType::UnitGroup,
                name: group_name.to_string(),
            })
        })?;
        group
            .unit(unit_symbol)
            .cloned()
            .ok_or_else(|| ModelError::UnitNotFound {
                group: group_name.to_string(),
                symbol: unit_symbol.to_string(),
            })
    }
}
