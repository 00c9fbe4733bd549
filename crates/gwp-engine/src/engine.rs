//! The engine trait.

use crate::error::EngineResult;
use crate::schema::{CalculationSetup, EntityType, ImpactValue, ParameterRedef, Ref, ResultState, UnitGroup};

/// Operations the service needs from a life-cycle-assessment engine.
///
/// Implementations must be `Send + Sync` so one handle can be shared by the
/// server's worker threads. Sharing does not imply the engine tolerates
/// concurrent calculations; callers serialize submissions themselves.
pub trait Engine: Send + Sync {
    /// Endpoint description (for logging).
    fn endpoint(&self) -> &str;

    /// List descriptors of all entities of a type.
    fn descriptors(&self, ty: EntityType) -> EngineResult<Vec<Ref>>;

    /// Fetch an entity by exact name. `None` when the engine has no match.
    fn find_by_name(&self, ty: EntityType, name: &str) -> EngineResult<Option<Ref>>;

    /// Fetch a unit group by exact name, including its units.
    fn unit_group(&self, name: &str) -> EngineResult<Option<UnitGroup>>;

    /// Declared parameters of a product system, in engine order.
    fn parameters(&self, system: &Ref) -> EngineResult<Vec<ParameterRedef>>;

    /// Submit a calculation; returns the initial state of the new result.
    fn calculate(&self, setup: &CalculationSetup) -> EngineResult<ResultState>;

    /// Current state of a submitted result.
    fn state(&self, result_id: &str) -> EngineResult<ResultState>;

    /// Per-category impact totals of a ready result.
    fn total_impacts(&self, result_id: &str) -> EngineResult<Vec<ImpactValue>>;

    /// Release engine-side resources of a result.
    fn dispose(&self, result_id: &str) -> EngineResult<()>;
}
