//! In-process engine for tests. Built with `cfg(test)` or the `testing` feature.
//!
//! Mirrors the observable behavior of the IPC server: entities are looked up
//! by exact name, results move through queued/running before becoming ready,
//! and a disposed result is gone.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::schema::{
    CalculationSetup, EntityType, ImpactValue, ParameterRedef, Ref, ResultState, Unit, UnitGroup,
};

type ImpactFn = dyn Fn(&CalculationSetup) -> Vec<ImpactValue> + Send + Sync;

struct StubSystem {
    reference: Ref,
    parameters: Vec<ParameterRedef>,
}

struct StubResult {
    setup: CalculationSetup,
    polls_left: u32,
}

#[derive(Default)]
struct Counters {
    descriptors: AtomicUsize,
    lookups: AtomicUsize,
    parameters: AtomicUsize,
    calculate: AtomicUsize,
    state: AtomicUsize,
    impacts: AtomicUsize,
    dispose: AtomicUsize,
}

/// Snapshot of how often each engine operation was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StubCallCounts {
    pub descriptors: usize,
    pub lookups: usize,
    pub parameters: usize,
    pub calculate: usize,
    pub state: usize,
    pub impacts: usize,
    pub dispose: usize,
}

pub struct StubEngine {
    systems: Vec<StubSystem>,
    methods: Vec<Ref>,
    unit_groups: Vec<UnitGroup>,
    impacts: Box<ImpactFn>,
    pending_polls: u32,
    calculation_failure: Option<String>,
    unavailable_descriptors: AtomicU32,
    results: Mutex<HashMap<String, StubResult>>,
    counters: Counters,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// Empty catalog; the default impact function is [`StubEngine::linear_impacts`].
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            methods: Vec::new(),
            unit_groups: Vec::new(),
            impacts: Box::new(Self::linear_impacts),
            pending_polls: 0,
            calculation_failure: None,
            unavailable_descriptors: AtomicU32::new(0),
            results: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Add a product system whose parameters are declared in `parameter_names` order.
    pub fn with_system(mut self, name: &str, parameter_names: &[&str]) -> Self {
        let index = self.systems.len();
        let process = Ref::new(EntityType::Process, format!("proc-{index}"), name);
        let parameters = parameter_names
            .iter()
            .map(|p| ParameterRedef {
                name: (*p).to_string(),
                value: 1.0,
                context: Some(process.clone()),
            })
            .collect();
        self.systems.push(StubSystem {
            reference: Ref::new(EntityType::ProductSystem, format!("ps-{index}"), name),
            parameters,
        });
        self
    }

    pub fn with_method(mut self, name: &str) -> Self {
        let index = self.methods.len();
        self.methods
            .push(Ref::new(EntityType::ImpactMethod, format!("method-{index}"), name));
        self
    }

    /// Add a unit group from `(symbol, conversion factor)` pairs; the first is the reference unit.
    pub fn with_unit_group(mut self, name: &str, units: &[(&str, f64)]) -> Self {
        let index = self.unit_groups.len();
        let units = units
            .iter()
            .enumerate()
            .map(|(i, (symbol, factor))| Unit {
                id: format!("unit-{index}-{i}"),
                name: (*symbol).to_string(),
                conversion_factor: *factor,
                is_ref_unit: i == 0,
            })
            .collect();
        self.unit_groups.push(UnitGroup {
            id: format!("group-{index}"),
            name: name.to_string(),
            units,
        });
        self
    }

    pub fn with_impacts<F>(mut self, impacts: F) -> Self
    where
        F: Fn(&CalculationSetup) -> Vec<ImpactValue> + Send + Sync + 'static,
    {
        self.impacts = Box::new(impacts);
        self
    }

    /// Number of `state` polls before a result becomes ready.
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Every calculation ends in the failed state with `message`.
    pub fn with_calculation_failure(mut self, message: &str) -> Self {
        self.calculation_failure = Some(message.to_string());
        self
    }

    /// The first `count` descriptor listings fail as if the server were still booting.
    pub fn with_unavailable_descriptors(self, count: u32) -> Self {
        self.unavailable_descriptors.store(count, Ordering::SeqCst);
        self
    }

    /// Deterministic impacts: one GWP category whose amount is
    /// `amount * (sum of redefined parameter values)`, plus one non-GWP category.
    pub fn linear_impacts(setup: &CalculationSetup) -> Vec<ImpactValue> {
        let sum: f64 = setup.parameters.iter().map(|p| p.value).sum();
        let amount = setup.amount.unwrap_or(1.0);
        vec![
            impact("Climate change - Global Warming Potential (GWP100)", "kg CO2-eq", amount * sum),
            impact("Land use", "m2a crop-eq", amount),
        ]
    }

    pub fn calls(&self) -> StubCallCounts {
        let c = &self.counters;
        StubCallCounts {
            descriptors: c.descriptors.load(Ordering::SeqCst),
            lookups: c.lookups.load(Ordering::SeqCst),
            parameters: c.parameters.load(Ordering::SeqCst),
            calculate: c.calculate.load(Ordering::SeqCst),
            state: c.state.load(Ordering::SeqCst),
            impacts: c.impacts.load(Ordering::SeqCst),
            dispose: c.dispose.load(Ordering::SeqCst),
        }
    }

    /// Results submitted and not yet disposed.
    pub fn live_results(&self) -> usize {
        self.lock_results().len()
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, HashMap<String, StubResult>> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unknown_result(result_id: &str) -> EngineError {
        EngineError::Rpc {
            code: 404,
            message: format!("no result with id {result_id}"),
        }
    }

    fn state_of(&self, id: &str, result: &StubResult) -> ResultState {
        let terminal = result.polls_left == 0;
        ResultState {
            id: id.to_string(),
            is_ready: terminal && self.calculation_failure.is_none(),
            is_scheduled: !terminal || self.calculation_failure.is_none(),
            error: if terminal {
                self.calculation_failure.clone()
            } else {
                None
            },
            time: None,
        }
    }
}

/// Build an impact value the way the engine reports it.
pub fn impact(category: &str, unit: &str, amount: f64) -> ImpactValue {
    ImpactValue {
        impact_category: Ref {
            ty: Some(EntityType::ImpactCategory.as_str().to_string()),
            id: format!("cat-{category}"),
            name: Some(category.to_string()),
            ref_unit: Some(unit.to_string()),
        },
        amount,
    }
}

impl Engine for StubEngine {
    fn endpoint(&self) -> &str {
        "stub://engine"
    }

    fn descriptors(&self, ty: EntityType) -> EngineResult<Vec<Ref>> {
        self.counters.descriptors.fetch_add(1, Ordering::SeqCst);
        let still_booting = self
            .unavailable_descriptors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if still_booting {
            return Err(EngineError::Transport {
                message: "server is starting".to_string(),
            });
        }

        Ok(match ty {
            EntityType::ProductSystem => self.systems.iter().map(|s| s.reference.clone()).collect(),
            EntityType::ImpactMethod => self.methods.clone(),
            EntityType::UnitGroup => self
                .unit_groups
                .iter()
                .map(|g| Ref::new(EntityType::UnitGroup, g.id.clone(), g.name.clone()))
                .collect(),
            EntityType::ImpactCategory | EntityType::Process => Vec::new(),
        })
    }

    fn find_by_name(&self, ty: EntityType, name: &str) -> EngineResult<Option<Ref>> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        let found = match ty {
            EntityType::ProductSystem => self
                .systems
                .iter()
                .find(|s| s.reference.name_or_empty() == name)
                .map(|s| s.reference.clone()),
            EntityType::ImpactMethod => self
                .methods
                .iter()
                .find(|m| m.name_or_empty() == name)
                .cloned(),
            EntityType::UnitGroup => self
                .unit_groups
                .iter()
                .find(|g| g.name == name)
                .map(|g| Ref::new(EntityType::UnitGroup, g.id.clone(), g.name.clone())),
            EntityType::ImpactCategory | EntityType::Process => None,
        };
        Ok(found)
    }

    fn unit_group(&self, name: &str) -> EngineResult<Option<UnitGroup>> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.unit_groups.iter().find(|g| g.name == name).cloned())
    }

    fn parameters(&self, system: &Ref) -> EngineResult<Vec<ParameterRedef>> {
        self.counters.parameters.fetch_add(1, Ordering::SeqCst);
        self.systems
            .iter()
            .find(|s| s.reference.id == system.id)
            .map(|s| s.parameters.clone())
            .ok_or_else(|| EngineError::NotFound {
                entity: EntityType::ProductSystem,
                name: system.id.clone(),
            })
    }

    fn calculate(&self, setup: &CalculationSetup) -> EngineResult<ResultState> {
        self.counters.calculate.fetch_add(1, Ordering::SeqCst);
        if !self.systems.iter().any(|s| s.reference.id == setup.target.id) {
            return Err(EngineError::Rpc {
                code: 400,
                message: format!("unknown calculation target {}", setup.target.id),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let polls_left = if self.calculation_failure.is_some() {
            self.pending_polls.max(1)
        } else {
            self.pending_polls
        };
        let result = StubResult {
            setup: setup.clone(),
            polls_left,
        };
        let state = self.state_of(&id, &result);
        self.lock_results().insert(id, result);
        Ok(state)
    }

    fn state(&self, result_id: &str) -> EngineResult<ResultState> {
        self.counters.state.fetch_add(1, Ordering::SeqCst);
        let mut results = self.lock_results();
        let result = results
            .get_mut(result_id)
            .ok_or_else(|| Self::unknown_result(result_id))?;
        result.polls_left = result.polls_left.saturating_sub(1);
        Ok(self.state_of(result_id, result))
    }

    fn total_impacts(&self, result_id: &str) -> EngineResult<Vec<ImpactValue>> {
        self.counters.impacts.fetch_add(1, Ordering::SeqCst);
        let results = self.lock_results();
        let result = results
            .get(result_id)
            .ok_or_else(|| Self::unknown_result(result_id))?;
        if result.polls_left > 0 {
            return Err(EngineError::Rpc {
                code: 409,
                message: "result is not ready".to_string(),
            });
        }
        Ok((self.impacts)(&result.setup))
    }

    fn dispose(&self, result_id: &str) -> EngineResult<()> {
        self.counters.dispose.fetch_add(1, Ordering::SeqCst);
        self.lock_results()
            .remove(result_id)
            .map(|_| ())
            .ok_or_else(|| Self::unknown_result(result_id))
    }
}
