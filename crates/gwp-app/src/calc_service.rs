//! Calculation orchestration against the shared engine handle.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gwp_engine::{CalculationResult, CalculationSetup, Engine, ImpactValue};
use gwp_model::{BindingReport, CalcInputs, ModelVariant, Resolver, bind, validate_binding};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppResult;

/// Impact categories whose name contains this marker are kept.
pub const GWP_MARKER: &str = "GWP";

/// One retained impact category total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub category: String,
    pub value: f64,
    pub unit: String,
}

impl ImpactResult {
    fn from_engine(value: &ImpactValue) -> Self {
        Self {
            category: value.impact_category.name_or_empty().to_string(),
            value: value.amount,
            unit: value.impact_category.ref_unit.clone().unwrap_or_default(),
        }
    }
}

/// Keep the GWP family, in engine order.
pub fn gwp_only(totals: &[ImpactValue]) -> Vec<ImpactResult> {
    totals
        .iter()
        .filter(|v| v.impact_category.name_or_empty().contains(GWP_MARKER))
        .map(ImpactResult::from_engine)
        .collect()
}

/// Runs calculations on the engine handle created at startup.
///
/// The handle is shared between request threads, but at most one
/// calculation is in flight: the lock covers everything from model
/// resolution to disposal of the engine-side result.
pub struct Calculator {
    engine: Arc<dyn Engine>,
    impact_method: String,
    poll_interval: Duration,
    lock: Mutex<()>,
}

impl Calculator {
    pub fn new(engine: Arc<dyn Engine>, impact_method: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            engine,
            impact_method: impact_method.into(),
            poll_interval,
            lock: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn impact_method(&self) -> &str {
        &self.impact_method
    }

    /// Kitchen-waste model.
    pub fn compute_by_mass(
        &self,
        distance: f64,
        factor: f64,
        load: f64,
        amount: f64,
    ) -> AppResult<Vec<ImpactResult>> {
        self.compute(
            ModelVariant::Mass,
            &CalcInputs::new(distance, factor, load, amount),
        )
    }

    /// Fuel-consumption model; the amount is expressed in tonnes.
    pub fn compute_by_fuel(
        &self,
        distance: f64,
        factor: f64,
        load: f64,
        amount: f64,
        oil_use: f64,
    ) -> AppResult<Vec<ImpactResult>> {
        self.compute(
            ModelVariant::Fuel,
            &CalcInputs::new(distance, factor, load, amount).with_oil_use(oil_use),
        )
    }

    /// Resolve, bind, run and dispose one calculation; returns GWP categories only.
    pub fn compute(&self, variant: ModelVariant, inputs: &CalcInputs) -> AppResult<Vec<ImpactResult>> {
        inputs.validate(variant)?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let engine = self.engine();
        let resolver = Resolver::new(engine);
        let binding = variant.binding();

        let model = resolver.resolve_model(variant.system_name())?;
        let declared = resolver.resolve_parameters(&model)?;
        let method = resolver.resolve_method(&self.impact_method)?;
        let unit = match binding.amount_unit {
            Some(spec) => Some(resolver.resolve_unit(spec.group, spec.symbol)?.to_ref()),
            None => None,
        };
        let parameters = bind(binding, &declared, inputs)?;
        debug!(
            model = variant.system_name(),
            parameters = ?parameters.iter().map(|p| (&p.name, p.value)).collect::<Vec<_>>(),
            "bound parameters"
        );

        let setup = CalculationSetup {
            target: model,
            amount: Some(inputs.amount),
            unit,
            impact_method: Some(method),
            parameters,
        };

        let mut result = CalculationResult::submit(engine, &setup)?;
        let totals = result
            .wait_until_ready(self.poll_interval)
            .and_then(|()| result.total_impacts());
        let result_id = result.id().to_string();
        if let Err(err) = result.dispose() {
            warn!(result_id, error = %err, "failed to dispose calculation result");
        }

        let impacts = gwp_only(&totals?);
        info!(
            model = variant.system_name(),
            categories = impacts.len(),
            "calculation finished"
        );
        Ok(impacts)
    }

    /// Check both binding tables against the engine's declared parameters.
    pub fn validate_bindings(&self) -> AppResult<Vec<BindingReport>> {
        let resolver = Resolver::new(self.engine());
        ModelVariant::ALL
            .into_iter()
            .map(|variant| {
                let model = resolver.resolve_model(variant.system_name())?;
                let declared = resolver.resolve_parameters(&model)?;
                let report = validate_binding(variant.binding(), &declared)?;
                info!(
                    model = report.model,
                    slots = report.slots.len(),
                    confirmed = report.confirmed(),
                    "binding validated"
                );
                Ok(report)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use gwp_engine::stub::impact;
    use gwp_engine::{EngineError, StubEngine};

    fn catalog() -> StubEngine {
        StubEngine::new()
            .with_system("廚餘處理量", &["factor", "distance", "load"])
            .with_system("燃料消耗碳排", &["factor", "oil_use", "distance", "load"])
            .with_method("IPCC 2021 AR6")
            .with_unit_group("Units of mass", &[("kg", 1.0), ("t", 1000.0)])
    }

    #[test]
    fn keeps_only_gwp_categories() {
        let totals = vec![
            impact("Global Warming Potential (GWP)", "kg CO2-eq", 42.0),
            impact("Acidification", "mol H+-eq", 1.0),
            impact("GWP100 - fossil", "kg CO2-eq", 40.0),
        ];
        let kept = gwp_only(&totals);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].unit, "kg CO2-eq");
        assert!(gwp_only(&totals[1..2]).is_empty());
    }

    #[test]
    fn mass_binding_follows_engine_order() {
        let engine = Arc::new(catalog().with_impacts(|setup| {
            let values: Vec<f64> = setup.parameters.iter().map(|p| p.value).collect();
            // factor, distance, load
            vec![impact("GWP", "kg CO2-eq", values[0] * values[1] * values[2])]
        }));
        let calc = Calculator::new(engine.clone(), "IPCC 2021 AR6", Duration::ZERO);
        let impacts = calc.compute_by_mass(120.0, 0.5, 2.0, 10.0).unwrap();
        assert_eq!(impacts[0].value, 120.0);
        assert_eq!(engine.live_results(), 0);
    }

    #[test]
    fn fuel_variant_attaches_tonnes() {
        let engine = Arc::new(catalog().with_impacts(|setup| {
            let unit = setup.unit.as_ref().and_then(|u| u.name.clone()).unwrap_or_default();
            vec![impact(&format!("GWP in {unit}"), "kg CO2-eq", setup.parameters[1].value)]
        }));
        let calc = Calculator::new(engine, "IPCC 2021 AR6", Duration::ZERO);
        let impacts = calc.compute_by_fuel(120.0, 0.5, 2.3, 10.0, 7.5).unwrap();
        assert_eq!(impacts[0].category, "GWP in t");
        assert_eq!(impacts[0].value, 7.5);
    }

    #[test]
    fn failed_calculation_is_disposed() {
        let engine = Arc::new(catalog().with_calculation_failure("matrix is singular"));
        let calc = Calculator::new(engine.clone(), "IPCC 2021 AR6", Duration::ZERO);
        let err = calc.compute_by_mass(1.0, 1.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            AppError::Engine(EngineError::CalculationFailed { ref message }) if message == "matrix is singular"
        ));
        assert_eq!(engine.calls().dispose, 1);
        assert_eq!(engine.live_results(), 0);
    }

    #[test]
    fn missing_method_aborts_before_submission() {
        let engine = Arc::new(catalog());
        let calc = Calculator::new(engine.clone(), "ReCiPe 2016", Duration::ZERO);
        let err = calc.compute_by_mass(1.0, 1.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::NotFound { .. })));
        assert_eq!(engine.calls().calculate, 0);
    }

    #[test]
    fn invalid_inputs_never_reach_the_engine() {
        let engine = Arc::new(catalog());
        let calc = Calculator::new(engine.clone(), "IPCC 2021 AR6", Duration::ZERO);
        let err = calc
            .compute(ModelVariant::Fuel, &CalcInputs::new(1.0, 1.0, 1.0, 1.0))
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(engine.calls().lookups, 0);
    }

    #[test]
    fn bindings_validate_against_catalog() {
        let calc = Calculator::new(Arc::new(catalog()), "IPCC 2021 AR6", Duration::ZERO);
        let reports = calc.validate_bindings().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].confirmed(), 3);
        assert_eq!(reports[1].confirmed(), 4);
    }
}
