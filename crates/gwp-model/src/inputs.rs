//! Caller-supplied scalar inputs of one calculation.

use gwp_core::{Real, ensure_finite};
use serde::{Deserialize, Serialize};

use crate::binding::{ModelVariant, Role};
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcInputs {
    pub distance: Real,
    pub factor: Real,
    pub load: Real,
    pub amount: Real,
    #[serde(rename = "oilUse", default, skip_serializing_if = "Option::is_none")]
    pub oil_use: Option<Real>,
}

impl CalcInputs {
    pub fn new(distance: Real, factor: Real, load: Real, amount: Real) -> Self {
        Self {
            distance,
            factor,
            load,
            amount,
            oil_use: None,
        }
    }

    pub fn with_oil_use(mut self, oil_use: Real) -> Self {
        self.oil_use = Some(oil_use);
        self
    }

    pub fn value(&self, role: Role) -> Option<Real> {
        match role {
            Role::Distance => Some(self.distance),
            Role::Factor => Some(self.factor),
            Role::Load => Some(self.load),
            Role::OilUse => self.oil_use,
        }
    }

    /// Check that every input the variant needs is present and finite.
    pub fn validate(&self, variant: ModelVariant) -> ModelResult<()> {
        ensure_finite(self.amount, "amount")?;
        for role in variant.binding().inputs {
            let value = self
                .value(*role)
                .ok_or(ModelError::MissingInput { field: role.key() })?;
            ensure_finite(value, role.key())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oil_use_is_serialized_camel_case() {
        let inputs = CalcInputs::new(120.0, 0.5, 2.3, 10.0).with_oil_use(3.0);
        let value = serde_json::to_value(inputs).unwrap();
        assert_eq!(value["oilUse"], 3.0);

        let mass = serde_json::to_value(CalcInputs::new(1.0, 1.0, 1.0, 1.0)).unwrap();
        assert!(mass.get("oilUse").is_none());
    }

    #[test]
    fn validate_per_variant() {
        let inputs = CalcInputs::new(120.0, 0.5, 2.3, 10.0);
        assert!(inputs.validate(ModelVariant::Mass).is_ok());
        assert_eq!(
            inputs.validate(ModelVariant::Fuel).unwrap_err(),
            ModelError::MissingInput { field: "oilUse" }
        );

        let bad = CalcInputs::new(f64::INFINITY, 0.5, 2.3, 10.0);
        assert!(matches!(
            bad.validate(ModelVariant::Mass),
            Err(ModelError::InvalidInput(_))
        ));
    }
}
