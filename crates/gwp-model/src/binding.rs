//! Declarative binding of caller inputs to engine parameter positions.
//!
//! The engine redefines parameters by name, but the names are whatever the
//! model author chose, so each model carries a table of semantic roles in the
//! order the engine declares its parameters. The order differs between models
//! and is never inferred from the names.

use std::fmt;

use gwp_engine::ParameterRedef;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::inputs::CalcInputs;

/// Semantic meaning of one caller-supplied scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Distance,
    Factor,
    Load,
    OilUse,
}

impl Role {
    /// JSON field name used by callers.
    pub fn key(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Factor => "factor",
            Self::Load => "load",
            Self::OilUse => "oilUse",
        }
    }

    /// Words that identify this role in an engine parameter name.
    ///
    /// ASCII hints must equal a whole name token; CJK hints may appear
    /// anywhere inside a token since those names carry no separators.
    pub fn name_hints(self) -> &'static [&'static str] {
        match self {
            Self::Distance => &["distance", "dist", "距離", "里程"],
            Self::Factor => &["factor", "coef", "coefficient", "係數", "系數"],
            Self::Load => &["load", "weight", "載重", "重量"],
            Self::OilUse => &["oil", "fuel", "油"],
        }
    }

    /// True when a token of `parameter_name` matches one of this role's hints.
    pub fn matches_name(self, parameter_name: &str) -> bool {
        let tokens = name_tokens(parameter_name);
        self.name_hints().iter().any(|hint| {
            tokens.iter().any(|token| {
                if hint.is_ascii() {
                    token == hint
                } else {
                    token.contains(hint)
                }
            })
        })
    }
}

/// Lower-case tokens of a parameter name, split on separators and at
/// camelCase humps (`transportDistance_km` gives `transport`, `distance`, `km`).
fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Unit the calculation amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub group: &'static str,
    pub symbol: &'static str,
}

/// Binding table entry for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelBinding {
    pub variant: ModelVariant,
    /// Roles in engine parameter order.
    pub slots: &'static [Role],
    /// Required caller inputs in caller-facing order.
    pub inputs: &'static [Role],
    pub amount_unit: Option<UnitSpec>,
}

const MASS_BINDING: ModelBinding = ModelBinding {
    variant: ModelVariant::Mass,
    slots: &[Role::Factor, Role::Distance, Role::Load],
    inputs: &[Role::Distance, Role::Factor, Role::Load],
    amount_unit: None,
};

const FUEL_BINDING: ModelBinding = ModelBinding {
    variant: ModelVariant::Fuel,
    slots: &[Role::Factor, Role::OilUse, Role::Distance, Role::Load],
    inputs: &[Role::Distance, Role::Factor, Role::Load, Role::OilUse],
    amount_unit: Some(UnitSpec {
        group: "Units of mass",
        symbol: "t",
    }),
};

/// The two computable systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Kitchen-waste processing, per tonne-kilometre.
    Mass,
    /// Fuel-consumption emissions, per oil use and kilometre.
    Fuel,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Mass, ModelVariant::Fuel];

    /// Exact product-system name in the engine catalog.
    pub fn system_name(self) -> &'static str {
        match self {
            Self::Mass => "廚餘處理量",
            Self::Fuel => "燃料消耗碳排",
        }
    }

    /// Path segment under `/calculate/`.
    pub fn route(self) -> &'static str {
        match self {
            Self::Mass => "Co2BYTKM",
            Self::Fuel => "Co2BYOilKM",
        }
    }

    /// Short key used in query strings and CLI arguments.
    pub fn key(self) -> &'static str {
        match self {
            Self::Mass => "tkm",
            Self::Fuel => "oil",
        }
    }

    pub fn binding(self) -> &'static ModelBinding {
        match self {
            Self::Mass => &MASS_BINDING,
            Self::Fuel => &FUEL_BINDING,
        }
    }

    pub fn from_route(route: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.route() == route)
    }

    pub fn from_key(key: &str) -> ModelResult<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| ModelError::UnknownVariant(key.to_string()))
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.system_name())
    }
}

/// Build the parameter redefinitions for one calculation.
///
/// Slot `i` of the engine's declared parameters receives the input bound to
/// role `binding.slots[i]`. Declared parameters beyond the table keep their
/// engine values and are not redefined.
pub fn bind(
    binding: &ModelBinding,
    declared: &[ParameterRedef],
    inputs: &CalcInputs,
) -> ModelResult<Vec<ParameterRedef>> {
    if declared.len() < binding.slots.len() {
        return Err(ModelError::SlotCount {
            model: binding.variant.system_name(),
            expected: binding.slots.len(),
            found: declared.len(),
        });
    }

    binding
        .slots
        .iter()
        .zip(declared)
        .map(|(role, slot)| {
            let value = inputs
                .value(*role)
                .ok_or(ModelError::MissingInput { field: role.key() })?;
            Ok(ParameterRedef {
                name: slot.name.clone(),
                value,
                context: slot.context.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(names: &[&str]) -> Vec<ParameterRedef> {
        names
            .iter()
            .map(|n| ParameterRedef {
                name: (*n).to_string(),
                value: 0.0,
                context: None,
            })
            .collect()
    }

    #[test]
    fn mass_binding_puts_factor_first() {
        let inputs = CalcInputs::new(120.0, 0.5, 2.3, 10.0);
        let redefs = bind(
            ModelVariant::Mass.binding(),
            &declared(&["p0", "p1", "p2"]),
            &inputs,
        )
        .unwrap();
        let values: Vec<_> = redefs.iter().map(|r| (r.name.as_str(), r.value)).collect();
        assert_eq!(values, [("p0", 0.5), ("p1", 120.0), ("p2", 2.3)]);
    }

    #[test]
    fn fuel_binding_inserts_oil_use_before_distance() {
        let inputs = CalcInputs::new(120.0, 0.5, 2.3, 10.0).with_oil_use(35.0);
        let redefs = bind(
            ModelVariant::Fuel.binding(),
            &declared(&["p0", "p1", "p2", "p3"]),
            &inputs,
        )
        .unwrap();
        let values: Vec<_> = redefs.iter().map(|r| r.value).collect();
        assert_eq!(values, [0.5, 35.0, 120.0, 2.3]);
    }

    #[test]
    fn too_few_declared_parameters() {
        let inputs = CalcInputs::new(1.0, 1.0, 1.0, 1.0);
        let err = bind(ModelVariant::Mass.binding(), &declared(&["p0"]), &inputs).unwrap_err();
        assert!(matches!(
            err,
            ModelError::SlotCount {
                expected: 3,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn fuel_binding_requires_oil_use() {
        let inputs = CalcInputs::new(1.0, 1.0, 1.0, 1.0);
        let err = bind(
            ModelVariant::Fuel.binding(),
            &declared(&["a", "b", "c", "d"]),
            &inputs,
        )
        .unwrap_err();
        assert_eq!(err, ModelError::MissingInput { field: "oilUse" });
    }

    #[test]
    fn variant_lookup() {
        assert_eq!(ModelVariant::from_route("Co2BYOilKM"), Some(ModelVariant::Fuel));
        assert_eq!(ModelVariant::from_route("co2bytkm"), None);
        assert_eq!(ModelVariant::from_key("TKM").unwrap(), ModelVariant::Mass);
        assert!(ModelVariant::from_key("diesel").is_err());
    }

    #[test]
    fn role_hints_match_case_insensitively() {
        assert!(Role::Distance.matches_name("Transport_Distance"));
        assert!(Role::OilUse.matches_name("fuel_l"));
        assert!(!Role::Load.matches_name("factor"));
    }

    #[test]
    fn role_hints_match_whole_tokens_only() {
        assert!(!Role::Distance.matches_name("liters_per_km"));
        assert!(!Role::Distance.matches_name("kgco2_per_tkm"));
        assert!(!Role::OilUse.matches_name("boiler_load"));
        assert!(Role::OilUse.matches_name("oilUse"));
        assert!(Role::Distance.matches_name("transportDistance_km"));
        assert!(Role::Distance.matches_name("運輸距離"));
        assert_eq!(
            name_tokens("Emission-FactorCO2 load_t"),
            ["emission", "factor", "co2", "load", "t"]
        );
    }
}
