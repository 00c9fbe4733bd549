//! openLCA schema types exchanged with the engine.
//!
//! Only the fields the service reads or writes are modelled; unknown fields in
//! engine responses are ignored on deserialization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity types addressed through the `@type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    ProductSystem,
    ImpactMethod,
    ImpactCategory,
    UnitGroup,
    Process,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductSystem => "ProductSystem",
            Self::ImpactMethod => "ImpactMethod",
            Self::ImpactCategory => "ImpactCategory",
            Self::UnitGroup => "UnitGroup",
            Self::Process => "Process",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an engine-owned entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reference unit label, only present on impact category refs.
    #[serde(rename = "refUnit", default, skip_serializing_if = "Option::is_none")]
    pub ref_unit: Option<String>,
}

impl Ref {
    pub fn new(ty: EntityType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: Some(ty.as_str().to_string()),
            id: id.into(),
            name: Some(name.into()),
            ref_unit: None,
        }
    }

    /// Name or empty string when the engine omitted it.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Redefinition of one parameter value for a single calculation.
///
/// The parameter listing of a product system uses the same shape, carrying the
/// currently declared value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRedef {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Ref>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(default = "one")]
    pub conversion_factor: f64,
    #[serde(default)]
    pub is_ref_unit: bool,
}

fn one() -> f64 {
    1.0
}

impl Unit {
    pub fn to_ref(&self) -> Ref {
        Ref {
            ty: Some("Unit".to_string()),
            id: self.id.clone(),
            name: Some(self.name.clone()),
            ref_unit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGroup {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl UnitGroup {
    pub fn unit(&self, symbol: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name == symbol)
    }
}

/// Calculation request submitted via `result/calculate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationSetup {
    pub target: Ref,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_method: Option<Ref>,
    #[serde(default)]
    pub parameters: Vec<ParameterRedef>,
}

/// Engine-side state of a submitted calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultState {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub is_scheduled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

/// Phase of the engine-managed result state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPhase {
    Queued,
    Running,
    Ready,
    Failed(String),
}

impl ResultPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }
}

impl ResultState {
    pub fn phase(&self) -> ResultPhase {
        if let Some(err) = &self.error {
            ResultPhase::Failed(err.clone())
        } else if self.is_ready {
            ResultPhase::Ready
        } else if self.is_scheduled {
            ResultPhase::Running
        } else {
            ResultPhase::Queued
        }
    }
}

/// Total result of one impact category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactValue {
    pub impact_category: Ref,
    #[serde(default)]
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setup_serializes_camel_case() {
        let setup = CalculationSetup {
            target: Ref::new(EntityType::ProductSystem, "ps-1", "廚餘處理量"),
            amount: Some(10.0),
            unit: None,
            impact_method: Some(Ref::new(EntityType::ImpactMethod, "m-1", "IPCC 2021 AR6")),
            parameters: vec![ParameterRedef {
                name: "factor".into(),
                value: 0.5,
                context: None,
            }],
        };

        let value = serde_json::to_value(&setup).unwrap();
        assert_eq!(value["target"]["@type"], "ProductSystem");
        assert_eq!(value["impactMethod"]["@id"], "m-1");
        assert_eq!(value["parameters"][0]["value"], 0.5);
        assert!(value.get("unit").is_none());
    }

    #[test]
    fn impact_value_reads_engine_shape() {
        let raw = json!({
            "@type": "ImpactValue",
            "impactCategory": {
                "@type": "ImpactCategory",
                "@id": "c-1",
                "name": "Global Warming Potential (GWP100)",
                "refUnit": "kg CO2-eq",
                "category": "IPCC"
            },
            "amount": 42.0
        });
        let value: ImpactValue = serde_json::from_value(raw).unwrap();
        assert_eq!(value.amount, 42.0);
        assert_eq!(value.impact_category.ref_unit.as_deref(), Some("kg CO2-eq"));
    }

    #[test]
    fn result_phases() {
        let mut state = ResultState {
            id: "r".into(),
            is_ready: false,
            is_scheduled: false,
            error: None,
            time: None,
        };
        assert_eq!(state.phase(), ResultPhase::Queued);
        state.is_scheduled = true;
        assert_eq!(state.phase(), ResultPhase::Running);
        state.is_ready = true;
        assert_eq!(state.phase(), ResultPhase::Ready);
        state.error = Some("boom".into());
        assert_eq!(state.phase(), ResultPhase::Failed("boom".into()));
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn unit_lookup_is_exact() {
        let group: UnitGroup = serde_json::from_value(json!({
            "@id": "g",
            "name": "Units of mass",
            "units": [
                {"@id": "u-kg", "name": "kg", "conversionFactor": 1.0, "isRefUnit": true},
                {"@id": "u-t", "name": "t", "conversionFactor": 1000.0}
            ]
        }))
        .unwrap();
        assert_eq!(group.unit("t").map(|u| u.conversion_factor), Some(1000.0));
        assert!(group.unit("T").is_none());
    }
}
