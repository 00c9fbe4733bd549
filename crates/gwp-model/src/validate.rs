//! Startup check of binding tables against the engine's declared parameters.

use gwp_engine::ParameterRedef;

use crate::binding::{ModelBinding, Role};
use crate::error::{ModelError, ModelResult};

/// Outcome for one parameter position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotCheck {
    /// The parameter name matches the bound role's hints.
    Confirmed { slot: String, role: Role },
    /// The name gives no hint either way.
    Unverified { slot: String, role: Role },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingReport {
    pub model: &'static str,
    pub slots: Vec<SlotCheck>,
}

impl BindingReport {
    pub fn confirmed(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, SlotCheck::Confirmed { .. }))
            .count()
    }
}

/// Compare a binding table with the declared parameter list.
///
/// Fails on a count mismatch, or when a parameter name matches exactly one
/// other role and not the one bound at its position. Names matching several
/// roles or none stay unverified.
pub fn validate_binding(
    binding: &ModelBinding,
    declared: &[ParameterRedef],
) -> ModelResult<BindingReport> {
    let model = binding.variant.system_name();
    if declared.len() != binding.slots.len() {
        return Err(ModelError::SlotCount {
            model,
            expected: binding.slots.len(),
            found: declared.len(),
        });
    }

    let mut slots = Vec::with_capacity(declared.len());
    for (position, (role, param)) in binding.slots.iter().zip(declared).enumerate() {
        let role = *role;
        if role.matches_name(&param.name) {
            slots.push(SlotCheck::Confirmed {
                slot: param.name.clone(),
                role,
            });
            continue;
        }

        let others: Vec<Role> = binding
            .slots
            .iter()
            .copied()
            .filter(|r| *r != role && r.matches_name(&param.name))
            .collect();
        if let [found] = others.as_slice() {
            return Err(ModelError::Drift {
                model,
                position,
                slot: param.name.clone(),
                expected: role,
                found: *found,
            });
        }

        slots.push(SlotCheck::Unverified {
            slot: param.name.clone(),
            role,
        });
    }

    Ok(BindingReport { model, slots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ModelVariant;

    fn declared(names: &[&str]) -> Vec<ParameterRedef> {
        names
            .iter()
            .map(|n| ParameterRedef {
                name: (*n).to_string(),
                value: 1.0,
                context: None,
            })
            .collect()
    }

    #[test]
    fn matching_names_are_confirmed() {
        let report = validate_binding(
            ModelVariant::Mass.binding(),
            &declared(&["emission_factor", "distance_km", "load_t"]),
        )
        .unwrap();
        assert_eq!(report.confirmed(), 3);
    }

    #[test]
    fn opaque_names_are_unverified_not_rejected() {
        let report = validate_binding(
            ModelVariant::Fuel.binding(),
            &declared(&["p1", "p2", "p3", "p4"]),
        )
        .unwrap();
        assert_eq!(report.confirmed(), 0);
        assert_eq!(report.slots.len(), 4);
    }

    #[test]
    fn swapped_parameters_are_drift() {
        let err = validate_binding(
            ModelVariant::Mass.binding(),
            &declared(&["distance", "factor", "load"]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::Drift {
                model: "廚餘處理量",
                position: 0,
                slot: "distance".into(),
                expected: Role::Factor,
                found: Role::Distance,
            }
        );
    }

    #[test]
    fn unit_suffixes_are_not_distances() {
        let report = validate_binding(
            ModelVariant::Fuel.binding(),
            &declared(&["emission_factor", "liters_per_km", "distance", "load"]),
        )
        .unwrap();
        assert!(matches!(report.slots[1], SlotCheck::Unverified { role: Role::OilUse, .. }));

        let report = validate_binding(
            ModelVariant::Mass.binding(),
            &declared(&["kgco2_per_tkm", "distance", "load"]),
        )
        .unwrap();
        assert_eq!(report.confirmed(), 2);
    }

    #[test]
    fn names_hinting_at_several_roles_are_unverified() {
        let report = validate_binding(
            ModelVariant::Fuel.binding(),
            &declared(&["factor", "fuel_distance", "distance", "load"]),
        )
        .unwrap();
        assert!(matches!(report.slots[1], SlotCheck::Confirmed { role: Role::OilUse, .. }));

        let report = validate_binding(
            ModelVariant::Mass.binding(),
            &declared(&["load_distance", "distance", "load"]),
        )
        .unwrap();
        assert!(matches!(report.slots[0], SlotCheck::Unverified { role: Role::Factor, .. }));
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = validate_binding(
            ModelVariant::Fuel.binding(),
            &declared(&["factor", "distance", "load"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::SlotCount {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }
}
