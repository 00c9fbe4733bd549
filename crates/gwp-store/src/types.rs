//! Row types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gwp_core::RowId;
use serde::{Deserialize, Serialize};

/// Parent row payload: one numeric column per retained impact category,
/// keyed by category name.
pub type ImpactColumns = BTreeMap<String, f64>;

/// Table names of the parent table and the two child tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub impact: String,
    pub tkm_detail: String,
    pub oil_detail: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            impact: "ipcc".to_string(),
            tkm_detail: "co2_by_tkm".to_string(),
            oil_detail: "co2_by_oil_km".to_string(),
        }
    }
}

/// Stored child row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionDetailRow {
    pub id: RowId,
    pub distance: f64,
    pub coefficient: f64,
    pub load: f64,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_use: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    pub input_time: DateTime<Utc>,
    pub ipcc_id: RowId,
}

/// Child row to insert; the id is assigned by the datastore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDetail {
    pub distance: f64,
    pub coefficient: f64,
    pub load: f64,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_use: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub input_time: DateTime<Utc>,
    pub ipcc_id: RowId,
}

impl NewDetail {
    pub fn into_row(self, id: RowId) -> EmissionDetailRow {
        EmissionDetailRow {
            id,
            distance: self.distance,
            coefficient: self.coefficient,
            load: self.load,
            amount: self.amount,
            oil_use: self.oil_use,
            location: self.location,
            input_time: self.input_time,
            ipcc_id: self.ipcc_id,
        }
    }
}

/// Editable fields of a child row. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_use: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl DetailPatch {
    pub fn apply(&self, row: &mut EmissionDetailRow) {
        if let Some(v) = self.distance {
            row.distance = v;
        }
        if let Some(v) = self.coefficient {
            row.coefficient = v;
        }
        if let Some(v) = self.load {
            row.load = v;
        }
        if let Some(v) = self.amount {
            row.amount = v;
        }
        if let Some(v) = self.oil_use {
            row.oil_use = Some(v);
        }
        if let Some(v) = &self.location {
            row.location = Some(v.clone());
        }
    }
}

/// Conjunctive read filter; `None` fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl DetailFilter {
    /// Inclusive bounds on `input_time`, exact match on `location`.
    pub fn matches(&self, row: &EmissionDetailRow) -> bool {
        if let Some(start) = self.start
            && row.input_time < start
        {
            return false;
        }
        if let Some(end) = self.end
            && row.input_time > end
        {
            return false;
        }
        match &self.location {
            Some(location) => row.location.as_deref() == Some(location.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(location: &str, day: u32) -> EmissionDetailRow {
        EmissionDetailRow {
            id: RowId::new(1),
            distance: 120.0,
            coefficient: 0.5,
            load: 2.3,
            amount: 10.0,
            oil_use: None,
            location: Some(location.to_string()),
            input_time: Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap(),
            ipcc_id: RowId::new(7),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(DetailFilter::default().matches(&row("Taipei", 3)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let r = row("Taipei", 3);
        let filter = DetailFilter {
            start: Some(r.input_time),
            end: Some(r.input_time),
            location: None,
        };
        assert!(filter.matches(&r));
    }

    #[test]
    fn location_must_match_exactly() {
        let filter = DetailFilter {
            location: Some("Tainan".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&row("Taipei", 3)));
        assert!(filter.matches(&row("Tainan", 3)));
    }

    #[test]
    fn patch_keeps_unset_columns() {
        let mut r = row("Taipei", 3);
        DetailPatch {
            distance: Some(200.0),
            ..Default::default()
        }
        .apply(&mut r);
        assert_eq!(r.distance, 200.0);
        assert_eq!(r.location.as_deref(), Some("Taipei"));
    }

    #[test]
    fn detail_row_reads_postgrest_json() {
        let r: EmissionDetailRow = serde_json::from_str(
            r#"{"id":3,"distance":120,"coefficient":0.5,"load":2.3,"amount":10,
                "location":"Kaohsiung","input_time":"2026-10-01T08:30:00+00:00","ipcc_id":9}"#,
        )
        .unwrap();
        assert_eq!(r.id, RowId::new(3));
        assert_eq!(r.ipcc_id.get(), 9);
        assert!(r.oil_use.is_none());
    }
}
