//! Two-table persistence of calculation results.
//!
//! A calculation is stored as a parent impact row (one column per retained
//! category) and a child detail row in the table of its model variant,
//! linked through `ipcc_id`. Writes are sequential requests with no
//! transaction around them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gwp_core::RowId;
use gwp_model::{CalcInputs, ModelVariant};
use gwp_store::{Datastore, DetailPatch, EmissionDetailRow, ImpactColumns, NewDetail, TableNames};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::calc_service::{Calculator, ImpactResult};
use crate::error::{AppError, AppResult};

/// Route tags the telemetry stub picks from.
pub const ROUTE_TAGS: [&str; 5] = ["Taipei", "Taichung", "Kaohsiung", "Tainan", "Taoyuan"];

/// Synthetic timestamps fall within this many days before now.
pub const TELEMETRY_WINDOW_DAYS: i64 = 30;

/// Route and time attached to a new detail row.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub location: String,
    pub input_time: DateTime<Utc>,
}

/// Stand-in for vehicle telemetry that is not collected yet.
///
/// `Random` draws a route tag from [`ROUTE_TAGS`] and a time within the last
/// [`TELEMETRY_WINDOW_DAYS`] days.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TelemetryStub {
    #[default]
    Random,
    Fixed(Telemetry),
}

impl TelemetryStub {
    pub fn sample(&self) -> Telemetry {
        match self {
            TelemetryStub::Fixed(telemetry) => telemetry.clone(),
            TelemetryStub::Random => {
                let mut rng = rand::thread_rng();
                let location = ROUTE_TAGS.choose(&mut rng).copied().unwrap_or(ROUTE_TAGS[0]);
                let window = Duration::days(TELEMETRY_WINDOW_DAYS).num_seconds();
                let offset = rng.gen_range(0..=window);
                Telemetry {
                    location: location.to_string(),
                    input_time: Utc::now() - Duration::seconds(offset),
                }
            }
        }
    }
}

/// Which write of the create sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStage {
    Impact,
    Detail,
}

/// Persistence outcome reported next to a successful calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DbStatus {
    Ok {
        ipcc_id: RowId,
        co2_id: RowId,
    },
    Disabled,
    Error {
        stage: WriteStage,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ipcc_id: Option<RowId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },
}

impl DbStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DbStatus::Ok { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated {
        row: EmissionDetailRow,
        impacts: Vec<ImpactResult>,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(EmissionDetailRow),
    /// No row was deleted: the id does not exist or row-level policy hides it.
    NotFound,
}

/// Column map of a parent row.
pub fn impact_columns(impacts: &[ImpactResult]) -> ImpactColumns {
    impacts
        .iter()
        .map(|i| (i.category.clone(), i.value))
        .collect()
}

pub struct Persistence {
    store: Option<Arc<dyn Datastore>>,
    tables: TableNames,
    telemetry: TelemetryStub,
    compensate_orphans: bool,
}

impl Persistence {
    pub fn new(store: Option<Arc<dyn Datastore>>, tables: TableNames) -> Self {
        Self {
            store,
            tables,
            telemetry: TelemetryStub::default(),
            compensate_orphans: false,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, TableNames::default())
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryStub) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Delete the parent row again when its detail row cannot be written.
    pub fn with_compensation(mut self, enabled: bool) -> Self {
        self.compensate_orphans = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    pub fn store(&self) -> AppResult<&dyn Datastore> {
        self.store.as_deref().ok_or(AppError::StoreDisabled)
    }

    /// Child table of `variant`.
    pub fn detail_table(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::Mass => &self.tables.tkm_detail,
            ModelVariant::Fuel => &self.tables.oil_detail,
        }
    }

    /// Store a finished calculation. Never fails the caller; problems are
    /// reported in the returned status.
    pub fn create(
        &self,
        inputs: &CalcInputs,
        impacts: &[ImpactResult],
        variant: ModelVariant,
    ) -> DbStatus {
        let Some(store) = self.store.as_deref() else {
            return DbStatus::Disabled;
        };

        let ipcc_id = match store.insert_impact(&self.tables.impact, &impact_columns(impacts)) {
            Ok(id) => id,
            Err(err) => {
                warn!(table = %self.tables.impact, error = %err, "impact row insert failed");
                return DbStatus::Error {
                    stage: WriteStage::Impact,
                    message: err.to_string(),
                    ipcc_id: None,
                    detail: err.detail().cloned(),
                };
            }
        };

        let table = self.detail_table(variant);
        let telemetry = self.telemetry.sample();
        let detail = NewDetail {
            distance: inputs.distance,
            coefficient: inputs.factor,
            load: inputs.load,
            amount: inputs.amount,
            oil_use: inputs.oil_use,
            location: Some(telemetry.location),
            input_time: telemetry.input_time,
            ipcc_id,
        };

        match store.insert_detail(table, &detail) {
            Ok(row) => {
                info!(table, %ipcc_id, co2_id = %row.id, "stored calculation");
                DbStatus::Ok {
                    ipcc_id,
                    co2_id: row.id,
                }
            }
            Err(err) => {
                warn!(table, %ipcc_id, error = %err, "detail row insert failed");
                let mut message = err.to_string();
                if self.compensate_orphans {
                    match store.delete_impact(&self.tables.impact, ipcc_id) {
                        Ok(_) => message.push_str(&format!("; impact row {ipcc_id} removed")),
                        Err(cleanup) => {
                            warn!(%ipcc_id, error = %cleanup, "orphaned impact row could not be removed");
                            message.push_str(&format!(
                                "; removing impact row {ipcc_id} failed: {cleanup}"
                            ));
                        }
                    }
                }
                DbStatus::Error {
                    stage: WriteStage::Detail,
                    message,
                    ipcc_id: Some(ipcc_id),
                    detail: err.detail().cloned(),
                }
            }
        }
    }

    /// Recompute a stored record with new inputs and overwrite both rows.
    ///
    /// `location` replaces the stored route tag when given.
    pub fn update(
        &self,
        calculator: &Calculator,
        id: RowId,
        variant: ModelVariant,
        inputs: &CalcInputs,
        location: Option<String>,
    ) -> AppResult<UpdateOutcome> {
        let store = self.store()?;
        let table = self.detail_table(variant);

        let Some(existing) = store.get_detail(table, id)? else {
            return Ok(UpdateOutcome::NotFound);
        };

        let impacts = calculator.compute(variant, inputs)?;
        let touched = store.update_impact(&self.tables.impact, existing.ipcc_id, &impact_columns(&impacts))?;
        if touched == 0 {
            warn!(ipcc_id = %existing.ipcc_id, "impact row of updated record is missing");
        }

        let patch = DetailPatch {
            distance: Some(inputs.distance),
            coefficient: Some(inputs.factor),
            load: Some(inputs.load),
            amount: Some(inputs.amount),
            oil_use: inputs.oil_use,
            location,
        };
        let mut rows = store.update_detail(table, id, &patch)?;
        if rows.is_empty() {
            return Ok(UpdateOutcome::NotFound);
        }
        info!(table, %id, "updated calculation");
        Ok(UpdateOutcome::Updated {
            row: rows.remove(0),
            impacts,
        })
    }

    /// Delete a detail row. Its impact row is left in place.
    pub fn delete(&self, id: RowId, variant: ModelVariant) -> AppResult<DeleteOutcome> {
        let store = self.store()?;
        let table = self.detail_table(variant);
        let mut rows = store.delete_detail(table, id)?;
        if rows.is_empty() {
            return Ok(DeleteOutcome::NotFound);
        }
        info!(table, %id, "deleted detail row");
        Ok(DeleteOutcome::Deleted(rows.remove(0)))
    }
}
