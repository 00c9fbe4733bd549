//! In-memory datastore for tests. Built with `cfg(test)` or the `testing` feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use gwp_core::RowId;

use crate::store::Datastore;
use crate::types::{DetailFilter, DetailPatch, EmissionDetailRow, ImpactColumns, NewDetail};
use crate::{StoreError, StoreResult};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertImpact,
    UpdateImpact,
    DeleteImpact,
    InsertDetail,
    GetDetail,
    UpdateDetail,
    DeleteDetail,
    ListDetails,
}

#[derive(Default)]
struct Tables {
    next_id: HashMap<String, i64>,
    impacts: HashMap<String, BTreeMap<RowId, ImpactColumns>>,
    details: HashMap<String, BTreeMap<RowId, EmissionDetailRow>>,
}

impl Tables {
    fn allocate(&mut self, table: &str) -> RowId {
        let next = self.next_id.entry(table.to_string()).or_insert(1);
        let id = RowId::new(*next);
        *next += 1;
        id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<HashMap<StoreOp, StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `op` fail with `err`.
    pub fn fail_on(&self, op: StoreOp, err: StoreError) {
        lock(&self.failures).insert(op, err);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn impact(&self, table: &str, id: RowId) -> Option<ImpactColumns> {
        lock(&self.tables)
            .impacts
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned()
    }

    pub fn impact_count(&self, table: &str) -> usize {
        lock(&self.tables).impacts.get(table).map_or(0, BTreeMap::len)
    }

    pub fn detail_count(&self, table: &str) -> usize {
        lock(&self.tables).details.get(table).map_or(0, BTreeMap::len)
    }

    fn check(&self, op: StoreOp) -> StoreResult<()> {
        match lock(&self.failures).get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Datastore for MemoryStore {
    fn insert_impact(&self, table: &str, values: &ImpactColumns) -> StoreResult<RowId> {
        self.check(StoreOp::InsertImpact)?;
        let mut tables = lock(&self.tables);
        let id = tables.allocate(table);
        tables
            .impacts
            .entry(table.to_string())
            .or_default()
            .insert(id, values.clone());
        Ok(id)
    }

    fn update_impact(&self, table: &str, id: RowId, values: &ImpactColumns) -> StoreResult<usize> {
        self.check(StoreOp::UpdateImpact)?;
        let mut tables = lock(&self.tables);
        match tables.impacts.get_mut(table).and_then(|rows| rows.get_mut(&id)) {
            Some(row) => {
                row.extend(values.iter().map(|(k, v)| (k.clone(), *v)));
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_impact(&self, table: &str, id: RowId) -> StoreResult<usize> {
        self.check(StoreOp::DeleteImpact)?;
        let mut tables = lock(&self.tables);
        let removed = tables
            .impacts
            .get_mut(table)
            .and_then(|rows| rows.remove(&id));
        Ok(usize::from(removed.is_some()))
    }

    fn insert_detail(&self, table: &str, row: &NewDetail) -> StoreResult<EmissionDetailRow> {
        self.check(StoreOp::InsertDetail)?;
        let mut tables = lock(&self.tables);
        let id = tables.allocate(table);
        let stored = row.clone().into_row(id);
        tables
            .details
            .entry(table.to_string())
            .or_default()
            .insert(id, stored.clone());
        Ok(stored)
    }

    fn get_detail(&self, table: &str, id: RowId) -> StoreResult<Option<EmissionDetailRow>> {
        self.check(StoreOp::GetDetail)?;
        Ok(lock(&self.tables)
            .details
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn update_detail(
        &self,
        table: &str,
        id: RowId,
        patch: &DetailPatch,
    ) -> StoreResult<Vec<EmissionDetailRow>> {
        self.check(StoreOp::UpdateDetail)?;
        let mut tables = lock(&self.tables);
        match tables.details.get_mut(table).and_then(|rows| rows.get_mut(&id)) {
            Some(row) => {
                patch.apply(row);
                Ok(vec![row.clone()])
            }
            None => Ok(Vec::new()),
        }
    }

    fn delete_detail(&self, table: &str, id: RowId) -> StoreResult<Vec<EmissionDetailRow>> {
        self.check(StoreOp::DeleteDetail)?;
        let mut tables = lock(&self.tables);
        Ok(tables
            .details
            .get_mut(table)
            .and_then(|rows| rows.remove(&id))
            .into_iter()
            .collect())
    }

    fn list_details(
        &self,
        table: &str,
        filter: &DetailFilter,
    ) -> StoreResult<Vec<EmissionDetailRow>> {
        self.check(StoreOp::ListDetails)?;
        let tables = lock(&self.tables);
        let mut rows: Vec<_> = tables
            .details
            .get(table)
            .map(|rows| rows.values().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| b.input_time.cmp(&a.input_time));
        Ok(rows)
    }
}
