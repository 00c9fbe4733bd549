//! Datastore access trait.

use gwp_core::RowId;

use crate::StoreResult;
use crate::types::{DetailFilter, DetailPatch, EmissionDetailRow, ImpactColumns, NewDetail};

/// Row-level operations the persistence layer needs.
///
/// Each call is one independent request; there are no transactions across
/// calls. Mutating calls report what they touched so callers can tell an
/// absent (or hidden) row from a successful write.
pub trait Datastore: Send + Sync {
    /// Insert a parent row and return its generated id.
    fn insert_impact(&self, table: &str, values: &ImpactColumns) -> StoreResult<RowId>;

    /// Overwrite the impact columns of a parent row; returns affected rows.
    fn update_impact(&self, table: &str, id: RowId, values: &ImpactColumns) -> StoreResult<usize>;

    /// Delete a parent row; returns affected rows.
    fn delete_impact(&self, table: &str, id: RowId) -> StoreResult<usize>;

    fn insert_detail(&self, table: &str, row: &NewDetail) -> StoreResult<EmissionDetailRow>;

    fn get_detail(&self, table: &str, id: RowId) -> StoreResult<Option<EmissionDetailRow>>;

    /// Overwrite editable columns; returns the updated rows.
    fn update_detail(
        &self,
        table: &str,
        id: RowId,
        patch: &DetailPatch,
    ) -> StoreResult<Vec<EmissionDetailRow>>;

    /// Delete a child row; returns the deleted rows.
    fn delete_detail(&self, table: &str, id: RowId) -> StoreResult<Vec<EmissionDetailRow>>;

    fn list_details(
        &self,
        table: &str,
        filter: &DetailFilter,
    ) -> StoreResult<Vec<EmissionDetailRow>>;
}
