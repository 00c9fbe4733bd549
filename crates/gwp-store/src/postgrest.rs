//! PostgREST (Supabase) backend.

use std::time::Duration;

use gwp_core::RowId;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::store::Datastore;
use crate::types::{DetailFilter, DetailPatch, EmissionDetailRow, ImpactColumns, NewDetail};
use crate::{StoreError, StoreResult};

/// Postgres error code for insufficient privilege.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Clone)]
pub struct PostgrestStore {
    base_url: String,
    key: String,
    http: Client,
}

impl PostgrestStore {
    /// `url` is the project URL (without `/rest/v1`); `key` is sent as both
    /// `apikey` and bearer token.
    pub fn new(url: &str, key: &str, timeout: Duration) -> StoreResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "return=representation")
    }

    fn id_filter(id: RowId) -> [(&'static str, String); 1] {
        [("id", format!("eq.{id}"))]
    }

    fn send<T: DeserializeOwned>(builder: RequestBuilder) -> StoreResult<T> {
        let response = builder.send()?;
        let response = Self::check(response)?;
        Ok(response.json()?)
    }

    fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let detail: Option<Value> = serde_json::from_str(&body).ok();
        let message = detail
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.clone());
        let code = detail
            .as_ref()
            .and_then(|d| d.get("code"))
            .and_then(Value::as_str);

        if status.as_u16() == 401 || status.as_u16() == 403 || code == Some(INSUFFICIENT_PRIVILEGE)
        {
            Err(StoreError::Denied { message, detail })
        } else {
            Err(StoreError::Http {
                status: status.as_u16(),
                message,
                detail,
            })
        }
    }

    fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        debug!(table, "insert");
        Self::send(self.authorized(self.http.post(self.table_url(table))).json(body))
    }

    fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        id: RowId,
        body: &B,
    ) -> StoreResult<Vec<T>> {
        debug!(table, %id, "update");
        Self::send(
            self.authorized(self.http.patch(self.table_url(table)))
                .query(&Self::id_filter(id))
                .json(body),
        )
    }

    fn delete<T: DeserializeOwned>(&self, table: &str, id: RowId) -> StoreResult<Vec<T>> {
        debug!(table, %id, "delete");
        Self::send(
            self.authorized(self.http.delete(self.table_url(table)))
                .query(&Self::id_filter(id)),
        )
    }
}

/// Query parameters for a detail listing.
fn filter_query(filter: &DetailFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("select", "*".to_string())];
    if let Some(start) = filter.start {
        query.push(("input_time", format!("gte.{}", start.to_rfc3339())));
    }
    if let Some(end) = filter.end {
        query.push(("input_time", format!("lte.{}", end.to_rfc3339())));
    }
    if let Some(location) = &filter.location {
        query.push(("location", format!("eq.{location}")));
    }
    query.push(("order", "input_time.desc".to_string()));
    query
}

impl Datastore for PostgrestStore {
    fn insert_impact(&self, table: &str, values: &ImpactColumns) -> StoreResult<RowId> {
        let rows: Vec<Value> = self.insert(table, values)?;
        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .map(RowId::new)
            .ok_or_else(|| StoreError::MissingId {
                table: table.to_string(),
            })
    }

    fn update_impact(&self, table: &str, id: RowId, values: &ImpactColumns) -> StoreResult<usize> {
        let rows: Vec<Value> = self.patch(table, id, values)?;
        Ok(rows.len())
    }

    fn delete_impact(&self, table: &str, id: RowId) -> StoreResult<usize> {
        let rows: Vec<Value> = self.delete(table, id)?;
        Ok(rows.len())
    }

    fn insert_detail(&self, table: &str, row: &NewDetail) -> StoreResult<EmissionDetailRow> {
        let rows: Vec<EmissionDetailRow> = self.insert(table, row)?;
        rows.into_iter().next().ok_or_else(|| StoreError::MissingId {
            table: table.to_string(),
        })
    }

    fn get_detail(&self, table: &str, id: RowId) -> StoreResult<Option<EmissionDetailRow>> {
        let rows: Vec<EmissionDetailRow> = Self::send(
            self.authorized(self.http.get(self.table_url(table)))
                .query(&[("select", "*".to_string())])
                .query(&Self::id_filter(id)),
        )?;
        Ok(rows.into_iter().next())
    }

    fn update_detail(
        &self,
        table: &str,
        id: RowId,
        patch: &DetailPatch,
    ) -> StoreResult<Vec<EmissionDetailRow>> {
        self.patch(table, id, patch)
    }

    fn delete_detail(&self, table: &str, id: RowId) -> StoreResult<Vec<EmissionDetailRow>> {
        self.delete(table, id)
    }

    fn list_details(
        &self,
        table: &str,
        filter: &DetailFilter,
    ) -> StoreResult<Vec<EmissionDetailRow>> {
        Self::send(
            self.authorized(self.http.get(self.table_url(table)))
                .query(&filter_query(filter)),
        )
    }
}
