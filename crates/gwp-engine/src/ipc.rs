//! JSON-RPC 2.0 over HTTP backend (openLCA IPC server).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::schema::{
    CalculationSetup, EntityType, ImpactValue, ParameterRedef, Ref, ResultState, UnitGroup,
};

#[derive(Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Client for an openLCA IPC server.
///
/// One instance holds one HTTP connection pool. Only connecting is timed
/// out; a call waits as long as the engine takes to answer.
pub struct IpcClient {
    endpoint: String,
    http: reqwest::blocking::Client,
    next_id: AtomicU64,
}

impl IpcClient {
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> EngineResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            endpoint: format!("http://{host}:{port}"),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Raw call. `Ok(None)` when the engine returned a `null` result.
    fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> EngineResult<Option<R>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc call");

        let response: RpcResponse = self
            .http
            .post(&self.endpoint)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()?
            .error_for_status()?
            .json()?;

        if let Some(err) = response.error {
            return Err(EngineError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        match response.result {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    fn call_required<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> EngineResult<R> {
        self.call(method, params)?.ok_or_else(|| EngineError::Decode {
            message: format!("{method} returned no result"),
        })
    }
}

impl Engine for IpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn descriptors(&self, ty: EntityType) -> EngineResult<Vec<Ref>> {
        Ok(self
            .call("data/get/descriptors", json!({ "@type": ty.as_str() }))?
            .unwrap_or_default())
    }

    fn find_by_name(&self, ty: EntityType, name: &str) -> EngineResult<Option<Ref>> {
        self.call("data/get", json!({ "@type": ty.as_str(), "name": name }))
    }

    fn unit_group(&self, name: &str) -> EngineResult<Option<UnitGroup>> {
        self.call(
            "data/get",
            json!({ "@type": EntityType::UnitGroup.as_str(), "name": name }),
        )
    }

    fn parameters(&self, system: &Ref) -> EngineResult<Vec<ParameterRedef>> {
        Ok(self
            .call(
                "data/get/parameters",
                json!({ "@type": EntityType::ProductSystem.as_str(), "@id": system.id }),
            )?
            .unwrap_or_default())
    }

    fn calculate(&self, setup: &CalculationSetup) -> EngineResult<ResultState> {
        self.call_required("result/calculate", setup)
    }

    fn state(&self, result_id: &str) -> EngineResult<ResultState> {
        self.call_required("result/state", json!({ "@id": result_id }))
    }

    fn total_impacts(&self, result_id: &str) -> EngineResult<Vec<ImpactValue>> {
        Ok(self
            .call("result/total-impacts", json!({ "@id": result_id }))?
            .unwrap_or_default())
    }

    fn dispose(&self, result_id: &str) -> EngineResult<()> {
        self.call::<_, Value>("result/dispose", json!({ "@id": result_id }))?;
        Ok(())
    }
}
