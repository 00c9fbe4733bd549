//! Transport-agnostic request handlers.
//!
//! The server hands each request over as method, request target and raw
//! body and writes back the returned status and JSON body; CORS headers are
//! the server's concern.

use std::fmt::Display;
use std::str::FromStr;

use gwp_core::RowId;
use gwp_model::{CalcInputs, ModelVariant};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::calc_service::Calculator;
use crate::error::AppError;
use crate::persist_service::{DeleteOutcome, Persistence, UpdateOutcome};
use crate::query::{build_filter, list_emissions};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Value::Null` means no body.
    pub body: Value,
}

impl ApiResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn no_content() -> Self {
        Self::json(204, Value::Null)
    }

    pub fn error(status: u16, message: impl Display) -> Self {
        Self::json(
            status,
            json!({ "status": "error", "message": message.to_string() }),
        )
    }

    /// 400 for caller mistakes, 500 otherwise; datastore detail is attached.
    pub fn from_error(err: &AppError) -> Self {
        let status = if err.is_client_error() { 400 } else { 500 };
        let mut response = Self::error(status, err);
        if let (Some(detail), Some(body)) = (err.detail(), response.body.as_object_mut()) {
            body.insert("detail".to_string(), detail.clone());
        }
        response
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn json_object(body: &[u8]) -> Result<Map<String, Value>, ApiResponse> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(ApiResponse::error(400, "Request body must be a JSON object")),
    }
}

/// Scalar inputs of `variant`; non-numeric values count as missing.
fn read_inputs(variant: ModelVariant, body: &Map<String, Value>) -> Result<CalcInputs, ApiResponse> {
    let number = |key: &str| body.get(key).and_then(Value::as_f64);
    let missing: Vec<&str> = variant
        .binding()
        .inputs
        .iter()
        .map(|role| role.key())
        .chain(["amount"])
        .filter(|key| number(key).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(ApiResponse::error(
            400,
            format!("Missing or non-numeric parameters: {}", missing.join(", ")),
        ));
    }

    let value = |key: &str| number(key).unwrap_or_default();
    let inputs = CalcInputs::new(value("distance"), value("factor"), value("load"), value("amount"));
    Ok(match variant {
        ModelVariant::Mass => inputs,
        ModelVariant::Fuel => inputs.with_oil_use(value("oilUse")),
    })
}

type Params = [(String, String)];

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `?model=oil` selects the fuel table; the mass table is the default.
fn variant_param(params: &Params) -> Result<ModelVariant, ApiResponse> {
    match param(params, "model").filter(|m| !m.is_empty()) {
        None => Ok(ModelVariant::Mass),
        Some(key) => ModelVariant::from_key(key)
            .map_err(|err| ApiResponse::from_error(&AppError::from(err))),
    }
}

fn row_id(raw: &str) -> Result<RowId, ApiResponse> {
    RowId::from_str(raw).map_err(|err| ApiResponse::from_error(&AppError::from(err)))
}

/// Request handlers over one calculator and one persistence coordinator.
pub struct Api {
    calculator: Calculator,
    persistence: Persistence,
}

impl Api {
    pub fn new(calculator: Calculator, persistence: Persistence) -> Self {
        Self {
            calculator,
            persistence,
        }
    }

    pub fn calculator(&self) -> &Calculator {
        &self.calculator
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Dispatch one request. `target` is the path plus optional query string.
    pub fn handle(&self, method: &str, target: &str, body: &[u8]) -> ApiResponse {
        let method = method.to_ascii_uppercase();
        if method == "OPTIONS" {
            return ApiResponse::no_content();
        }

        let Ok(url) = Url::parse("http://localhost/").and_then(|base| base.join(target)) else {
            return ApiResponse::error(400, format!("Malformed request target {target:?}"));
        };
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();
        debug!(%method, path = url.path(), "request");

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["calculate", route]) => match ModelVariant::from_route(route) {
                Some(variant) => self.calculate(variant, body),
                None => ApiResponse::error(404, format!("Unknown model route {route}")),
            },
            ("GET", ["api", "emissions"]) => self.list_emissions(&params),
            ("PUT", ["api", "emissions", id]) => self.update_emission(id, &params, body),
            ("DELETE", ["api", "emissions", id]) => self.delete_emission(id, &params),
            (_, ["calculate", _] | ["api", "emissions"] | ["api", "emissions", _]) => {
                ApiResponse::error(405, format!("Method {method} not allowed"))
            }
            _ => ApiResponse::error(404, format!("No route for {}", url.path())),
        }
    }

    /// `POST /calculate/<route>`
    pub fn calculate(&self, variant: ModelVariant, body: &[u8]) -> ApiResponse {
        let inputs = match json_object(body).and_then(|body| read_inputs(variant, &body)) {
            Ok(inputs) => inputs,
            Err(response) => return response,
        };

        let impacts = match self.calculator.compute(variant, &inputs) {
            Ok(impacts) => impacts,
            Err(err) => {
                warn!(model = variant.system_name(), error = %err, "calculation failed");
                return ApiResponse::from_error(&err);
            }
        };
        let db_status = self.persistence.create(&inputs, &impacts, variant);

        ApiResponse::ok(json!({
            "status": "ok",
            "inputs": to_json(&inputs),
            "impacts": to_json(&impacts),
            "db_status": to_json(&db_status),
        }))
    }

    /// `GET /api/emissions?start=&end=&location=&model=`
    pub fn list_emissions(&self, params: &Params) -> ApiResponse {
        let variant = match variant_param(params) {
            Ok(variant) => variant,
            Err(response) => return response,
        };
        let filter = match build_filter(
            param(params, "start"),
            param(params, "end"),
            param(params, "location"),
        ) {
            Ok(filter) => filter,
            Err(err) => return ApiResponse::from_error(&err),
        };

        match list_emissions(&self.persistence, variant, &filter) {
            Ok(rows) => ApiResponse::ok(to_json(&rows)),
            Err(err) => {
                warn!(error = %err, "listing emissions failed");
                ApiResponse::from_error(&err)
            }
        }
    }

    /// `PUT /api/emissions/<id>`
    pub fn update_emission(&self, id: &str, params: &Params, body: &[u8]) -> ApiResponse {
        let (id, variant, body) = match (row_id(id), variant_param(params), json_object(body)) {
            (Ok(id), Ok(variant), Ok(body)) => (id, variant, body),
            (Err(response), _, _) | (_, Err(response), _) | (_, _, Err(response)) => {
                return response;
            }
        };
        let inputs = match read_inputs(variant, &body) {
            Ok(inputs) => inputs,
            Err(response) => return response,
        };
        let location = match body.get("location") {
            None | Some(Value::Null) => None,
            Some(Value::String(location)) => Some(location.clone()),
            Some(_) => return ApiResponse::error(400, "location must be a string"),
        };

        match self
            .persistence
            .update(&self.calculator, id, variant, &inputs, location)
        {
            Ok(UpdateOutcome::Updated { row, impacts }) => ApiResponse::ok(json!({
                "status": "ok",
                "data": to_json(&row),
                "impacts": to_json(&impacts),
            })),
            Ok(UpdateOutcome::NotFound) => {
                ApiResponse::error(404, AppError::RecordNotFound(id))
            }
            Err(err) => {
                warn!(%id, error = %err, "update failed");
                ApiResponse::from_error(&err)
            }
        }
    }

    /// `DELETE /api/emissions/<id>`
    pub fn delete_emission(&self, id: &str, params: &Params) -> ApiResponse {
        let (id, variant) = match (row_id(id), variant_param(params)) {
            (Ok(id), Ok(variant)) => (id, variant),
            (Err(response), _) | (_, Err(response)) => return response,
        };

        match self.persistence.delete(id, variant) {
            Ok(DeleteOutcome::Deleted(row)) => ApiResponse::ok(json!({
                "status": "ok",
                "message": format!("Deleted emission record {id}"),
                "data": to_json(&row),
            })),
            Ok(DeleteOutcome::NotFound) => ApiResponse::error(
                400,
                format!("No row deleted: record {id} does not exist or is not permitted"),
            ),
            Err(err @ AppError::Store(gwp_store::StoreError::Denied { .. })) => {
                let mut response = ApiResponse::from_error(&err);
                response.status = 403;
                response
            }
            Err(err) => {
                warn!(%id, error = %err, "delete failed");
                ApiResponse::from_error(&err)
            }
        }
    }
}
