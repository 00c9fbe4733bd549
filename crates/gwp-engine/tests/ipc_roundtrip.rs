//! IpcClient against a local JSON-RPC server speaking the openLCA IPC dialect.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use gwp_engine::{
    CalculationResult, CalculationSetup, Engine, EngineError, EntityType, IpcClient, RetryPolicy,
    connect,
};
use serde_json::{Value, json};
use tiny_http::{Header, Response, Server};

/// Start a fake engine; returns its port and the log of received methods.
fn spawn_engine() -> (u16, Arc<Mutex<Vec<String>>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let call: Value = serde_json::from_str(&body).unwrap();
            let method = call["method"].as_str().unwrap_or_default().to_string();
            seen.lock().unwrap().push(method.clone());

            let params = &call["params"];
            let reply = match method.as_str() {
                "data/get/descriptors" => json!({ "result": [
                    { "@type": "ImpactMethod", "@id": "m-1", "name": "IPCC 2021 AR6" }
                ]}),
                "data/get" => match params["name"].as_str() {
                    Some("廚餘處理量") => json!({ "result": {
                        "@type": "ProductSystem", "@id": "ps-1", "name": "廚餘處理量",
                        "processes": []
                    }}),
                    Some("Units of mass") => json!({ "result": {
                        "@type": "UnitGroup", "@id": "g-1", "name": "Units of mass",
                        "units": [
                            { "@id": "u-kg", "name": "kg", "conversionFactor": 1.0, "isRefUnit": true },
                            { "@id": "u-t", "name": "t", "conversionFactor": 1000.0 }
                        ]
                    }}),
                    _ => json!({ "result": null }),
                },
                "data/get/parameters" if params["@id"] == "missing" => json!({
                    "error": { "code": -32602, "message": "no product system with id missing" }
                }),
                "data/get/parameters" => json!({ "result": [
                    { "name": "factor", "value": 1.0, "context": { "@type": "Process", "@id": "p-1" } },
                    { "name": "distance", "value": 1.0 },
                    { "name": "load", "value": 1.0 }
                ]}),
                "result/calculate" => json!({ "result": { "@id": "r-1", "isReady": false, "isScheduled": true } }),
                "result/state" => json!({ "result": { "@id": "r-1", "isReady": true, "isScheduled": true } }),
                "result/total-impacts" => json!({ "result": [
                    { "impactCategory": { "@id": "c-1", "name": "Global Warming Potential (GWP)", "refUnit": "kg CO2-eq" }, "amount": 42.0 },
                    { "impactCategory": { "@id": "c-2", "name": "Acidification", "refUnit": "kg SO2-eq" }, "amount": 0.1 }
                ]}),
                "result/dispose" => json!({ "result": { "@id": "r-1" } }),
                other => json!({ "error": { "code": -32601, "message": format!("unknown method {other}") } }),
            };

            let mut envelope = reply;
            envelope["jsonrpc"] = json!("2.0");
            envelope["id"] = call["id"].clone();
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let _ = request.respond(Response::from_string(envelope.to_string()).with_header(header));
        }
    });

    (port, log)
}

fn client(port: u16) -> IpcClient {
    IpcClient::new("127.0.0.1", port, Duration::from_secs(1)).unwrap()
}

#[test]
fn connect_verifies_with_descriptor_listing() {
    let (port, log) = spawn_engine();
    let policy = RetryPolicy {
        attempts: 2,
        delay: Duration::from_millis(10),
    };
    let engine = connect("127.0.0.1", port, &policy, Duration::from_secs(1)).unwrap();
    assert_eq!(engine.endpoint(), format!("http://127.0.0.1:{port}"));
    assert_eq!(log.lock().unwrap().as_slice(), ["data/get/descriptors"]);
}

#[test]
fn full_calculation_over_the_wire() {
    let (port, log) = spawn_engine();
    let engine = client(port);

    let system = engine
        .find_by_name(EntityType::ProductSystem, "廚餘處理量")
        .unwrap()
        .unwrap();
    let method = engine
        .descriptors(EntityType::ImpactMethod)
        .unwrap()
        .remove(0);
    let params = engine.parameters(&system).unwrap();
    assert_eq!(params.len(), 3);
    assert_eq!(params[0].context.as_ref().map(|c| c.id.as_str()), Some("p-1"));

    let setup = CalculationSetup {
        target: system,
        amount: Some(10.0),
        unit: None,
        impact_method: Some(method),
        parameters: params,
    };
    let mut result = CalculationResult::submit(&engine, &setup).unwrap();
    result.wait_until_ready(Duration::ZERO).unwrap();
    let impacts = result.total_impacts().unwrap();
    result.dispose().unwrap();

    assert_eq!(impacts.len(), 2);
    assert_eq!(impacts[0].amount, 42.0);
    assert_eq!(
        log.lock().unwrap().last().map(String::as_str),
        Some("result/dispose")
    );
}

#[test]
fn null_result_means_not_found() {
    let (port, _log) = spawn_engine();
    let engine = client(port);
    let missing = engine
        .find_by_name(EntityType::ProductSystem, "does not exist")
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn unit_group_includes_units() {
    let (port, _log) = spawn_engine();
    let engine = client(port);
    let group = engine.unit_group("Units of mass").unwrap().unwrap();
    assert_eq!(group.unit("t").map(|u| u.id.as_str()), Some("u-t"));
}

#[test]
fn rpc_error_objects_surface_verbatim() {
    let (port, _log) = spawn_engine();
    let engine = client(port);
    let missing = gwp_engine::Ref::new(EntityType::ProductSystem, "missing", "ghost");
    let err = engine.parameters(&missing).unwrap_err();
    assert_eq!(
        err,
        EngineError::Rpc {
            code: -32602,
            message: "no product system with id missing".into()
        }
    );
}
