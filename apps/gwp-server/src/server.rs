//! HTTP front end: a pool of worker threads pulling requests off one listener.

use std::io::Read;
use std::sync::Arc;
use std::thread;

use gwp_app::{Api, AppError, AppResult};
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, error, info, warn};

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

pub fn bind(addr: &str) -> AppResult<Server> {
    Server::http(addr).map_err(|e| AppError::Config {
        key: "GWP_BIND_ADDR",
        message: format!("cannot listen on {addr}: {e}"),
    })
}

/// Serve until the listener shuts down.
pub fn serve(server: Arc<Server>, api: Arc<Api>, workers: usize) {
    let workers = workers.max(1);
    info!(addr = ?server.server_addr(), workers, "listening");

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let server = Arc::clone(&server);
            let api = Arc::clone(&api);
            thread::spawn(move || {
                loop {
                    match server.recv() {
                        Ok(request) => handle(&api, request),
                        Err(err) => {
                            error!(worker, error = %err, "listener failed");
                            break;
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
    }
}

fn handle(api: &Api, mut request: Request) {
    let method = request.method().as_str().to_string();
    let target = request.url().to_string();

    let mut body = Vec::new();
    let response = match request.as_reader().read_to_end(&mut body) {
        Ok(_) => api.handle(&method, &target, &body),
        Err(err) => gwp_app::ApiResponse::error(400, format!("Unreadable request body: {err}")),
    };
    debug!(%method, %target, status = response.status, "handled");

    let payload = if response.body.is_null() {
        String::new()
    } else {
        response.body.to_string()
    };
    let mut reply = Response::from_string(payload).with_status_code(response.status);
    if !response.body.is_null() {
        add_header(&mut reply, "Content-Type", "application/json");
    }
    for (name, value) in CORS_HEADERS {
        add_header(&mut reply, name, value);
    }

    if let Err(err) = request.respond(reply) {
        warn!(%method, %target, error = %err, "failed to write response");
    }
}

fn add_header<R: Read>(reply: &mut Response<R>, name: &str, value: &str) {
    if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        reply.add_header(header);
    }
}
