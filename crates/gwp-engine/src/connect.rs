//! Startup connection manager.
//!
//! The engine starts slowly and may accept TCP connections before it serves
//! requests, so every attempt ends with a verification call.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::ipc::IpcClient;
use crate::schema::EntityType;

/// Bounded fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            delay: Duration::from_secs_f64(2.0),
        }
    }
}

impl RetryPolicy {
    /// Total sleep time when every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        self.delay * self.attempts.saturating_sub(1)
    }
}

/// Confirm the engine is serving by listing impact methods.
pub fn verify(engine: &dyn Engine) -> EngineResult<usize> {
    engine
        .descriptors(EntityType::ImpactMethod)
        .map(|methods| methods.len())
}

/// Open and verify an engine session, retrying per `policy`.
///
/// `open` is called once per attempt with the 1-based attempt number;
/// `sleep` is called between failed attempts (never after the last one).
pub fn connect_with<E, O, S>(policy: &RetryPolicy, mut open: O, mut sleep: S) -> EngineResult<E>
where
    E: Engine,
    O: FnMut(u32) -> EngineResult<E>,
    S: FnMut(Duration),
{
    let attempts = policy.attempts.max(1);
    let mut last = EngineError::Transport {
        message: "no connection attempt made".to_string(),
    };

    for attempt in 1..=attempts {
        let outcome = open(attempt).and_then(|engine| {
            let methods = verify(&engine)?;
            Ok((engine, methods))
        });

        match outcome {
            Ok((engine, methods)) => {
                info!(
                    endpoint = engine.endpoint(),
                    attempt, methods, "connected to calculation engine"
                );
                return Ok(engine);
            }
            Err(err) => {
                warn!(attempt, attempts, error = %err, "engine connection attempt failed");
                last = err;
                if attempt < attempts {
                    sleep(policy.delay);
                }
            }
        }
    }

    Err(EngineError::ConnectExhausted {
        attempts,
        last: Box::new(last),
    })
}

/// Connect to an openLCA IPC server at `host:port`.
///
/// Blocks the calling thread for up to `policy.worst_case_wait()` plus the
/// time spent in the attempts themselves.
pub fn connect(
    host: &str,
    port: u16,
    policy: &RetryPolicy,
    connect_timeout: Duration,
) -> EngineResult<IpcClient> {
    info!(host, port, attempts = policy.attempts, "connecting to calculation engine");
    connect_with(
        policy,
        |_| IpcClient::new(host, port, connect_timeout),
        thread::sleep,
    )
}
