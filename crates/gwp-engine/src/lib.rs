//! gwp-engine: access to the remote life-cycle-assessment engine.
//!
//! Provides:
//! - openLCA schema types used on the wire (refs, parameter redefinitions,
//!   calculation setups, result states, impact values)
//! - the `Engine` trait that isolates the rest of the service from the transport
//! - `IpcClient`, a JSON-RPC 2.0 over HTTP backend
//! - the startup connection manager with bounded fixed-delay retries
//! - `CalculationResult`, an owned handle to an engine-side result
//! - `StubEngine`, an in-process engine for tests (`testing` feature)
//!
//! # Architecture
//!
//! Everything above this crate talks to `dyn Engine`. The IPC client is the
//! production backend; the stub implements the same state machine
//! (queued → running → ready | failed) without a network.

pub mod connect;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod result;
pub mod schema;
#[cfg(any(test, feature = "testing"))]
pub mod stub;

pub use connect::{RetryPolicy, connect, connect_with, verify};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use ipc::IpcClient;
pub use result::CalculationResult;
pub use schema::{
    CalculationSetup, EntityType, ImpactValue, ParameterRedef, Ref, ResultPhase, ResultState,
    Unit, UnitGroup,
};
#[cfg(any(test, feature = "testing"))]
pub use stub::{StubCallCounts, StubEngine};
