//! Shared application service layer for the GWP calculation service.
//!
//! This crate sits between the HTTP/CLI frontends and the engine and
//! datastore backends: it owns configuration, the calculation orchestrator,
//! the two-table persistence protocol, the emission query façade, and the
//! transport-agnostic request handlers used by the server.

pub mod api;
pub mod calc_service;
pub mod config;
pub mod error;
pub mod persist_service;
pub mod query;

// Re-export key types for convenience
pub use api::{Api, ApiResponse};
pub use calc_service::{Calculator, GWP_MARKER, ImpactResult};
pub use config::{AppConfig, DatastoreConfig};
pub use error::{AppError, AppResult};
pub use persist_service::{
    DbStatus, DeleteOutcome, Persistence, ROUTE_TAGS, Telemetry, TelemetryStub, UpdateOutcome,
    WriteStage,
};
pub use query::{TimeBound, build_filter, list_emissions, parse_time_bound};
