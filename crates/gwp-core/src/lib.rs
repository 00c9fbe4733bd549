//! gwp-core: stable foundation for the GWP calculation service.
//!
//! Contains:
//! - numeric (Real + finiteness checks for caller inputs)
//! - ids (datastore row identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
