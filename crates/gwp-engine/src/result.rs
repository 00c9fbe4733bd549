//! Owned handle to an engine-side calculation result.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::schema::{CalculationSetup, ImpactValue, ResultPhase, ResultState};

/// A submitted calculation.
///
/// The engine keeps the result in memory until it is disposed. `dispose`
/// consumes the handle so a disposed result cannot be queried again; a handle
/// dropped without an explicit dispose (error paths) is disposed on drop.
pub struct CalculationResult<'e> {
    engine: &'e dyn Engine,
    state: ResultState,
    disposed: bool,
}

impl<'e> CalculationResult<'e> {
    /// Submit `setup` to the engine.
    pub fn submit(engine: &'e dyn Engine, setup: &CalculationSetup) -> EngineResult<Self> {
        let state = engine.calculate(setup)?;
        debug!(result_id = %state.id, "calculation submitted");
        Ok(Self {
            engine,
            state,
            disposed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    /// Last observed state.
    pub fn state(&self) -> &ResultState {
        &self.state
    }

    /// Block until the result is ready or failed, polling every `poll_interval`.
    ///
    /// There is no local deadline: a stalled engine stalls the caller.
    pub fn wait_until_ready(&mut self, poll_interval: Duration) -> EngineResult<()> {
        let mut polls = 0_u64;
        loop {
            match self.state.phase() {
                ResultPhase::Ready => {
                    debug!(result_id = %self.state.id, polls, "calculation ready");
                    return Ok(());
                }
                ResultPhase::Failed(message) => {
                    return Err(EngineError::CalculationFailed { message });
                }
                ResultPhase::Queued | ResultPhase::Running => {
                    if polls > 0 && !poll_interval.is_zero() {
                        thread::sleep(poll_interval);
                    }
                    polls += 1;
                    self.state = self.engine.state(&self.state.id)?;
                }
            }
        }
    }

    /// Per-category totals. Only valid once the result is ready.
    pub fn total_impacts(&self) -> EngineResult<Vec<ImpactValue>> {
        self.engine.total_impacts(&self.state.id)
    }

    /// Release the engine-side result.
    pub fn dispose(mut self) -> EngineResult<()> {
        self.disposed = true;
        self.engine.dispose(&self.state.id)
    }
}

impl Drop for CalculationResult<'_> {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        if let Err(err) = self.engine.dispose(&self.state.id) {
            warn!(result_id = %self.state.id, error = %err, "failed to dispose calculation result");
        }
    }
}
