//! Stage trait definition

use async_trait::async_trait;

use super::value_objects::{StageContext, StageError, StageName};
use crate::domain::scan::ScanState;

/// Trait every pipeline stage implements
///
/// A stage consumes the scan state, does its unit of work, and returns the
/// (possibly extended) state. The engine owns sequencing, timeouts, error
/// routing, and cancellation; stages stay oblivious to all of it apart from
/// the signals in [`StageContext`].
///
/// Stages must be side-effect free with respect to the job registry: the
/// returned state is the only channel back to the engine.
#[async_trait]
pub trait Stage: Send + Sync {
    /// The stage's identifier in the transition table
    fn name(&self) -> StageName;

    /// Execute the stage
    ///
    /// # Arguments
    /// * `state` - Scan state as left by the predecessor stage
    /// * `ctx` - Cancellation signal and per-stage timeout
    ///
    /// # Returns
    /// * `Ok(ScanState)` - Updated state handed to the next stage
    /// * `Err(StageError)` - Failure; the engine reroutes to the error-handling stage
    async fn execute(&self, state: ScanState, ctx: &StageContext)
    -> Result<ScanState, StageError>;
}
