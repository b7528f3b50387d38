use std::time::Duration;

use thiserror::Error;

use crate::sim::SimulationError;

#[derive(Error, Debug)]
pub enum Error {
    /// The search exceeded its wall-clock budget. Retryable by the caller
    /// with relaxed bounds; the engine does not retry on its own.
    #[error("pathfinding timed out after {0:?}")]
    PathfindingTimeout(Duration),
    /// Programmer error in the pathfinder configuration, reported before the
    /// search starts.
    #[error("invalid pathfinding configuration: {0}")]
    InvalidConfiguration(&'static str),
    /// No conflict-free trajectory exists for the requested departure and
    /// allowance, even after falling back to the linear distribution.
    #[error("no conflict-free schedule found for the requested departure and allowance")]
    SchedulingInfeasible,
    /// Simulation collaborator failure other than an allowance convergence
    /// error (those trigger the linear fallback instead).
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
