//! Contracts of the simulation collaborators.
//!
//! The engine never integrates train physics itself: envelopes are produced
//! and stretched by an external simulator, and occupancy conflicts are
//! reported by an external oracle. These traits are the whole surface the
//! post-processing stage needs from them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stdcm::edge::StdcmEdge;
use crate::stdcm::request::TrainStop;
use crate::{Distance, Time};

/// A simulated speed/time profile over a path.
pub trait EnvelopeProfile: Clone {
    /// Path length covered by the envelope, in meters.
    fn end_pos(&self) -> f64;

    /// Total travel time over the envelope, stop durations excluded.
    fn total_time(&self) -> Time;

    /// Travel time from the envelope start to the given position. Positions
    /// outside the envelope clamp to its bounds.
    fn time_at(&self, position: f64) -> Time;
}

/// Margin distribution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowanceDistribution {
    /// Physically informed distribution, the default.
    Mareco,
    /// Uniform distribution, used as fallback.
    Linear,
}

/// One allowance range: the simulator must stretch the envelope so that the
/// `[begin_pos, end_pos]` segment takes `added_time` longer. Positions in
/// meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceRange {
    pub begin_pos: f64,
    pub end_pos: f64,
    pub added_time: Time,
}

/// Requested standard allowance (schedule slack added on top of the fastest
/// run).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardAllowance {
    /// Extra time as a percentage of the base running time.
    Percentage(f64),
    /// Extra time per travelled distance, in seconds per 100 km.
    TimePer100Km(Time),
    /// Fixed extra time, in seconds.
    FixedTime(Time),
}

impl StandardAllowance {
    /// Extra time this allowance adds to a run of `base_time` seconds over
    /// `distance` meters.
    pub fn allowance_time(&self, base_time: Time, distance: f64) -> Time {
        match self {
            Self::Percentage(percentage) => base_time * percentage / 100.0,
            Self::TimePer100Km(seconds) => seconds * distance / 100_000.0,
            Self::FixedTime(seconds) => *seconds,
        }
    }
}

#[derive(Error, Debug)]
pub enum SimulationError {
    /// The requested margin cannot be met without infeasible (negative or
    /// unbounded) speeds. Triggers the linear-distribution fallback.
    #[error("allowance distribution did not converge")]
    AllowanceConvergence,
    #[error("simulation failed: {0}")]
    Other(String),
}

/// Applies allowance ranges to an envelope, i.e. the `MARECO`/linear margin
/// distribution black box.
pub trait AllowanceSimulator<Env: EnvelopeProfile> {
    fn apply(
        &self,
        envelope: &Env,
        distribution: AllowanceDistribution,
        ranges: &[AllowanceRange],
    ) -> Result<Env, SimulationError>;
}

/// Occupancy oracle verdict for a candidate trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable {
        /// Travelled-path offset of the first conflict, in millimeters.
        first_conflict_offset: Distance,
    },
}

/// Occupancy oracle: checks a fully simulated trajectory (envelope + stops
/// overlaid on the given edge chain) against the scheduled traffic.
pub trait BlockAvailability<Env: EnvelopeProfile> {
    fn check_availability(
        &self,
        edges: &[StdcmEdge],
        envelope: &Env,
        stops: &[TrainStop],
        start_offset: Distance,
        end_offset: Distance,
        departure_time: Time,
    ) -> Availability;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_time_per_kind() {
        let base_time = 1000.0;
        let distance = 50_000.0; // 50 km
        assert_eq!(
            StandardAllowance::Percentage(5.0).allowance_time(base_time, distance),
            50.0
        );
        assert_eq!(
            StandardAllowance::TimePer100Km(270.0).allowance_time(base_time, distance),
            135.0
        );
        assert_eq!(
            StandardAllowance::FixedTime(42.0).allowance_time(base_time, distance),
            42.0
        );
    }
}
