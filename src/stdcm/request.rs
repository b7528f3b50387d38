use serde::{Deserialize, Serialize};

use crate::{BlockId, Distance, Time};

/// A point on an infrastructure block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLocation {
    pub block: BlockId,
    /// Offset from the block start, in millimeters.
    pub offset: Distance,
}

impl BlockLocation {
    pub fn new(block: BlockId, offset: Distance) -> Self {
        Self { block, offset }
    }
}

/// One stage of the requested route: a waypoint group, satisfied once any of
/// its locations is reached. The last step is the destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StdcmStep {
    pub locations: Vec<BlockLocation>,
    /// Scheduled stop duration, in seconds. Only meaningful when `stop` is
    /// set.
    pub duration: Option<Time>,
    pub stop: bool,
}

impl StdcmStep {
    /// A waypoint the train passes through without stopping.
    pub fn passage(locations: Vec<BlockLocation>) -> Self {
        Self {
            locations,
            duration: None,
            stop: false,
        }
    }

    /// A scheduled stop of the given duration.
    pub fn stop(locations: Vec<BlockLocation>, duration: Time) -> Self {
        Self {
            locations,
            duration: Some(duration),
            stop: true,
        }
    }
}

/// A stop on the final travelled path, as fed to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainStop {
    /// Position on the travelled path, in meters.
    pub position: f64,
    /// Stop duration, in seconds.
    pub duration: Time,
}
