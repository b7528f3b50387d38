//! Train path insertion engine.
//!
//! Computes feasible train paths through a rail network under time, speed and
//! occupancy constraints. The crate provides:
//!
//! - a generic best-path search over an abstract edge/node graph, with
//!   ordered multi-waypoint targets and dynamically blocked ranges
//!   ([`pathfinding`]),
//! - its specialization for single-train delay insertion (STDCM): a backward
//!   heuristic precomputation, a forward space-time search over
//!   infrastructure blocks, and a post-processing stage that turns the coarse
//!   path into a conflict-free simulated speed profile ([`stdcm`]).
//!
//! Infrastructure topology, train physics and occupancy data are external
//! collaborators, consumed through the traits in [`stdcm::infra`] and
//! [`sim`].

pub mod error;
pub mod model;
pub mod pathfinding;
pub mod prelude;
pub mod sim;
pub mod stdcm;

pub use crate::error::Error;
pub use crate::model::{EdgeLocation, EdgeRange, Graph, Range};
pub use crate::pathfinding::{Path, Pathfinder, PathfinderBuilder};

/// Distance along an edge or a path, in millimeters.
pub type Distance = i64;

/// Time, in seconds. Absolute times are relative to an arbitrary request
/// epoch (typically midnight of the service day).
pub type Time = f64;

/// Identifier of an infrastructure block (an atomic occupancy unit).
pub type BlockId = usize;

/// Identifier of a detector (a block boundary).
pub type DetectorId = usize;
