//! Single-train delay insertion (STDCM): inserting one new train into an
//! already-scheduled network by finding unoccupied time windows.
//!
//! The forward search runs the generic [`pathfinding`](crate::pathfinding)
//! engine over a space-time graph of block traversals ([`graph`], [`edge`]),
//! accelerated by an admissible remaining-time heuristic precomputed
//! backward from the destination ([`heuristic`]). The coarse result is then
//! turned into a conflict-free, precisely simulated envelope by
//! [`post_processing`].

pub mod edge;
pub mod graph;
pub mod heuristic;
pub mod infra;
pub mod post_processing;
pub mod request;

pub use edge::{StdcmEdge, StdcmNode, TraversalId};
pub use graph::{SpaceTimeExpander, StdcmGraph};
pub use heuristic::make_stdcm_heuristics;
pub use infra::{BlockGraph, RunningTimeModel};
pub use post_processing::{FinalEnvelope, PostProcessingEvent, build_final_envelope};
pub use request::{BlockLocation, StdcmStep, TrainStop};
