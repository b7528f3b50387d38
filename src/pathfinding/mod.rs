//! Generic best-path search over an abstract edge/node graph.
//!
//! The search works on maximal unobstructed sub-ranges of edges, supports an
//! ordered sequence of waypoint groups, dynamically blocked ranges, and an
//! optional A* remaining-cost estimator per waypoint group. Dijkstra is the
//! degenerate case with no estimators.

pub mod config;
pub mod search;

pub use config::{
    AStarHeuristic, BlockedRangesOnEdge, CostModel, EdgeToLength, PathfinderBuilder,
    TargetsOnEdge,
};
pub use search::{Path, Pathfinder};
