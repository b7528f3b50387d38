//! Data model shared by the search algorithms: the abstract graph contract
//! and the location/range value types the pathfinder works with.

pub mod graph;
pub mod location;

pub use graph::Graph;
pub use location::{EdgeLocation, EdgeRange, Range};
