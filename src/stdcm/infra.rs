use crate::{BlockId, DetectorId, Distance, Time};

/// Read-only topology queries on the infrastructure, consumed by the
/// heuristic precomputation. The block graph itself is built elsewhere.
pub trait BlockGraph {
    /// Length of a block, in millimeters.
    fn block_length(&self, block: BlockId) -> Distance;

    /// The detector at the entry of a block.
    fn block_entry(&self, block: BlockId) -> DetectorId;

    /// All blocks whose exit is the given detector, i.e. the blocks that can
    /// physically precede a block entered there.
    fn blocks_ending_at(&self, detector: DetectorId) -> Vec<BlockId>;
}

/// Optimistic running-time model for one rolling stock: traversal time at
/// maximum running speed, ignoring acceleration and deceleration. Being a
/// lower bound on any physical simulation is what keeps the A* heuristic
/// admissible.
pub trait RunningTimeModel {
    /// Time to traverse `block` from its start to `end_offset` (the whole
    /// block when `None`).
    fn block_time(&self, block: BlockId, end_offset: Option<Distance>) -> Time;
}
