//! A* heuristic of the STDCM forward search.
//!
//! Starting at the destination and going backward in every direction, we
//! cache for each block the minimum time it would take to reach the
//! destination, accounting for the number of waypoint groups already
//! reached. The remaining time is estimated with the optimistic
//! maximum-running-speed profile, ignoring accelerations and decelerations;
//! because it never overestimates, the forward search still finds the
//! fastest solution.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use hashbrown::HashMap;
use ordered_float::OrderedFloat;

use crate::pathfinding::AStarHeuristic;
use crate::stdcm::edge::StdcmEdge;
use crate::stdcm::infra::{BlockGraph, RunningTimeModel};
use crate::stdcm::request::StdcmStep;
use crate::{BlockId, Distance, Time};

/// A block waiting to be cached: reached going backward, with the remaining
/// time at its start.
struct PendingBlock {
    block: BlockId,
    /// Number of waypoint groups still ahead of the block (going forward).
    step_index: usize,
    remaining_time_at_block_start: Time,
}

impl PartialEq for PendingBlock {
    fn eq(&self, other: &Self) -> bool {
        self.remaining_time_at_block_start == other.remaining_time_at_block_start
    }
}

impl Eq for PendingBlock {}

impl Ord for PendingBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by remaining time (reversed from standard Rust
        // BinaryHeap).
        OrderedFloat(other.remaining_time_at_block_start)
            .cmp(&OrderedFloat(self.remaining_time_at_block_start))
    }
}

impl PartialOrd for PendingBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs the backward precomputation and returns one estimator per waypoint
/// group count, mapping (edge, offset) to an admissible lower bound on the
/// remaining time, scaled to the referential of the STDCM cost function.
/// Edges with no cached entry in any reachable bucket cannot reach the
/// destination within bounds and estimate to +infinity.
pub fn make_stdcm_heuristics<I, M>(
    infra: Arc<I>,
    model: Arc<M>,
    steps: &[StdcmStep],
    max_running_time: Time,
    max_departure_delay: Time,
) -> Vec<AStarHeuristic<'static, StdcmEdge>>
where
    I: BlockGraph + 'static,
    M: RunningTimeModel + 'static,
{
    if steps.len() < 2 {
        return Vec::new();
    }
    // One map per number of reached waypoint groups.
    let mut maps: Vec<HashMap<BlockId, Time>> = vec![HashMap::new(); steps.len() - 1];

    // Backward Dijkstra from the destination locations.
    let mut pending = init_first_blocks(infra.as_ref(), model.as_ref(), steps);
    while let Some(block) = pending.pop() {
        let index = block.step_index.saturating_sub(1);
        if maps[index].contains_key(&block.block) {
            continue;
        }
        maps[index].insert(block.block, block.remaining_time_at_block_start);
        if block.step_index > 0 {
            for predecessor in predecessors(infra.as_ref(), model.as_ref(), steps, max_running_time, &block)
            {
                pending.push(predecessor);
            }
        }
    }

    let maps = Arc::new(maps);
    let mut res: Vec<AStarHeuristic<'static, StdcmEdge>> = Vec::new();
    for n_passed in 0..maps.len() {
        let maps = Arc::clone(&maps);
        let model = Arc::clone(&model);
        res.push(Box::new(move |edge: &StdcmEdge, offset: Distance| {
            // Walk the previous buckets too, most recent first, to handle
            // several waypoint groups sitting on the same block.
            for i in (0..=n_passed).rev() {
                let Some(&cached) = maps[i].get(&edge.block) else {
                    continue;
                };
                let block_offset = edge.envelope_start_offset + offset;
                let remaining =
                    cached - block_time(model.as_ref(), edge.block, Some(block_offset));
                // Same referential as the STDCM cost function, which weights
                // running time by the maximum departure delay.
                return remaining * max_departure_delay;
            }
            f64::INFINITY
        }));
    }
    res
}

/// Pending blocks that can lead to the given one, pruned once the remaining
/// time exceeds the maximum running time.
fn predecessors<I: BlockGraph, M: RunningTimeModel>(
    infra: &I,
    model: &M,
    steps: &[StdcmStep],
    max_running_time: Time,
    pending: &PendingBlock,
) -> Vec<PendingBlock> {
    if pending.remaining_time_at_block_start > max_running_time {
        return Vec::new();
    }
    let detector = infra.block_entry(pending.block);
    infra
        .blocks_ending_at(detector)
        .into_iter()
        .map(|block| {
            make_pending_block(
                infra,
                model,
                block,
                None,
                steps,
                pending.step_index,
                pending.remaining_time_at_block_start,
            )
        })
        .collect()
}

/// Seeds the queue with the blocks containing the destination locations.
fn init_first_blocks<I: BlockGraph, M: RunningTimeModel>(
    infra: &I,
    model: &M,
    steps: &[StdcmStep],
) -> BinaryHeap<PendingBlock> {
    let mut res = BinaryHeap::new();
    let step_count = steps.len();
    for waypoint in &steps[step_count - 1].locations {
        res.push(make_pending_block(
            infra,
            model,
            waypoint.block,
            Some(waypoint.offset),
            steps,
            step_count - 1,
            0.0,
        ));
    }
    res
}

fn make_pending_block<I: BlockGraph, M: RunningTimeModel>(
    infra: &I,
    model: &M,
    block: BlockId,
    offset: Option<Distance>,
    steps: &[StdcmStep],
    current_index: usize,
    remaining_time: Time,
) -> PendingBlock {
    let mut new_index = current_index;
    let actual_offset = offset.unwrap_or_else(|| infra.block_length(block));
    let mut remaining_with_stops = remaining_time;
    // Walk back over every waypoint group located on this block before the
    // offset, adding scheduled stop durations on the way.
    while new_index > 0 {
        let step = &steps[new_index - 1];
        if !step
            .locations
            .iter()
            .any(|location| location.block == block && location.offset <= actual_offset)
        {
            break;
        }
        if step.stop {
            remaining_with_stops += step.duration.unwrap_or(0.0);
        }
        new_index -= 1;
    }
    PendingBlock {
        block,
        step_index: new_index,
        remaining_time_at_block_start: remaining_with_stops + block_time(model, block, offset),
    }
}

/// Time through the block until `end_offset` (whole block when `None`); a
/// zero end offset short-circuits to zero.
fn block_time<M: RunningTimeModel>(model: &M, block: BlockId, end_offset: Option<Distance>) -> Time {
    if end_offset == Some(0) {
        return 0.0;
    }
    model.block_time(block, end_offset)
}
