use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, warn};
use ordered_float::OrderedFloat;

use crate::error::Error;
use crate::model::{EdgeLocation, EdgeRange, Graph};
use crate::pathfinding::config::{
    AStarHeuristic, BlockedRangesOnEdge, CostModel, EdgeToLength, TargetsOnEdge,
};

/// Result of a successful pathfinding: the full path as edge ranges (merged
/// per edge), the waypoints actually hit, and the accumulated cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Path<E> {
    pub ranges: Vec<EdgeRange<E>>,
    pub waypoints: Vec<EdgeLocation<E>>,
    pub total_cost: f64,
}

impl<E: Clone> Path<E> {
    /// The traversed edges, in order.
    pub fn edges(&self) -> Vec<E> {
        self.ranges.iter().map(|range| range.edge.clone()).collect()
    }
}

/// One node of the search tree. Immutable once created; predecessors are
/// referenced by arena index, since many steps legitimately share a tail.
#[derive(Clone)]
struct Step<E> {
    range: EdgeRange<E>,
    prev: Option<usize>,
    total_cost: f64,
    n_reached: usize,
    targets: Vec<EdgeLocation<E>>,
}

#[derive(PartialEq, Eq)]
struct QueueItem {
    weight: OrderedFloat<f64>,
    n_reached: usize,
    seq: u64,
    idx: usize,
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by weight (reversed from standard Rust BinaryHeap). Equal
        // weights prefer the step with the most reached waypoint groups,
        // then insertion order, which makes the search fully deterministic.
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.n_reached.cmp(&other.n_reached))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct SearchState<E> {
    arena: Vec<Step<E>>,
    queue: BinaryHeap<QueueItem>,
    /// For each visited exact range, the highest waypoint-group count seen.
    /// A step is only expanded if it improves on that record.
    seen: HashMap<EdgeRange<E>, usize>,
    seq: u64,
}

/// Best-path search over edge ranges. Built by
/// [`PathfinderBuilder`](crate::pathfinding::PathfinderBuilder); consumed by
/// a single run.
pub struct Pathfinder<'a, G: Graph> {
    pub(super) graph: &'a G,
    pub(super) edge_to_length: EdgeToLength<'a, G::Edge>,
    pub(super) cost: CostModel<'a, G::Edge>,
    pub(super) blocked_ranges: Vec<BlockedRangesOnEdge<'a, G::Edge>>,
    pub(super) estimators: Vec<AStarHeuristic<'a, G::Edge>>,
    pub(super) timeout: Duration,
}

impl<'a, G: Graph> Pathfinder<'a, G>
where
    G::Edge: 'a,
{
    /// Runs the search with explicit target locations: the first group is
    /// the set of start locations, every following group is a waypoint group
    /// to satisfy in order.
    pub fn run_to_locations(
        self,
        mut targets: Vec<Vec<EdgeLocation<G::Edge>>>,
    ) -> Result<Option<Path<G::Edge>>, Error> {
        if targets.len() < 2 {
            return Err(Error::InvalidConfiguration(
                "at least a start group and one target group are required",
            ));
        }
        let starts = targets.remove(0);
        let targets_on_edges = targets
            .into_iter()
            .map(|group| -> TargetsOnEdge<'a, G::Edge> {
                Box::new(move |edge: &G::Edge| {
                    group
                        .iter()
                        .filter(|target| target.edge == *edge)
                        .cloned()
                        .collect()
                })
            })
            .collect();
        self.run(starts, targets_on_edges)
    }

    /// Runs the search. Each waypoint group is a function listing, per edge,
    /// the target locations of that group. Returns the minimum-cost path
    /// going through at least one location of every group in order, `None`
    /// when the frontier empties without reaching the last group.
    pub fn run(
        self,
        starts: Vec<EdgeLocation<G::Edge>>,
        targets_on_edges: Vec<TargetsOnEdge<'a, G::Edge>>,
    ) -> Result<Option<Path<G::Edge>>, Error> {
        let mut state = SearchState {
            arena: Vec::new(),
            queue: BinaryHeap::new(),
            seen: HashMap::new(),
            seq: 0,
        };
        for location in starts {
            let range = EdgeRange::new(location.edge.clone(), location.offset, location.offset);
            self.register_step(&mut state, range, None, 0.0, 0, vec![location]);
        }
        let search_start = Instant::now();
        loop {
            // Cooperative cancellation: cyclic or adversarial graphs can
            // enqueue unboundedly, so the budget is wall-clock based.
            if search_start.elapsed() >= self.timeout {
                warn!(
                    "pathfinding timed out after {:?} ({} steps registered)",
                    self.timeout,
                    state.arena.len()
                );
                return Err(Error::PathfindingTimeout(self.timeout));
            }
            let Some(item) = state.queue.pop() else {
                debug!(
                    "frontier exhausted without a path ({} steps registered)",
                    state.arena.len()
                );
                return Ok(None);
            };
            let step = state.arena[item.idx].clone();
            if let Some(&best) = state.seen.get(&step.range) {
                if best >= step.n_reached {
                    continue;
                }
            }
            state.seen.insert(step.range.clone(), step.n_reached);
            if step.n_reached >= targets_on_edges.len() {
                return Ok(Some(build_result(&state.arena, item.idx)));
            }
            // Check whether the next unmet group is reached within this
            // step, unless the step itself already satisfied a new group.
            let parent_reached = step.prev.map(|prev| state.arena[prev].n_reached);
            if parent_reached.is_none() || parent_reached == Some(step.n_reached) {
                for target in (targets_on_edges[step.n_reached])(&step.range.edge) {
                    if target.offset < step.range.start {
                        continue;
                    }
                    // Split off a step ending exactly on the target, so the
                    // distance from the range start to the target is not
                    // ignored.
                    let candidate = EdgeRange::new(
                        step.range.edge.clone(),
                        step.range.start,
                        target.offset,
                    );
                    let Some(new_range) = self.filter_range(candidate) else {
                        continue;
                    };
                    if new_range.end != target.offset {
                        // The target itself sits inside a blocked range: it
                        // cannot be reached from here.
                        continue;
                    }
                    let prev_cost = step.prev.map_or(0.0, |prev| state.arena[prev].total_cost);
                    let mut step_targets = step.targets.clone();
                    step_targets.push(target);
                    self.register_step(
                        &mut state,
                        new_range,
                        step.prev,
                        prev_cost,
                        step.n_reached + 1,
                        step_targets,
                    );
                }
            }
            let edge_length = (self.edge_to_length)(&step.range.edge);
            if step.range.end == edge_length {
                // End of the edge: visit the neighbors.
                let end_node = self.graph.edge_end(&step.range.edge);
                for edge in self.graph.adjacent_edges(&end_node) {
                    let length = (self.edge_to_length)(&edge);
                    self.register_step(
                        &mut state,
                        EdgeRange::new(edge, 0, length),
                        Some(item.idx),
                        step.total_cost,
                        step.n_reached,
                        Vec::new(),
                    );
                }
            } else {
                // The step stopped mid-edge (intermediate target or clipped
                // start): extend it to the end of the edge.
                let new_range =
                    EdgeRange::new(step.range.edge.clone(), step.range.end, edge_length);
                self.register_step(
                    &mut state,
                    new_range,
                    Some(item.idx),
                    step.total_cost,
                    step.n_reached,
                    Vec::new(),
                );
            }
        }
    }

    fn register_step(
        &self,
        state: &mut SearchState<G::Edge>,
        range: EdgeRange<G::Edge>,
        prev: Option<usize>,
        prev_cost: f64,
        n_reached: usize,
        targets: Vec<EdgeLocation<G::Edge>>,
    ) {
        let Some(range) = self.filter_range(range) else {
            return;
        };
        let total_cost = match &self.cost {
            CostModel::FromOrigin(f) => f(&EdgeLocation::new(range.edge.clone(), range.end)),
            CostModel::PerRange(f) => prev_cost + f(&range),
        };
        let mut remaining = 0.0;
        if n_reached < self.estimators.len() {
            remaining = (self.estimators[n_reached])(&range.edge, range.start);
        }
        let weight = total_cost + remaining;
        let idx = state.arena.len();
        state.arena.push(Step {
            range,
            prev,
            total_cost,
            n_reached,
            targets,
        });
        state.queue.push(QueueItem {
            weight: OrderedFloat(weight),
            n_reached,
            seq: state.seq,
            idx,
        });
        state.seq += 1;
    }

    /// Keeps only the reachable part of a range. Returns `None` when the
    /// range start itself is blocked, otherwise clips the end to the nearest
    /// blocked-range start.
    fn filter_range(&self, range: EdgeRange<G::Edge>) -> Option<EdgeRange<G::Edge>> {
        let mut end = range.end;
        for provider in &self.blocked_ranges {
            for blocked in provider(&range.edge) {
                if blocked.end < range.start {
                    continue;
                }
                if blocked.start <= range.start {
                    return None;
                }
                end = end.min(blocked.start);
            }
        }
        Some(EdgeRange::new(range.edge, range.start, end))
    }
}

/// Walks the predecessor chain from the final step, merging consecutive
/// ranges on the same edge.
fn build_result<E: Clone + Eq + Hash>(arena: &[Step<E>], last: usize) -> Path<E> {
    let mut chain = Vec::new();
    let mut current = Some(last);
    while let Some(idx) = current {
        chain.push(idx);
        current = arena[idx].prev;
    }
    chain.reverse();
    let waypoints = chain
        .iter()
        .flat_map(|&idx| arena[idx].targets.iter().cloned())
        .collect();
    let ranges = chain
        .iter()
        .map(|&idx| arena[idx].range.clone())
        .coalesce(|prev, next| {
            if prev.edge == next.edge {
                Ok(EdgeRange::new(prev.edge, prev.start, next.end))
            } else {
                Err((prev, next))
            }
        })
        .collect();
    Path {
        ranges,
        waypoints,
        total_cost: arena[last].total_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Range;
    use crate::pathfinding::PathfinderBuilder;
    use crate::Distance;

    /// Chain of edges: edge `i` goes from node `i` to node `i + 1`.
    struct LineGraph {
        lengths: Vec<Distance>,
    }

    impl Graph for LineGraph {
        type Node = usize;
        type Edge = usize;

        fn edge_end(&self, edge: &usize) -> usize {
            edge + 1
        }

        fn adjacent_edges(&self, node: &usize) -> Vec<usize> {
            if *node < self.lengths.len() {
                vec![*node]
            } else {
                vec![]
            }
        }
    }

    /// Two edges forming a loop between nodes 0 and 1.
    struct LoopGraph;

    impl Graph for LoopGraph {
        type Node = usize;
        type Edge = usize;

        fn edge_end(&self, edge: &usize) -> usize {
            1 - edge
        }

        fn adjacent_edges(&self, node: &usize) -> Vec<usize> {
            vec![*node]
        }
    }

    fn line3() -> LineGraph {
        LineGraph {
            lengths: vec![100, 100, 100],
        }
    }

    #[test]
    fn straight_path_through_three_edges() {
        let graph = line3();
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .build()
            .unwrap();
        let path = pathfinder
            .run_to_locations(vec![
                vec![EdgeLocation::new(0, 0)],
                vec![EdgeLocation::new(2, 50)],
            ])
            .unwrap()
            .unwrap();
        assert_eq!(
            path.ranges,
            vec![
                EdgeRange::new(0, 0, 100),
                EdgeRange::new(1, 0, 100),
                EdgeRange::new(2, 0, 50),
            ]
        );
        assert_eq!(path.total_cost, 250.0);
        assert_eq!(
            path.waypoints,
            vec![EdgeLocation::new(0, 0), EdgeLocation::new(2, 50)]
        );
    }

    #[test]
    fn blocked_crossing_has_no_path() {
        let graph = line3();
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .blocked_ranges(|edge| {
                if *edge == 1 {
                    vec![Range::new(40, 60)]
                } else {
                    vec![]
                }
            })
            .build()
            .unwrap();
        let result = pathfinder
            .run_to_locations(vec![
                vec![EdgeLocation::new(0, 0)],
                vec![EdgeLocation::new(2, 50)],
            ])
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn target_before_blocked_range_is_reachable() {
        let graph = line3();
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .blocked_ranges(|edge| {
                if *edge == 1 {
                    vec![Range::new(40, 60)]
                } else {
                    vec![]
                }
            })
            .build()
            .unwrap();
        let path = pathfinder
            .run_to_locations(vec![
                vec![EdgeLocation::new(0, 0)],
                vec![EdgeLocation::new(1, 30)],
            ])
            .unwrap()
            .unwrap();
        assert_eq!(
            path.ranges,
            vec![EdgeRange::new(0, 0, 100), EdgeRange::new(1, 0, 30)]
        );
        assert_eq!(path.total_cost, 130.0);
        // No returned range overlaps the blocked range.
        for range in &path.ranges {
            if range.edge == 1 {
                assert!(range.end <= 40);
            }
        }
    }

    #[test]
    fn target_inside_blocked_range_is_unreachable() {
        let graph = line3();
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .blocked_ranges(|edge| {
                if *edge == 1 {
                    vec![Range::new(40, 60)]
                } else {
                    vec![]
                }
            })
            .build()
            .unwrap();
        let result = pathfinder
            .run_to_locations(vec![
                vec![EdgeLocation::new(0, 0)],
                vec![EdgeLocation::new(1, 50)],
            ])
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn intermediate_waypoints_are_hit_in_order() {
        let graph = line3();
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .build()
            .unwrap();
        let path = pathfinder
            .run_to_locations(vec![
                vec![EdgeLocation::new(0, 0)],
                vec![EdgeLocation::new(1, 30)],
                vec![EdgeLocation::new(2, 50)],
            ])
            .unwrap()
            .unwrap();
        assert_eq!(
            path.ranges,
            vec![
                EdgeRange::new(0, 0, 100),
                EdgeRange::new(1, 0, 100),
                EdgeRange::new(2, 0, 50),
            ]
        );
        assert_eq!(path.total_cost, 250.0);
        // Path offsets of consecutive waypoints never decrease.
        let offsets: Vec<(usize, Distance)> = path
            .waypoints
            .iter()
            .map(|waypoint| (waypoint.edge, waypoint.offset))
            .collect();
        for (a, b) in offsets.iter().tuple_windows() {
            assert!(a <= b);
        }
    }

    #[test]
    fn cyclic_graph_terminates_without_path() {
        let graph = LoopGraph;
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|_| 100)
            .build()
            .unwrap();
        // The target is on an edge that does not exist in the loop; the
        // seen-set must exhaust the frontier instead of looping forever.
        let result = pathfinder
            .run_to_locations(vec![
                vec![EdgeLocation::new(0, 0)],
                vec![EdgeLocation::new(5, 10)],
            ])
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let run = || {
            let graph = line3();
            let pathfinder = PathfinderBuilder::new(&graph)
                .edge_to_length(|edge| graph.lengths[*edge])
                .build()
                .unwrap();
            pathfinder
                .run_to_locations(vec![
                    vec![EdgeLocation::new(0, 0), EdgeLocation::new(0, 10)],
                    vec![EdgeLocation::new(2, 50)],
                ])
                .unwrap()
                .unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second);
    }

    #[test]
    fn equal_weight_prefers_more_reached_groups() {
        let mut heap = BinaryHeap::new();
        heap.push(QueueItem {
            weight: OrderedFloat(10.0),
            n_reached: 0,
            seq: 0,
            idx: 0,
        });
        heap.push(QueueItem {
            weight: OrderedFloat(10.0),
            n_reached: 2,
            seq: 1,
            idx: 1,
        });
        heap.push(QueueItem {
            weight: OrderedFloat(5.0),
            n_reached: 0,
            seq: 2,
            idx: 2,
        });
        assert_eq!(heap.pop().unwrap().idx, 2);
        assert_eq!(heap.pop().unwrap().idx, 1);
        assert_eq!(heap.pop().unwrap().idx, 0);
    }

    #[test]
    fn missing_length_function_is_rejected() {
        let graph = line3();
        let result = PathfinderBuilder::new(&graph).build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn conflicting_cost_models_are_rejected() {
        let graph = line3();
        let result = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .per_range_cost(|range| range.length() as f64)
            .total_cost_from_origin(|location| location.offset as f64)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn zero_timeout_fails_immediately() {
        let graph = line3();
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| graph.lengths[*edge])
            .timeout(Duration::ZERO)
            .build()
            .unwrap();
        let result = pathfinder.run_to_locations(vec![
            vec![EdgeLocation::new(0, 0)],
            vec![EdgeLocation::new(2, 50)],
        ]);
        assert!(matches!(result, Err(Error::PathfindingTimeout(_))));
    }
}
