use crate::model::{EdgeLocation, Graph};
use crate::stdcm::edge::{StdcmEdge, StdcmNode, first_stop_after};
use crate::stdcm::request::StdcmStep;
use crate::Time;

/// The infrastructure-explorer black box of the forward search: builds the
/// space-time edges leaving a node, one per reachable block traversal and
/// candidate opening, with the delay bookkeeping (added delay, maximum
/// further delay, next occupancy) computed against the scheduled traffic.
pub trait SpaceTimeExpander {
    fn next_edges(&self, node: &StdcmNode) -> Vec<StdcmEdge>;
}

/// Space-time graph explored by the STDCM forward search. Wraps the
/// expander behind the generic [`Graph`] contract and carries the route
/// steps needed to resolve edge ends.
pub struct StdcmGraph<'a, X: SpaceTimeExpander> {
    expander: &'a X,
    steps: &'a [StdcmStep],
    departure_time: Time,
    max_departure_delay: Time,
}

impl<'a, X: SpaceTimeExpander> StdcmGraph<'a, X> {
    pub fn new(
        expander: &'a X,
        steps: &'a [StdcmStep],
        departure_time: Time,
        max_departure_delay: Time,
    ) -> Self {
        Self {
            expander,
            steps,
            departure_time,
            max_departure_delay,
        }
    }

    pub fn steps(&self) -> &[StdcmStep] {
        self.steps
    }

    /// First scheduled stop strictly after the given waypoint index.
    pub fn first_stop_after(&self, index: usize) -> Option<&StdcmStep> {
        first_stop_after(self.steps, index)
    }

    /// Total cost of the path from its origin to a location on an edge.
    ///
    /// Running time is weighted by the maximum departure delay so that one
    /// second of run time always costs more than one second of departure
    /// shift; the shift itself is the tie-breaker. This cannot be expressed
    /// as a per-range cost because the shift changes globally along the
    /// path, hence the from-origin form.
    pub fn total_cost_until(&self, location: &EdgeLocation<StdcmEdge>) -> f64 {
        let edge = &location.edge;
        let elapsed = edge.approximate_time_at(location.offset)
            - edge.total_departure_time_shift
            - self.departure_time;
        elapsed * self.max_departure_delay + edge.total_departure_time_shift
    }
}

impl<'a, X: SpaceTimeExpander> Graph for StdcmGraph<'a, X> {
    type Node = StdcmNode;
    type Edge = StdcmEdge;

    fn edge_end(&self, edge: &StdcmEdge) -> StdcmNode {
        edge.edge_end(self.steps)
    }

    fn adjacent_edges(&self, node: &StdcmNode) -> Vec<StdcmEdge> {
        self.expander.next_edges(node)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;

    use super::*;
    use crate::pathfinding::{AStarHeuristic, PathfinderBuilder, TargetsOnEdge};
    use crate::stdcm::edge::TraversalId;
    use crate::stdcm::heuristic::make_stdcm_heuristics;
    use crate::stdcm::infra::{BlockGraph, RunningTimeModel};
    use crate::stdcm::request::{BlockLocation, StdcmStep};
    use crate::{BlockId, Distance, DetectorId};

    /// Blocks 0..n chained head to tail; block `i` runs from detector `i`
    /// to detector `i + 1`.
    struct ChainInfra {
        lengths: Vec<Distance>,
    }

    impl BlockGraph for ChainInfra {
        fn block_length(&self, block: BlockId) -> Distance {
            self.lengths[block]
        }

        fn block_entry(&self, block: BlockId) -> DetectorId {
            block
        }

        fn blocks_ending_at(&self, detector: DetectorId) -> Vec<BlockId> {
            if detector >= 1 {
                vec![detector - 1]
            } else {
                vec![]
            }
        }
    }

    /// Constant-speed running times, in mm/s.
    struct UniformSpeed {
        lengths: Vec<Distance>,
        speed: f64,
    }

    impl RunningTimeModel for UniformSpeed {
        fn block_time(&self, block: BlockId, end_offset: Option<Distance>) -> Time {
            let distance = end_offset.unwrap_or(self.lengths[block]);
            distance as f64 / self.speed
        }
    }

    /// Expands along the block chain at constant speed, with no occupancy.
    struct ChainExpander {
        lengths: Vec<Distance>,
        speed: f64,
        next_traversal: Cell<u64>,
    }

    impl ChainExpander {
        fn make_edge(&self, block: BlockId, time_start: Time, waypoint_index: usize) -> StdcmEdge {
            let length = self.lengths[block];
            let traversal = TraversalId(self.next_traversal.get());
            self.next_traversal.set(traversal.0 + 1);
            StdcmEdge {
                traversal,
                block,
                time_start,
                maximum_added_delay_after: f64::INFINITY,
                added_delay: 0.0,
                time_next_occupancy: f64::INFINITY,
                total_departure_time_shift: 0.0,
                previous_node: None,
                envelope_start_offset: 0,
                minute_time_start: StdcmEdge::minute_of(time_start),
                standard_allowance_speed_factor: 1.0,
                waypoint_index,
                end_at_stop: false,
                begin_speed: self.speed / 1000.0,
                end_speed: self.speed / 1000.0,
                length,
                total_time: length as f64 / self.speed,
                weight: None,
            }
        }
    }

    impl SpaceTimeExpander for ChainExpander {
        fn next_edges(&self, node: &StdcmNode) -> Vec<StdcmEdge> {
            let next = node.previous_edge.block + 1;
            if next >= self.lengths.len() {
                return vec![];
            }
            let mut edge = self.make_edge(next, node.time, node.waypoint_index);
            edge.previous_node = Some(std::rc::Rc::new(node.clone()));
            vec![edge]
        }
    }

    #[test]
    fn forward_search_over_two_blocks() {
        let lengths = vec![60_000, 60_000];
        let speed = 1000.0; // mm/s
        let steps = vec![
            StdcmStep::passage(vec![BlockLocation::new(0, 0)]),
            StdcmStep::passage(vec![BlockLocation::new(1, 30_000)]),
        ];
        let infra = Arc::new(ChainInfra {
            lengths: lengths.clone(),
        });
        let model = Arc::new(UniformSpeed {
            lengths: lengths.clone(),
            speed,
        });
        let expander = ChainExpander {
            lengths: lengths.clone(),
            speed,
            next_traversal: Cell::new(0),
        };
        let graph = StdcmGraph::new(&expander, &steps, 0.0, 1.0);
        let estimators: Vec<AStarHeuristic<'_, StdcmEdge>> =
            make_stdcm_heuristics(infra, model, &steps, 3600.0, 1.0);
        let pathfinder = PathfinderBuilder::new(&graph)
            .edge_to_length(|edge| edge.length)
            .total_cost_from_origin(|location| graph.total_cost_until(location))
            .remaining_cost_estimators(estimators)
            .build()
            .unwrap();
        let start_edge = expander.make_edge(0, 0.0, 0);
        let targets: Vec<TargetsOnEdge<'_, StdcmEdge>> = vec![Box::new(|edge: &StdcmEdge| {
            if edge.block == 1 {
                vec![EdgeLocation::new(edge.clone(), 30_000)]
            } else {
                vec![]
            }
        })];
        let path = pathfinder
            .run(vec![EdgeLocation::new(start_edge, 0)], targets)
            .unwrap()
            .unwrap();
        let blocks: Vec<BlockId> = path.edges().iter().map(|edge| edge.block).collect();
        assert_eq!(blocks, vec![0, 1]);
        // 60 s over block 0 plus 30 s over half of block 1, weighted by a
        // unit maximum departure delay, with no departure shift.
        assert_eq!(path.total_cost, 90.0);
        let last = path.ranges.last().unwrap();
        assert_eq!((last.start, last.end), (0, 30_000));
    }

    #[test]
    fn edge_end_goes_through_the_graph_contract() {
        let expander = ChainExpander {
            lengths: vec![60_000, 60_000],
            speed: 1000.0,
            next_traversal: Cell::new(0),
        };
        let steps = vec![
            StdcmStep::passage(vec![BlockLocation::new(0, 0)]),
            StdcmStep::passage(vec![BlockLocation::new(1, 30_000)]),
        ];
        let graph = StdcmGraph::new(&expander, &steps, 0.0, 1.0);
        let edge = expander.make_edge(0, 0.0, 0);
        let node = graph.edge_end(&edge);
        assert_eq!(node.time, 60.0);
        assert_eq!(node.waypoint_index, 0);
        let next = graph.adjacent_edges(&node);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].block, 1);
        assert_eq!(next[0].time_start, 60.0);
    }

    #[test]
    fn departure_shift_is_a_tie_breaker_in_the_cost() {
        let expander = ChainExpander {
            lengths: vec![60_000],
            speed: 1000.0,
            next_traversal: Cell::new(0),
        };
        let steps = vec![
            StdcmStep::passage(vec![BlockLocation::new(0, 0)]),
            StdcmStep::passage(vec![BlockLocation::new(0, 60_000)]),
        ];
        let graph = StdcmGraph::new(&expander, &steps, 0.0, 3600.0);
        let prompt = expander.make_edge(0, 0.0, 0);
        let mut shifted = expander.make_edge(0, 120.0, 0);
        shifted.total_departure_time_shift = 120.0;
        let cost_prompt = graph.total_cost_until(&EdgeLocation::new(prompt, 60_000));
        let cost_shifted = graph.total_cost_until(&EdgeLocation::new(shifted, 60_000));
        // Same run time: the shifted departure only pays its shift.
        assert_eq!(cost_prompt, 60.0 * 3600.0);
        assert_eq!(cost_shifted, 60.0 * 3600.0 + 120.0);
    }
}
